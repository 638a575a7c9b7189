//! 实时推送事件模型
//!
//! 定义 fan-out 的主题（Topic）、事件类型和统一事件信封。
//! 主题分为两类：街区主题 `neighborhood:<name>` 与单帖会话主题 `chat:<postId>`。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AidError;

// ---------------------------------------------------------------------------
// Topic — 推送主题
// ---------------------------------------------------------------------------

/// 推送主题
///
/// 客户端通过加入主题订阅事件，服务端按主题发布。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// 街区广播，覆盖该街区所有在线成员
    Neighborhood(String),
    /// 单个帖子的会话，仅发帖人和被指派的帮助者
    Chat(Uuid),
}

impl Topic {
    const NEIGHBORHOOD_PREFIX: &'static str = "neighborhood:";
    const CHAT_PREFIX: &'static str = "chat:";

    pub fn neighborhood(name: impl Into<String>) -> Self {
        Self::Neighborhood(name.into())
    }

    pub fn chat(post_id: Uuid) -> Self {
        Self::Chat(post_id)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Neighborhood(name) => write!(f, "{}{name}", Self::NEIGHBORHOOD_PREFIX),
            Self::Chat(post_id) => write!(f, "{}{post_id}", Self::CHAT_PREFIX),
        }
    }
}

impl FromStr for Topic {
    type Err = AidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(name) = s.strip_prefix(Self::NEIGHBORHOOD_PREFIX)
            && !name.is_empty()
        {
            return Ok(Self::Neighborhood(name.to_string()));
        }
        if let Some(id) = s.strip_prefix(Self::CHAT_PREFIX) {
            return Uuid::parse_str(id)
                .map(Self::Chat)
                .map_err(|_| AidError::InvalidTopic(s.to_string()));
        }
        Err(AidError::InvalidTopic(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// EventKind — 事件类型
// ---------------------------------------------------------------------------

/// 推送事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    NewEmergency,
    EmergencyResponse,
    EmergencyResolved,
    NewMessage,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewEmergency => "new-emergency",
            Self::EmergencyResponse => "emergency-response",
            Self::EmergencyResolved => "emergency-resolved",
            Self::NewMessage => "new-message",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FanoutEvent — 事件信封
// ---------------------------------------------------------------------------

/// 推送事件信封
///
/// `payload` 承载被修改实体的公开投影，不包含任何敏感字段。
/// `event_id` 使用 UUID v7，仅用于客户端去重和日志关联，不提供重放能力。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanoutEvent {
    pub event_id: String,
    pub kind: EventKind,
    pub topic: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl FanoutEvent {
    pub fn new(kind: EventKind, topic: &Topic, payload: serde_json::Value) -> Self {
        Self {
            event_id: Uuid::now_v7().to_string(),
            kind,
            topic: topic.to_string(),
            payload,
            timestamp: Utc::now(),
        }
    }
}
