//! 紧急求助模型
//!
//! 过期是惰性判定：持久化状态可能仍为 active，读取方必须通过
//! `effective_status` 重新比对 `expires_at`，直到下一次写操作把状态落盘为 expired。

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::enums::{EmergencyStatus, EmergencyType};
use super::geo::GeoPoint;

/// 响应者（只追加，每个用户至多一次）
#[derive(Debug, Clone, PartialEq)]
pub struct Responder {
    pub user_id: Uuid,
    pub responded_at: DateTime<Utc>,
}

/// 紧急求助
///
/// 不变量：`responders` 不包含重复用户，且不包含创建者本人。
#[derive(Debug, Clone)]
pub struct Emergency {
    pub id: Uuid,
    pub user_id: Uuid,
    pub emergency_type: EmergencyType,
    pub message: String,
    pub location: GeoPoint,
    pub neighborhood: String,
    pub status: EmergencyStatus,
    pub responders: Vec<Responder>,
    pub expires_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 创建紧急求助所需字段
#[derive(Debug, Clone)]
pub struct NewEmergency {
    pub user_id: Uuid,
    pub neighborhood: String,
    pub emergency_type: EmergencyType,
    pub message: String,
    pub location: GeoPoint,
}

impl Emergency {
    pub fn new(input: NewEmergency, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            emergency_type: input.emergency_type,
            message: input.message,
            location: input.location,
            neighborhood: input.neighborhood,
            status: EmergencyStatus::Active,
            responders: Vec::new(),
            expires_at: now + ttl,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// 有效状态：持久化为 active 但已超过截止时间的视为 expired
    pub fn effective_status(&self, now: DateTime<Utc>) -> EmergencyStatus {
        match self.status {
            EmergencyStatus::Active if self.is_past_deadline(now) => EmergencyStatus::Expired,
            status => status,
        }
    }

    pub fn is_effectively_active(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == EmergencyStatus::Active
    }

    pub fn has_responder(&self, user_id: Uuid) -> bool {
        self.responders.iter().any(|r| r.user_id == user_id)
    }
}
