//! 互助系统枚举类型定义
//!
//! 状态类枚举同时支持数据库（sqlx）和 JSON（serde）序列化，取值与客户端约定一致（kebab-case）。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 帖子类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "varchar", rename_all = "kebab-case")]
pub enum PostType {
    /// 求助
    Request,
    /// 提供帮助
    Offer,
}

/// 帖子分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "varchar", rename_all = "kebab-case")]
pub enum PostCategory {
    Food,
    Transport,
    Tools,
    Tutoring,
    Childcare,
    Petcare,
    Healthcare,
    Other,
}

/// 帖子状态
///
/// `active → in-progress → completed`，`active → cancelled`。
/// 目前没有任何操作会进入 `cancelled`，保留该状态仅为数据模型完整。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "varchar", rename_all = "kebab-case")]
pub enum PostStatus {
    #[default]
    Active,
    InProgress,
    Completed,
    Cancelled,
}

impl PostStatus {
    /// 查询默认可见的状态集合
    pub const OPEN: [PostStatus; 2] = [PostStatus::Active, PostStatus::InProgress];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// 该状态下是否必须有被指派的帮助者
    pub fn requires_assignee(&self) -> bool {
        matches!(self, Self::InProgress | Self::Completed)
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 紧急程度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "varchar", rename_all = "kebab-case")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
}

/// 紧急求助类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "varchar", rename_all = "kebab-case")]
pub enum EmergencyType {
    Medical,
    Safety,
    LostPet,
    ElderlyHelp,
    Other,
}

/// 紧急求助状态
///
/// `active → resolved`，`active → expired`。过期为惰性判定，见 `Emergency::effective_status`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "varchar", rename_all = "kebab-case")]
pub enum EmergencyStatus {
    #[default]
    Active,
    Resolved,
    Expired,
}

impl EmergencyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Resolved => "resolved",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for EmergencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 成就徽章
///
/// 固定词表，用户持有集合语义（不计数）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Badge {
    #[serde(rename = "Verified Neighbor")]
    VerifiedNeighbor,
    #[serde(rename = "Top Helper")]
    TopHelper,
    #[serde(rename = "Community Elder")]
    CommunityElder,
    #[serde(rename = "Emergency Responder")]
    EmergencyResponder,
    #[serde(rename = "Kind Heart")]
    KindHeart,
}

impl Badge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VerifiedNeighbor => "Verified Neighbor",
            Self::TopHelper => "Top Helper",
            Self::CommunityElder => "Community Elder",
            Self::EmergencyResponder => "Emergency Responder",
            Self::KindHeart => "Kind Heart",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Badge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Verified Neighbor" => Ok(Self::VerifiedNeighbor),
            "Top Helper" => Ok(Self::TopHelper),
            "Community Elder" => Ok(Self::CommunityElder),
            "Emergency Responder" => Ok(Self::EmergencyResponder),
            "Kind Heart" => Ok(Self::KindHeart),
            other => Err(format!("未知徽章: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_status_serde() {
        let json = serde_json::to_string(&PostStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        let parsed: PostStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(parsed, PostStatus::Completed);
        assert_eq!(PostStatus::InProgress.to_string(), "in-progress");
    }

    #[test]
    fn test_post_status_assignee_requirement() {
        assert!(!PostStatus::Active.requires_assignee());
        assert!(PostStatus::InProgress.requires_assignee());
        assert!(PostStatus::Completed.requires_assignee());
        assert!(!PostStatus::Cancelled.requires_assignee());
        assert!(PostStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_emergency_type_serde() {
        let parsed: EmergencyType = serde_json::from_str("\"lost-pet\"").unwrap();
        assert_eq!(parsed, EmergencyType::LostPet);
        let json = serde_json::to_string(&EmergencyType::ElderlyHelp).unwrap();
        assert_eq!(json, "\"elderly-help\"");
    }

    #[test]
    fn test_badge_names() {
        assert_eq!(
            serde_json::to_string(&Badge::CommunityElder).unwrap(),
            "\"Community Elder\""
        );
        assert_eq!("Top Helper".parse::<Badge>().unwrap(), Badge::TopHelper);
        assert!("Gold Star".parse::<Badge>().is_err());
    }

    #[test]
    fn test_urgency_default() {
        assert_eq!(Urgency::default(), Urgency::Medium);
    }
}
