//! 用户模型
//!
//! 用户在注册时创建（不属于本核心），此处只关心声望相关字段。
//! 凭据字段只在核心内部流转，对外一律使用 `UserSummary` / `UserProfile` 投影。

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Badge;

/// 评分汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub average: f64,
    pub count: i32,
}

impl RatingSummary {
    /// 由全部评分值重新计算
    pub fn from_values(values: &[i32]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let sum: i64 = values.iter().map(|v| i64::from(*v)).sum();
        Self {
            average: sum as f64 / values.len() as f64,
            count: values.len() as i32,
        }
    }
}

/// 用户
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub avatar: Option<String>,
    pub neighborhood: String,
    pub verified: bool,
    pub karma: i64,
    pub badges: BTreeSet<Badge>,
    pub helped_count: i32,
    pub ratings: RatingSummary,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// 构造一个新注册用户（零声望）
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        neighborhood: impl Into<String>,
        verified: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            password_hash: String::new(),
            avatar: None,
            neighborhood: neighborhood.into(),
            verified,
            karma: 0,
            badges: BTreeSet::new(),
            helped_count: 0,
            ratings: RatingSummary::default(),
            created_at: Utc::now(),
        }
    }

    pub fn has_badge(&self, badge: Badge) -> bool {
        self.badges.contains(&badge)
    }
}

/// 用户公开摘要（作者、帮助者、响应者等引用处使用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
    pub karma: i64,
    pub badges: Vec<Badge>,
}

impl UserSummary {
    /// 引用的用户记录缺失时的占位
    pub fn unknown(id: Uuid) -> Self {
        Self {
            id,
            name: "unknown".to_string(),
            avatar: None,
            karma: 0,
            badges: Vec::new(),
        }
    }
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            avatar: user.avatar.clone(),
            karma: user.karma,
            badges: user.badges.iter().copied().collect(),
        }
    }
}

/// 用户公开资料（不含任何凭据）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
    pub neighborhood: String,
    pub verified: bool,
    pub karma: i64,
    pub badges: Vec<Badge>,
    pub helped_count: i32,
    pub ratings: RatingSummary,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            avatar: user.avatar.clone(),
            neighborhood: user.neighborhood.clone(),
            verified: user.verified,
            karma: user.karma,
            badges: user.badges.iter().copied().collect(),
            helped_count: user.helped_count,
            ratings: user.ratings,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_summary_from_values() {
        assert_eq!(RatingSummary::from_values(&[]), RatingSummary::default());

        let summary = RatingSummary::from_values(&[5, 4, 3]);
        assert_eq!(summary.count, 3);
        assert!((summary.average - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_profile_never_exposes_credentials() {
        let mut user = User::new("Alice", "alice@example.com", "Oak", true);
        user.password_hash = "$2b$12$secret".to_string();

        let json = serde_json::to_string(&UserProfile::from(&user)).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("password"));
        assert!(!json.contains("alice@example.com"));
        assert!(json.contains("\"helpedCount\":0"));
    }

    #[test]
    fn test_summary_badges_are_set_ordered() {
        let mut user = User::new("Bob", "bob@example.com", "Oak", true);
        user.badges.insert(Badge::EmergencyResponder);
        user.badges.insert(Badge::TopHelper);
        user.badges.insert(Badge::TopHelper);

        let summary = UserSummary::from(&user);
        assert_eq!(summary.badges.len(), 2);
    }
}
