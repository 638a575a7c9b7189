//! 声望账本
//!
//! 根据生命周期事件计算声望（karma）增量与徽章资格的纯函数。
//! 声望只增不减、无上限；徽章为集合语义。
//!
//! 持久化由仓储层负责：`UserRepositoryTrait::apply_reputation` 在单用户的
//! 原子读改写中调用 [`ReputationEvent::apply`]。

use crate::models::{Badge, User};
use crate::models::rating::RATING_BONUS_THRESHOLD;

pub const HELP_KARMA: i64 = 10;
pub const RATING_BONUS_KARMA: i64 = 5;
pub const EMERGENCY_HELP_KARMA: i64 = 20;

pub const TOP_HELPER_THRESHOLD: i32 = 10;
pub const COMMUNITY_ELDER_THRESHOLD: i32 = 50;

/// 声望事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReputationEvent {
    /// 完成一次帮助
    Help,
    /// 收到评分（携带评分值）
    RatingBonus(i32),
    /// 响应紧急求助
    EmergencyHelp,
}

impl ReputationEvent {
    /// 指标标签
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::RatingBonus(_) => "rating_bonus",
            Self::EmergencyHelp => "emergency_help",
        }
    }

    /// 应用到用户，返回本次新获得的徽章
    pub fn apply(&self, user: &mut User) -> Option<Badge> {
        match *self {
            Self::Help => award_help(user),
            Self::RatingBonus(rating) => {
                award_rating_bonus(user, rating);
                None
            }
            Self::EmergencyHelp => award_emergency_help(user),
        }
    }
}

/// 完成帮助：karma +10，helped_count +1，按阶梯授予徽章
///
/// 每次至多授予一个阶梯徽章，≥50 的判断优先。
pub fn award_help(user: &mut User) -> Option<Badge> {
    user.karma += HELP_KARMA;
    user.helped_count += 1;

    if user.helped_count >= COMMUNITY_ELDER_THRESHOLD {
        if !user.has_badge(Badge::CommunityElder) {
            user.badges.insert(Badge::CommunityElder);
            return Some(Badge::CommunityElder);
        }
    } else if user.helped_count >= TOP_HELPER_THRESHOLD && !user.has_badge(Badge::TopHelper) {
        user.badges.insert(Badge::TopHelper);
        return Some(Badge::TopHelper);
    }
    None
}

/// 评分奖励：评分 ≥4 时 karma +5
pub fn award_rating_bonus(user: &mut User, rating: i32) {
    if rating >= RATING_BONUS_THRESHOLD {
        user.karma += RATING_BONUS_KARMA;
    }
}

/// 紧急响应：karma +20，首次响应授予 "Emergency Responder"
pub fn award_emergency_help(user: &mut User) -> Option<Badge> {
    user.karma += EMERGENCY_HELP_KARMA;
    user.badges
        .insert(Badge::EmergencyResponder)
        .then_some(Badge::EmergencyResponder)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(helped: i32) -> User {
        let mut user = User::new("Helper", "helper@example.com", "Oak", true);
        user.helped_count = helped;
        user
    }

    #[test]
    fn test_award_help_basic() {
        let mut user = user_with(0);
        assert_eq!(award_help(&mut user), None);
        assert_eq!(user.karma, 10);
        assert_eq!(user.helped_count, 1);
        assert!(user.badges.is_empty());
    }

    #[test]
    fn test_award_help_top_helper_at_ten() {
        let mut user = user_with(9);
        assert_eq!(award_help(&mut user), Some(Badge::TopHelper));
        assert_eq!(user.helped_count, 10);
        assert!(user.has_badge(Badge::TopHelper));
        assert!(!user.has_badge(Badge::CommunityElder));
    }

    #[test]
    fn test_award_help_community_elder_at_fifty() {
        let mut user = user_with(49);
        user.badges.insert(Badge::TopHelper);

        assert_eq!(award_help(&mut user), Some(Badge::CommunityElder));
        assert_eq!(user.helped_count, 50);
        assert!(user.has_badge(Badge::CommunityElder));
        assert_eq!(user.badges.len(), 2);
    }

    #[test]
    fn test_elder_tier_takes_precedence() {
        // 已过 50 次但从未拿到 Top Helper：只授予 Community Elder
        let mut user = user_with(49);
        assert_eq!(award_help(&mut user), Some(Badge::CommunityElder));
        assert!(!user.has_badge(Badge::TopHelper));

        // 之后也不会补发 Top Helper
        assert_eq!(award_help(&mut user), None);
        assert!(!user.has_badge(Badge::TopHelper));
    }

    #[test]
    fn test_no_regrant_between_tiers() {
        let mut user = user_with(10);
        user.badges.insert(Badge::TopHelper);
        assert_eq!(award_help(&mut user), None);
        assert_eq!(user.badges.len(), 1);
    }

    #[test]
    fn test_rating_bonus_threshold() {
        let mut user = user_with(0);
        award_rating_bonus(&mut user, 3);
        assert_eq!(user.karma, 0);
        award_rating_bonus(&mut user, 4);
        assert_eq!(user.karma, 5);
        award_rating_bonus(&mut user, 5);
        assert_eq!(user.karma, 10);
    }

    #[test]
    fn test_emergency_help_badge_once() {
        let mut user = user_with(0);
        assert_eq!(
            award_emergency_help(&mut user),
            Some(Badge::EmergencyResponder)
        );
        assert_eq!(award_emergency_help(&mut user), None);
        assert_eq!(user.karma, 40);
        assert_eq!(user.badges.len(), 1);
    }

    #[test]
    fn test_event_dispatch() {
        let mut user = user_with(0);
        ReputationEvent::Help.apply(&mut user);
        ReputationEvent::RatingBonus(5).apply(&mut user);
        ReputationEvent::EmergencyHelp.apply(&mut user);
        assert_eq!(user.karma, 35);
        assert_eq!(ReputationEvent::RatingBonus(1).kind(), "rating_bonus");
    }
}
