//! 评分模型

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{CoordinationError, Result};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

/// 评分达到该值时被评分者获得额外声望
pub const RATING_BONUS_THRESHOLD: i32 = 4;

/// 帖子完成后作者对帮助者的评分，每个 (post, rated_by) 至多一条
#[derive(Debug, Clone)]
pub struct Rating {
    pub id: Uuid,
    pub post_id: Uuid,
    pub rated_by: Uuid,
    pub rated_user: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Rating {
    pub fn new(
        post_id: Uuid,
        rated_by: Uuid,
        rated_user: Uuid,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Self> {
        validate_rating(rating)?;
        Ok(Self {
            id: Uuid::new_v4(),
            post_id,
            rated_by,
            rated_user,
            rating,
            comment: comment.filter(|c| !c.trim().is_empty()),
            created_at: Utc::now(),
        })
    }
}

pub fn validate_rating(rating: i32) -> Result<()> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(CoordinationError::Validation(format!(
            "评分必须在 {MIN_RATING}-{MAX_RATING} 之间，实际为 {rating}"
        )))
    }
}
