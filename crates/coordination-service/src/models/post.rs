//! 互助帖子模型

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{PostCategory, PostStatus, PostType, Urgency};
use super::geo::GeoPoint;

/// 帖子下的响应（只追加）
#[derive(Debug, Clone, PartialEq)]
pub struct PostResponse {
    pub user_id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// 互助帖子
///
/// 不变量：`assigned_to` 有值当且仅当 `status` 为 in-progress 或 completed。
#[derive(Debug, Clone)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub post_type: PostType,
    pub category: PostCategory,
    pub title: String,
    pub description: String,
    pub urgency: Urgency,
    pub location: GeoPoint,
    /// 创建时从作者复制，是街区查询的范围键
    pub neighborhood: String,
    pub images: Vec<String>,
    pub status: PostStatus,
    pub responses: Vec<PostResponse>,
    pub assigned_to: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 创建帖子所需字段
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub neighborhood: String,
    pub post_type: PostType,
    pub category: PostCategory,
    pub title: String,
    pub description: String,
    pub urgency: Urgency,
    pub location: GeoPoint,
    pub images: Vec<String>,
}

impl Post {
    pub fn new(input: NewPost, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id: input.author_id,
            post_type: input.post_type,
            category: input.category,
            title: input.title,
            description: input.description,
            urgency: input.urgency,
            location: input.location,
            neighborhood: input.neighborhood,
            images: input.images,
            status: PostStatus::Active,
            responses: Vec::new(),
            assigned_to: None,
            completed_at: None,
            expires_at: now + ttl,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_author(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }

    pub fn is_assignee(&self, user_id: Uuid) -> bool {
        self.assigned_to == Some(user_id)
    }

    /// 作者或被指派的帮助者
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.is_author(user_id) || self.is_assignee(user_id)
    }

    /// 指派不变量是否成立
    pub fn assignment_consistent(&self) -> bool {
        self.assigned_to.is_some() == self.status.requires_assignee()
    }
}

/// 街区帖子查询条件
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub neighborhood: String,
    pub post_type: Option<PostType>,
    pub category: Option<PostCategory>,
    /// 为空时使用默认可见状态（active、in-progress）
    pub statuses: Vec<PostStatus>,
}

impl PostFilter {
    pub fn for_neighborhood(neighborhood: impl Into<String>) -> Self {
        Self {
            neighborhood: neighborhood.into(),
            ..Default::default()
        }
    }

    pub fn effective_statuses(&self) -> Vec<PostStatus> {
        if self.statuses.is_empty() {
            PostStatus::OPEN.to_vec()
        } else {
            self.statuses.clone()
        }
    }

    pub fn matches(&self, post: &Post) -> bool {
        post.neighborhood == self.neighborhood
            && self.post_type.is_none_or(|t| post.post_type == t)
            && self.category.is_none_or(|c| post.category == c)
            && self.effective_statuses().contains(&post.status)
    }
}
