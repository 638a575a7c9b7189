//! 服务层数据传输对象
//!
//! 入参结构和对外投影。投影只包含非敏感字段，用户引用统一裁剪为 `UserSummary`。

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Chat, ChatMessage, Emergency, EmergencyStatus, EmergencyType, GeoPoint, Post, PostCategory,
    PostStatus, PostType, Rating, Urgency, UserSummary,
};
use crate::repository::UserRepositoryTrait;

// ==================== 入参 ====================

/// 创建帖子请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub category: PostCategory,
    pub title: String,
    pub description: String,
    /// `[lng, lat]`
    pub coordinates: Vec<f64>,
    #[serde(default)]
    pub urgency: Option<Urgency>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// 创建紧急求助请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmergencyInput {
    #[serde(rename = "type")]
    pub emergency_type: EmergencyType,
    pub message: String,
    pub coordinates: Vec<f64>,
}

// ==================== 投影 ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseView {
    pub user: UserSummary,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub author: UserSummary,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub category: PostCategory,
    pub title: String,
    pub description: String,
    pub urgency: Urgency,
    pub location: GeoPoint,
    pub neighborhood: String,
    pub images: Vec<String>,
    pub status: PostStatus,
    pub responses: Vec<ResponseView>,
    pub assigned_to: Option<UserSummary>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponderView {
    pub user: UserSummary,
    pub responded_at: DateTime<Utc>,
}

/// 紧急求助投影，`status` 为有效状态
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyView {
    pub id: Uuid,
    pub user: UserSummary,
    #[serde(rename = "type")]
    pub emergency_type: EmergencyType,
    pub message: String,
    pub location: GeoPoint,
    pub neighborhood: String,
    pub status: EmergencyStatus,
    pub responders: Vec<ResponderView>,
    pub expires_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: Uuid,
    pub sender: UserSummary,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub participants: Vec<UserSummary>,
    pub messages: Vec<MessageView>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub rated_by: UserSummary,
    pub rated_user: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 标记已读结果
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResult {
    pub marked: u64,
}

// ==================== 推送负载 ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyResponseEvent {
    pub emergency_id: Uuid,
    pub responder: UserSummary,
    pub responders_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyResolvedEvent {
    pub emergency_id: Uuid,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessageEvent {
    pub post_id: Uuid,
    pub chat_id: Uuid,
    pub message: MessageView,
}

// ==================== 用户摘要目录 ====================

/// 一次性批量加载被引用用户，用于组装投影
#[derive(Debug, Default)]
pub(crate) struct UserDirectory {
    summaries: HashMap<Uuid, UserSummary>,
}

impl UserDirectory {
    pub(crate) async fn load<I>(users: &dyn UserRepositoryTrait, ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = Uuid>,
    {
        let ids: Vec<Uuid> = ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        let summaries = users
            .get_many(&ids)
            .await?
            .iter()
            .map(|u| (u.id, UserSummary::from(u)))
            .collect();
        Ok(Self { summaries })
    }

    pub(crate) fn summary(&self, id: Uuid) -> UserSummary {
        self.summaries
            .get(&id)
            .cloned()
            .unwrap_or_else(|| UserSummary::unknown(id))
    }
}

pub(crate) fn post_user_ids(post: &Post) -> impl Iterator<Item = Uuid> + '_ {
    std::iter::once(post.author_id)
        .chain(post.assigned_to)
        .chain(post.responses.iter().map(|r| r.user_id))
}

pub(crate) fn emergency_user_ids(emergency: &Emergency) -> impl Iterator<Item = Uuid> + '_ {
    std::iter::once(emergency.user_id).chain(emergency.responders.iter().map(|r| r.user_id))
}

impl PostView {
    pub(crate) fn build(post: Post, users: &UserDirectory) -> Self {
        Self {
            id: post.id,
            author: users.summary(post.author_id),
            post_type: post.post_type,
            category: post.category,
            title: post.title,
            description: post.description,
            urgency: post.urgency,
            location: post.location,
            neighborhood: post.neighborhood,
            images: post.images,
            status: post.status,
            responses: post
                .responses
                .into_iter()
                .map(|r| ResponseView {
                    user: users.summary(r.user_id),
                    message: r.message,
                    created_at: r.created_at,
                })
                .collect(),
            assigned_to: post.assigned_to.map(|id| users.summary(id)),
            completed_at: post.completed_at,
            expires_at: post.expires_at,
            created_at: post.created_at,
        }
    }
}

impl EmergencyView {
    pub(crate) fn build(emergency: Emergency, users: &UserDirectory, now: DateTime<Utc>) -> Self {
        Self {
            id: emergency.id,
            user: users.summary(emergency.user_id),
            emergency_type: emergency.emergency_type,
            message: emergency.message.clone(),
            location: emergency.location,
            neighborhood: emergency.neighborhood.clone(),
            status: emergency.effective_status(now),
            responders: emergency
                .responders
                .iter()
                .map(|r| ResponderView {
                    user: users.summary(r.user_id),
                    responded_at: r.responded_at,
                })
                .collect(),
            expires_at: emergency.expires_at,
            resolved_at: emergency.resolved_at,
            created_at: emergency.created_at,
        }
    }
}

impl MessageView {
    pub(crate) fn build(message: ChatMessage, users: &UserDirectory) -> Self {
        Self {
            id: message.id,
            sender: users.summary(message.sender_id),
            content: message.content,
            read: message.read,
            created_at: message.created_at,
        }
    }
}

impl ChatView {
    pub(crate) fn build(chat: Chat, users: &UserDirectory) -> Self {
        Self {
            id: chat.id,
            post_id: chat.post_id,
            participants: chat.participants.iter().map(|id| users.summary(*id)).collect(),
            messages: chat
                .messages
                .into_iter()
                .map(|m| MessageView::build(m, users))
                .collect(),
            created_at: chat.created_at,
        }
    }
}

impl RatingView {
    pub(crate) fn build(rating: Rating, users: &UserDirectory) -> Self {
        Self {
            id: rating.id,
            post_id: rating.post_id,
            rated_by: users.summary(rating.rated_by),
            rated_user: rating.rated_user,
            rating: rating.rating,
            comment: rating.comment,
            created_at: rating.created_at,
        }
    }
}
