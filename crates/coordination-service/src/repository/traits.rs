//! 仓储 Trait 定义
//!
//! 服务层依赖这些接口而非具体实现，支持 Postgres、内存实现与 mock 测试。
//!
//! 所有写方法都是针对单个实体的原子步骤：列表追加是原子插入，
//! 状态迁移是带前置状态条件的比较交换（返回 `false` 表示前置状态已不满足）。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Chat, ChatMessage, Emergency, GeoPoint, Post, PostFilter, PostResponse, PostStatus, Rating,
    RatingSummary, Responder, User,
};
use crate::reputation::ReputationEvent;

/// 用户仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    async fn create(&self, user: &User) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<User>>;
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<User>>;

    /// 在单用户原子读改写中应用声望事件，返回更新后的用户
    async fn apply_reputation(&self, id: Uuid, event: ReputationEvent) -> Result<User>;

    async fn set_rating_summary(&self, id: Uuid, summary: RatingSummary) -> Result<()>;

    /// 街区内已认证用户，按 karma 降序
    async fn leaderboard(&self, neighborhood: &str, limit: i64) -> Result<Vec<User>>;
}

/// 帖子仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepositoryTrait: Send + Sync {
    async fn create(&self, post: &Post) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Post>>;

    /// 按街区过滤，最新优先
    async fn list_by_filter(&self, filter: &PostFilter, limit: i64) -> Result<Vec<Post>>;

    /// 半径内按距离升序
    async fn list_nearby(
        &self,
        point: GeoPoint,
        radius_m: f64,
        statuses: &[PostStatus],
        limit: i64,
    ) -> Result<Vec<Post>>;

    /// 作者的全部帖子，最新优先
    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>>;

    /// 仅当帖子仍为 active 时追加响应
    async fn append_response(&self, post_id: Uuid, response: &PostResponse) -> Result<bool>;

    /// active → in-progress，同时写入被指派者
    async fn assign(&self, post_id: Uuid, helper_id: Uuid, now: DateTime<Utc>) -> Result<bool>;

    /// in-progress → completed
    async fn complete(&self, post_id: Uuid, now: DateTime<Utc>) -> Result<bool>;
}

/// 紧急求助仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmergencyRepositoryTrait: Send + Sync {
    async fn create(&self, emergency: &Emergency) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Emergency>>;

    /// 街区内有效状态为 active 的求助（重新比对截止时间）
    async fn list_active(&self, neighborhood: &str, now: DateTime<Utc>) -> Result<Vec<Emergency>>;

    async fn list_nearby_active(
        &self,
        point: GeoPoint,
        radius_m: f64,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Emergency>>;

    /// 仅当求助仍为 active 且响应者不是创建者时追加；重复响应返回 `Duplicate`
    async fn add_responder(&self, emergency_id: Uuid, responder: &Responder) -> Result<bool>;

    /// active → expired
    async fn mark_expired(&self, emergency_id: Uuid, now: DateTime<Utc>) -> Result<bool>;

    /// active → resolved
    async fn resolve(&self, emergency_id: Uuid, now: DateTime<Utc>) -> Result<bool>;
}

/// 会话仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepositoryTrait: Send + Sync {
    /// 返回帖子已有的会话，不存在则以给定参与者创建；并发调用得到同一会话
    async fn get_or_create(&self, post_id: Uuid, participants: &[Uuid]) -> Result<Chat>;

    async fn get_by_post(&self, post_id: Uuid) -> Result<Option<Chat>>;

    /// 向帖子的会话追加消息，会话须已存在
    async fn append_message(&self, post_id: Uuid, message: &ChatMessage) -> Result<()>;

    /// 将非 reader 发送的消息标记为已读，返回翻转条数
    async fn mark_read(&self, post_id: Uuid, reader: Uuid) -> Result<u64>;
}

/// 评分仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RatingRepositoryTrait: Send + Sync {
    /// 同一 (post, rated_by) 重复写入返回 `Duplicate`
    async fn create(&self, rating: &Rating) -> Result<()>;
    async fn find(&self, post_id: Uuid, rated_by: Uuid) -> Result<Option<Rating>>;
    async fn list_for_user(&self, rated_user: Uuid, limit: i64) -> Result<Vec<Rating>>;
    async fn summarize(&self, rated_user: Uuid) -> Result<RatingSummary>;
}
