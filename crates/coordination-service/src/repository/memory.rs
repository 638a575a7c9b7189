//! 内存仓储
//!
//! 基于 DashMap 的高并发内存实现，适用于测试和 `storage.backend = memory` 的开发环境。
//! 单实体的读改写在持有该条目写锁期间完成，等价于 Postgres 实现中的条件 UPDATE。

use std::cmp::Ordering;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::traits::{
    ChatRepositoryTrait, EmergencyRepositoryTrait, PostRepositoryTrait, RatingRepositoryTrait,
    UserRepositoryTrait,
};
use crate::error::{CoordinationError, Result};
use crate::models::{
    Chat, ChatMessage, Emergency, EmergencyStatus, GeoPoint, Post, PostFilter, PostResponse,
    PostStatus, Rating, RatingSummary, Responder, User,
};
use crate::reputation::ReputationEvent;

/// 通用内存表
///
/// 基于 DashMap 实现，`update` 在条目写锁内执行闭包，保证单条记录的原子读改写。
#[derive(Debug)]
pub struct MemoryTable<K, T>
where
    K: Eq + Hash,
{
    data: Arc<DashMap<K, T>>,
}

impl<K: Eq + Hash + Clone, T: Clone> Default for MemoryTable<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone, T: Clone> Clone for MemoryTable<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Eq + Hash + Clone, T: Clone> MemoryTable<K, T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
        }
    }

    /// 仅在 key 不存在时插入，已存在返回 `false`
    pub fn insert_new(&self, key: K, value: T) -> bool {
        match self.data.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    /// 返回已存在的值，不存在时用 `init` 创建；整个过程持有分片锁
    pub fn get_or_insert_with<F>(&self, key: K, init: F) -> T
    where
        F: FnOnce() -> T,
    {
        self.data.entry(key).or_insert_with(init).value().clone()
    }

    /// 返回数据的克隆，不持有锁
    pub fn get(&self, key: &K) -> Option<T> {
        self.data.get(key).map(|v| v.clone())
    }

    /// 在条目写锁内修改，记录不存在返回 `None`
    pub fn update<R, F>(&self, key: &K, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        self.data.get_mut(key).map(|mut entry| f(entry.value_mut()))
    }

    /// 按条件筛选
    pub fn list_by<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.data
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.data.len()
    }
}

/// 内存存储
///
/// 一份存储同时实现五个仓储接口，`Repositories::in_memory` 将其共享给各服务。
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    users: MemoryTable<Uuid, User>,
    posts: MemoryTable<Uuid, Post>,
    emergencies: MemoryTable<Uuid, Emergency>,
    /// 以 post_id 为键，天然保证一帖一会话
    chats: MemoryTable<Uuid, Chat>,
    /// 以 (post_id, rated_by) 为键，天然保证唯一评分
    ratings: MemoryTable<(Uuid, Uuid), Rating>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, F>(items: &mut [T], created_at: F)
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
}

fn truncate<T>(mut items: Vec<T>, limit: i64) -> Vec<T> {
    items.truncate(usize::try_from(limit).unwrap_or(0));
    items
}

/// 半径内按距离升序
fn nearest<T, F>(items: Vec<T>, origin: GeoPoint, radius_m: f64, location: F) -> Vec<T>
where
    F: Fn(&T) -> GeoPoint,
{
    let mut scored: Vec<(f64, T)> = items
        .into_iter()
        .map(|item| (origin.distance_m(&location(&item)), item))
        .filter(|(distance, _)| *distance <= radius_m)
        .collect();
    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    scored.into_iter().map(|(_, item)| item).collect()
}

// ==================== 用户 ====================

#[async_trait]
impl UserRepositoryTrait for MemoryStore {
    async fn create(&self, user: &User) -> Result<()> {
        if self.users.insert_new(user.id, user.clone()) {
            Ok(())
        } else {
            Err(CoordinationError::Duplicate(format!("user {}", user.id)))
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id))
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        Ok(ids.iter().filter_map(|id| self.users.get(id)).collect())
    }

    async fn apply_reputation(&self, id: Uuid, event: ReputationEvent) -> Result<User> {
        self.users
            .update(&id, |user| {
                event.apply(user);
                user.clone()
            })
            .ok_or(CoordinationError::UserNotFound(id))
    }

    async fn set_rating_summary(&self, id: Uuid, summary: RatingSummary) -> Result<()> {
        self.users
            .update(&id, |user| user.ratings = summary)
            .ok_or(CoordinationError::UserNotFound(id))
    }

    async fn leaderboard(&self, neighborhood: &str, limit: i64) -> Result<Vec<User>> {
        let mut users = self
            .users
            .list_by(|u| u.verified && u.neighborhood == neighborhood);
        users.sort_by(|a, b| b.karma.cmp(&a.karma).then_with(|| a.name.cmp(&b.name)));
        Ok(truncate(users, limit))
    }
}

// ==================== 帖子 ====================

#[async_trait]
impl PostRepositoryTrait for MemoryStore {
    async fn create(&self, post: &Post) -> Result<()> {
        if self.posts.insert_new(post.id, post.clone()) {
            Ok(())
        } else {
            Err(CoordinationError::Duplicate(format!("post {}", post.id)))
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Post>> {
        Ok(self.posts.get(&id))
    }

    async fn list_by_filter(&self, filter: &PostFilter, limit: i64) -> Result<Vec<Post>> {
        let mut posts = self.posts.list_by(|p| filter.matches(p));
        newest_first(&mut posts, |p| p.created_at);
        Ok(truncate(posts, limit))
    }

    async fn list_nearby(
        &self,
        point: GeoPoint,
        radius_m: f64,
        statuses: &[PostStatus],
        limit: i64,
    ) -> Result<Vec<Post>> {
        let posts = self.posts.list_by(|p| statuses.contains(&p.status));
        Ok(truncate(nearest(posts, point, radius_m, |p| p.location), limit))
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>> {
        let mut posts = self.posts.list_by(|p| p.author_id == author_id);
        newest_first(&mut posts, |p| p.created_at);
        Ok(posts)
    }

    async fn append_response(&self, post_id: Uuid, response: &PostResponse) -> Result<bool> {
        let appended = self.posts.update(&post_id, |post| {
            if post.status != PostStatus::Active {
                return false;
            }
            post.responses.push(response.clone());
            post.updated_at = response.created_at;
            true
        });
        Ok(appended.unwrap_or(false))
    }

    async fn assign(&self, post_id: Uuid, helper_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let assigned = self.posts.update(&post_id, |post| {
            if post.status != PostStatus::Active {
                return false;
            }
            post.assigned_to = Some(helper_id);
            post.status = PostStatus::InProgress;
            post.updated_at = now;
            true
        });
        Ok(assigned.unwrap_or(false))
    }

    async fn complete(&self, post_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let completed = self.posts.update(&post_id, |post| {
            if post.status != PostStatus::InProgress {
                return false;
            }
            post.status = PostStatus::Completed;
            post.completed_at = Some(now);
            post.updated_at = now;
            true
        });
        Ok(completed.unwrap_or(false))
    }
}

// ==================== 紧急求助 ====================

#[async_trait]
impl EmergencyRepositoryTrait for MemoryStore {
    async fn create(&self, emergency: &Emergency) -> Result<()> {
        if self.emergencies.insert_new(emergency.id, emergency.clone()) {
            Ok(())
        } else {
            Err(CoordinationError::Duplicate(format!(
                "emergency {}",
                emergency.id
            )))
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Emergency>> {
        Ok(self.emergencies.get(&id))
    }

    async fn list_active(&self, neighborhood: &str, now: DateTime<Utc>) -> Result<Vec<Emergency>> {
        let mut emergencies = self
            .emergencies
            .list_by(|e| e.neighborhood == neighborhood && e.is_effectively_active(now));
        newest_first(&mut emergencies, |e| e.created_at);
        Ok(emergencies)
    }

    async fn list_nearby_active(
        &self,
        point: GeoPoint,
        radius_m: f64,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Emergency>> {
        let emergencies = self.emergencies.list_by(|e| e.is_effectively_active(now));
        Ok(truncate(
            nearest(emergencies, point, radius_m, |e| e.location),
            limit,
        ))
    }

    async fn add_responder(&self, emergency_id: Uuid, responder: &Responder) -> Result<bool> {
        let outcome = self.emergencies.update(&emergency_id, |emergency| {
            if emergency.status != EmergencyStatus::Active
                || emergency.user_id == responder.user_id
            {
                return Ok(false);
            }
            if emergency.has_responder(responder.user_id) {
                return Err(CoordinationError::Duplicate(format!(
                    "responder {} on emergency {}",
                    responder.user_id, emergency_id
                )));
            }
            emergency.responders.push(responder.clone());
            emergency.updated_at = responder.responded_at;
            Ok(true)
        });
        outcome.unwrap_or(Ok(false))
    }

    async fn mark_expired(&self, emergency_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let expired = self.emergencies.update(&emergency_id, |emergency| {
            if emergency.status != EmergencyStatus::Active {
                return false;
            }
            emergency.status = EmergencyStatus::Expired;
            emergency.updated_at = now;
            true
        });
        Ok(expired.unwrap_or(false))
    }

    async fn resolve(&self, emergency_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let resolved = self.emergencies.update(&emergency_id, |emergency| {
            if emergency.status != EmergencyStatus::Active {
                return false;
            }
            emergency.status = EmergencyStatus::Resolved;
            emergency.resolved_at = Some(now);
            emergency.updated_at = now;
            true
        });
        Ok(resolved.unwrap_or(false))
    }
}

// ==================== 会话 ====================

#[async_trait]
impl ChatRepositoryTrait for MemoryStore {
    async fn get_or_create(&self, post_id: Uuid, participants: &[Uuid]) -> Result<Chat> {
        Ok(self.chats.get_or_insert_with(post_id, || {
            Chat::new(post_id, participants.to_vec(), Utc::now())
        }))
    }

    async fn get_by_post(&self, post_id: Uuid) -> Result<Option<Chat>> {
        Ok(self.chats.get(&post_id))
    }

    async fn append_message(&self, post_id: Uuid, message: &ChatMessage) -> Result<()> {
        self.chats
            .update(&post_id, |chat| {
                chat.messages.push(message.clone());
                chat.updated_at = message.created_at;
            })
            .ok_or_else(|| CoordinationError::Internal(format!("帖子会话不存在: {post_id}")))
    }

    async fn mark_read(&self, post_id: Uuid, reader: Uuid) -> Result<u64> {
        Ok(self
            .chats
            .update(&post_id, |chat| chat.mark_read_for(reader))
            .unwrap_or(0))
    }
}

// ==================== 评分 ====================

#[async_trait]
impl RatingRepositoryTrait for MemoryStore {
    async fn create(&self, rating: &Rating) -> Result<()> {
        if self
            .ratings
            .insert_new((rating.post_id, rating.rated_by), rating.clone())
        {
            Ok(())
        } else {
            Err(CoordinationError::Duplicate(format!(
                "rating for post {} by {}",
                rating.post_id, rating.rated_by
            )))
        }
    }

    async fn find(&self, post_id: Uuid, rated_by: Uuid) -> Result<Option<Rating>> {
        Ok(self.ratings.get(&(post_id, rated_by)))
    }

    async fn list_for_user(&self, rated_user: Uuid, limit: i64) -> Result<Vec<Rating>> {
        let mut ratings = self.ratings.list_by(|r| r.rated_user == rated_user);
        newest_first(&mut ratings, |r| r.created_at);
        Ok(truncate(ratings, limit))
    }

    async fn summarize(&self, rated_user: Uuid) -> Result<RatingSummary> {
        let values: Vec<i32> = self
            .ratings
            .list_by(|r| r.rated_user == rated_user)
            .into_iter()
            .map(|r| r.rating)
            .collect();
        Ok(RatingSummary::from_values(&values))
    }
}
