//! 数据仓储层
//!
//! 提供所有实体的数据访问接口，封装存储细节。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含业务逻辑（声望规则除外：由 `ReputationEvent` 注入到原子读改写中）
//! - 每个写方法是单实体原子步骤；唯一性由存储约束保证，核心内不设锁管理器
//! - 定义 trait 接口，服务层只依赖 `Arc<dyn Trait>`，支持 Postgres / 内存 / mock 替换

mod memory;
mod postgres;
mod traits;

use std::sync::Arc;

use sqlx::PgPool;

pub use memory::{MemoryStore, MemoryTable};
pub use postgres::{
    ChatRepository, EmergencyRepository, PostRepository, RatingRepository, UserRepository,
};
pub use traits::*;

/// 服务层使用的仓储集合
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepositoryTrait>,
    pub posts: Arc<dyn PostRepositoryTrait>,
    pub emergencies: Arc<dyn EmergencyRepositoryTrait>,
    pub chats: Arc<dyn ChatRepositoryTrait>,
    pub ratings: Arc<dyn RatingRepositoryTrait>,
}

impl Repositories {
    /// Postgres 实现
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            posts: Arc::new(PostRepository::new(pool.clone())),
            emergencies: Arc::new(EmergencyRepository::new(pool.clone())),
            chats: Arc::new(ChatRepository::new(pool.clone())),
            ratings: Arc::new(RatingRepository::new(pool)),
        }
    }

    /// 内存实现，五个仓储共享同一份存储
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            posts: store.clone(),
            emergencies: store.clone(),
            chats: store.clone(),
            ratings: store,
        }
    }
}
