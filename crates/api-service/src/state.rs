//! 应用状态定义
//!
//! 包含 Axum 路由共享的业务服务、广播器和存储后端。

use std::sync::Arc;

use aid_coordination::{CoordinationServices, Repositories};
use aid_shared::config::{FanoutConfig, LifecycleConfig, StorageBackend};
use aid_shared::database::Database;
use aid_shared::fanout::{EventBroker, FanoutPublisher, InMemoryBroker};

/// Axum 应用共享状态
///
/// 所有字段通过 Arc 在 handler 间共享
#[derive(Clone)]
pub struct AppState {
    /// 帖子、紧急求助、会话与资料服务
    pub services: Arc<CoordinationServices>,
    /// 实时推送订阅端
    pub broker: Arc<dyn EventBroker>,
    /// Postgres 后端时持有连接池，用于健康检查
    pub database: Option<Database>,
    pub storage: StorageBackend,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(
        repos: Repositories,
        broker: Arc<dyn EventBroker>,
        fanout: &FanoutConfig,
        lifecycle: LifecycleConfig,
        database: Option<Database>,
    ) -> Self {
        let publisher = FanoutPublisher::new(broker.clone(), fanout);
        let storage = if database.is_some() {
            StorageBackend::Postgres
        } else {
            StorageBackend::Memory
        };
        Self {
            services: Arc::new(CoordinationServices::new(repos, publisher, lifecycle)),
            broker,
            database,
            storage,
        }
    }

    /// 内存存储 + 进程内广播器，用于开发与测试
    pub fn in_memory(repos: Repositories, lifecycle: LifecycleConfig) -> Self {
        let fanout = FanoutConfig::default();
        let broker: Arc<dyn EventBroker> = Arc::new(InMemoryBroker::from_config(&fanout));
        Self::new(repos, broker, &fanout, lifecycle, None)
    }
}
