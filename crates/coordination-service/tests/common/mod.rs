//! 集成测试公共夹具
//!
//! 使用内存仓储和进程内广播器组装完整服务，无需外部依赖。

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;

use aid_coordination::models::{CallerContext, User};
use aid_coordination::repository::Repositories;
use aid_coordination::service::CoordinationServices;
use aid_shared::config::{FanoutConfig, LifecycleConfig};
use aid_shared::events::FanoutEvent;
use aid_shared::fanout::{EventBroker, FanoutPublisher, InMemoryBroker};

pub struct TestApp {
    pub repos: Repositories,
    pub broker: Arc<InMemoryBroker>,
    pub services: CoordinationServices,
}

impl TestApp {
    pub fn new() -> Self {
        let broker = Arc::new(InMemoryBroker::new(64));
        Self::with_broker(broker.clone(), broker)
    }

    /// 使用自定义广播器（如不可用的广播器）
    pub fn with_broker(broker: Arc<InMemoryBroker>, publish_to: Arc<dyn EventBroker>) -> Self {
        let repos = Repositories::in_memory();
        let fanout = FanoutPublisher::new(publish_to, &FanoutConfig::default());
        let services = CoordinationServices::new(repos.clone(), fanout, LifecycleConfig::default());
        Self {
            repos,
            broker,
            services,
        }
    }

    /// 注册一个用户并返回其调用上下文
    pub async fn user(&self, name: &str, neighborhood: &str) -> CallerContext {
        let user = User::new(
            name,
            format!("{}@example.com", name.to_lowercase()),
            neighborhood,
            true,
        );
        self.repos.users.create(&user).await.expect("create user");
        CallerContext::from(&user)
    }

    pub async fn load_user(&self, caller: &CallerContext) -> User {
        self.repos
            .users
            .get(caller.user_id)
            .await
            .expect("get user")
            .expect("user exists")
    }
}

/// 在超时内读取下一条事件
pub async fn next_event(stream: &mut BoxStream<'static, FanoutEvent>) -> Option<FanoutEvent> {
    tokio::time::timeout(Duration::from_millis(500), stream.next())
        .await
        .ok()
        .flatten()
}

pub const OAK: [f64; 2] = [-122.4194, 37.7749];
