//! 服务层
//!
//! 实现协作核心的业务逻辑，协调仓储层与实时推送。
//!
//! ## 模块结构
//!
//! - `dto`: 入参与对外投影
//! - `post_service`: 帖子生命周期
//! - `emergency_service`: 紧急求助生命周期
//! - `chat_service`: 会话门禁
//! - `profile_service`: 用户资料查询（只读）

pub mod chat_service;
pub mod dto;
pub mod emergency_service;
pub mod post_service;
pub mod profile_service;

use aid_shared::config::LifecycleConfig;
use aid_shared::fanout::FanoutPublisher;

pub use chat_service::ChatService;
pub use dto::*;
pub use emergency_service::EmergencyService;
pub use post_service::PostService;
pub use profile_service::ProfileService;

use crate::repository::Repositories;

/// 全部服务的集合，由入口统一构建
pub struct CoordinationServices {
    pub posts: PostService,
    pub emergencies: EmergencyService,
    pub chats: ChatService,
    pub profiles: ProfileService,
}

impl CoordinationServices {
    pub fn new(repos: Repositories, fanout: FanoutPublisher, lifecycle: LifecycleConfig) -> Self {
        Self {
            posts: PostService::new(repos.clone(), lifecycle.clone()),
            emergencies: EmergencyService::new(repos.clone(), fanout.clone(), lifecycle.clone()),
            chats: ChatService::new(repos.clone(), fanout),
            profiles: ProfileService::new(repos, lifecycle),
        }
    }
}
