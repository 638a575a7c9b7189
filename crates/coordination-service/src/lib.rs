//! 街区互助协作核心
//!
//! 负责求助帖子与紧急求助的生命周期状态机、声望与徽章累积规则、
//! 一帖一会话的消息门禁，以及按街区划分的实时推送。
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `reputation`: 声望账本（纯函数）
//! - `repository`: 仓储层（Postgres / 内存）
//! - `service`: 业务服务层

pub mod error;
pub mod models;
pub mod reputation;
pub mod repository;
pub mod service;

pub use error::{CoordinationError, Result};
pub use models::*;
pub use repository::Repositories;
pub use service::{
    ChatService, CoordinationServices, EmergencyService, PostService, ProfileService, dto,
};
