//! 中间件模块
//!
//! 提供网关注入身份的解析和认证用户校验

mod identity;

pub use identity::{identity_middleware, parse_caller, require_verified};
