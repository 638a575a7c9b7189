//! HTTP 请求处理器

pub mod chat;
pub mod emergency;
pub mod health;
pub mod posts;
pub mod stream;
pub mod users;
