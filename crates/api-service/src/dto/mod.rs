//! 数据传输对象
//!
//! - `request`: 请求体与查询参数
//! - `response`: 统一响应信封

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;
