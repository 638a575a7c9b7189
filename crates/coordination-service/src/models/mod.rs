//! 互助协作领域模型
//!
//! 包含用户、帖子、紧急求助、会话和评分的核心实体定义

pub mod caller;
pub mod chat;
pub mod emergency;
pub mod enums;
pub mod geo;
pub mod post;
pub mod rating;
pub mod user;

// 重新导出常用类型
pub use caller::CallerContext;
pub use chat::{Chat, ChatMessage};
pub use emergency::{Emergency, NewEmergency, Responder};
pub use enums::{Badge, EmergencyStatus, EmergencyType, PostCategory, PostStatus, PostType, Urgency};
pub use geo::GeoPoint;
pub use post::{NewPost, Post, PostFilter, PostResponse};
pub use rating::Rating;
pub use user::{RatingSummary, User, UserProfile, UserSummary};
