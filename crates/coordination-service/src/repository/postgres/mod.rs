//! Postgres 仓储实现

mod chat_repo;
mod emergency_repo;
mod post_repo;
mod rating_repo;
mod user_repo;

pub use chat_repo::ChatRepository;
pub use emergency_repo::EmergencyRepository;
pub use post_repo::PostRepository;
pub use rating_repo::RatingRepository;
pub use user_repo::UserRepository;
