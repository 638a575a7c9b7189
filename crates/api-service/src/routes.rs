//! 路由配置模块
//!
//! 定义所有 REST API 端点及 SSE 订阅端点的路由映射

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{
    handlers,
    middleware::{identity_middleware, require_verified},
    state::AppState,
};

/// 帖子路由
///
/// 发布与响应仅限已认证街区用户
fn post_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/posts",
            post(handlers::posts::create_post).layer(middleware::from_fn(require_verified)),
        )
        .route(
            "/posts/neighborhood/{neighborhood}",
            get(handlers::posts::list_neighborhood_posts),
        )
        .route("/posts/nearby", get(handlers::posts::list_nearby_posts))
        .route("/posts/user/{user_id}", get(handlers::posts::list_user_posts))
        .route("/posts/{post_id}", get(handlers::posts::get_post))
        .route(
            "/posts/{post_id}/respond",
            post(handlers::posts::respond_post).layer(middleware::from_fn(require_verified)),
        )
        .route(
            "/posts/{post_id}/assign/{helper_id}",
            post(handlers::posts::assign_helper),
        )
        .route(
            "/posts/{post_id}/complete",
            post(handlers::posts::complete_post),
        )
        .route("/posts/{post_id}/rate", post(handlers::posts::rate_post))
}

/// 紧急求助路由
fn emergency_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/emergency/alert",
            post(handlers::emergency::create_alert).layer(middleware::from_fn(require_verified)),
        )
        .route(
            "/emergency/neighborhood/{neighborhood}",
            get(handlers::emergency::list_neighborhood_emergencies),
        )
        .route(
            "/emergency/nearby",
            get(handlers::emergency::list_nearby_emergencies),
        )
        .route("/emergency/{id}", get(handlers::emergency::get_emergency))
        .route(
            "/emergency/{id}/respond",
            post(handlers::emergency::respond_emergency)
                .layer(middleware::from_fn(require_verified)),
        )
        .route(
            "/emergency/{id}/resolve",
            post(handlers::emergency::resolve_emergency),
        )
}

/// 会话路由
fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/chat/post/{post_id}", get(handlers::chat::get_chat))
        .route(
            "/chat/post/{post_id}/message",
            post(handlers::chat::send_message),
        )
        .route("/chat/post/{post_id}/read", post(handlers::chat::mark_read))
}

/// 用户资料路由
fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users/profile/{user_id}",
            get(handlers::users::get_profile),
        )
        .route(
            "/users/leaderboard/{neighborhood}",
            get(handlers::users::leaderboard),
        )
        .route(
            "/users/ratings/{user_id}",
            get(handlers::users::ratings_received),
        )
}

/// 实时推送订阅路由
fn stream_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/stream/neighborhood/{name}",
            get(handlers::stream::neighborhood_stream),
        )
        .route(
            "/stream/chat/{post_id}",
            get(handlers::stream::chat_stream),
        )
}

/// 组合 /api 下的全部路由，统一要求网关注入的身份
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(post_routes())
        .merge(emergency_routes())
        .merge(chat_routes())
        .merge(user_routes())
        .merge(stream_routes())
        .layer(middleware::from_fn(identity_middleware))
}

/// 完整应用路由（不含可观测性等外层中间件）
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .route("/health", get(handlers::health::health_check))
        .with_state(state)
}
