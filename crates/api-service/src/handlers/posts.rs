//! 帖子 API 处理器
//!
//! 实现帖子的发布、查询以及 respond → assign → complete → rate 生命周期

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use aid_coordination::CallerContext;
use aid_coordination::dto::{PostView, RatingView};

use crate::{
    dto::{
        ApiResponse, CreatePostRequest, NearbyQuery, PostListQuery, RatePostRequest,
        RespondPostRequest,
    },
    error::Result,
    state::AppState,
};

/// 发布帖子
///
/// POST /api/posts
pub async fn create_post(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Json(req): Json<CreatePostRequest>,
) -> Result<Json<ApiResponse<PostView>>> {
    req.validate()?;
    let post = state.services.posts.create(&caller, req.into()).await?;
    info!(post_id = %post.id, user_id = %caller.user_id, "帖子已发布");
    Ok(Json(ApiResponse::success(post)))
}

/// 街区帖子列表
///
/// GET /api/posts/neighborhood/{neighborhood}
pub async fn list_neighborhood_posts(
    State(state): State<AppState>,
    Path(neighborhood): Path<String>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<ApiResponse<Vec<PostView>>>> {
    let posts = state
        .services
        .posts
        .list_neighborhood(query.into_filter(neighborhood))
        .await?;
    Ok(Json(ApiResponse::success(posts)))
}

/// 附近帖子
///
/// GET /api/posts/nearby?lng=&lat=&maxDistance=
pub async fn list_nearby_posts(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<ApiResponse<Vec<PostView>>>> {
    let posts = state
        .services
        .posts
        .list_nearby(&query.coordinates(), query.max_distance)
        .await?;
    Ok(Json(ApiResponse::success(posts)))
}

/// 用户发布的帖子
///
/// GET /api/posts/user/{user_id}
pub async fn list_user_posts(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<PostView>>>> {
    let posts = state.services.posts.list_by_author(user_id).await?;
    Ok(Json(ApiResponse::success(posts)))
}

/// 帖子详情
///
/// GET /api/posts/{post_id}
pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<ApiResponse<PostView>>> {
    let post = state.services.posts.get(post_id).await?;
    Ok(Json(ApiResponse::success(post)))
}

/// 响应帖子
///
/// POST /api/posts/{post_id}/respond
pub async fn respond_post(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<RespondPostRequest>,
) -> Result<Json<ApiResponse<PostView>>> {
    req.validate()?;
    let post = state
        .services
        .posts
        .respond(&caller, post_id, req.message)
        .await?;
    Ok(Json(ApiResponse::success(post)))
}

/// 指派帮助者
///
/// POST /api/posts/{post_id}/assign/{helper_id}
pub async fn assign_helper(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path((post_id, helper_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<PostView>>> {
    let post = state
        .services
        .posts
        .assign(&caller, post_id, helper_id)
        .await?;
    Ok(Json(ApiResponse::success(post)))
}

/// 完成帖子
///
/// POST /api/posts/{post_id}/complete
pub async fn complete_post(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<ApiResponse<PostView>>> {
    let post = state.services.posts.complete(&caller, post_id).await?;
    Ok(Json(ApiResponse::success(post)))
}

/// 评价帮助者
///
/// POST /api/posts/{post_id}/rate
pub async fn rate_post(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<RatePostRequest>,
) -> Result<Json<ApiResponse<RatingView>>> {
    req.validate()?;
    let rating = state
        .services
        .posts
        .rate(&caller, post_id, req.rating, req.comment)
        .await?;
    Ok(Json(ApiResponse::success(rating)))
}
