//! 用户资料 API 处理器（只读）

use axum::{
    Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;

use aid_coordination::UserProfile;
use aid_coordination::dto::RatingView;

use crate::{
    dto::{ApiResponse, LeaderboardQuery},
    error::Result,
    state::AppState,
};

/// GET /api/users/profile/{user_id}
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserProfile>>> {
    let profile = state.services.profiles.profile(user_id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// GET /api/users/leaderboard/{neighborhood}?limit=
pub async fn leaderboard(
    State(state): State<AppState>,
    Path(neighborhood): Path<String>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<ApiResponse<Vec<UserProfile>>>> {
    let leaders = state
        .services
        .profiles
        .leaderboard(&neighborhood, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(leaders)))
}

/// GET /api/users/ratings/{user_id}
pub async fn ratings_received(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<RatingView>>>> {
    let ratings = state.services.profiles.ratings_received(user_id).await?;
    Ok(Json(ApiResponse::success(ratings)))
}
