//! 紧急求助 API 处理器

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use aid_coordination::CallerContext;
use aid_coordination::dto::EmergencyView;

use crate::{
    dto::{ApiResponse, CreateEmergencyRequest, NearbyQuery},
    error::Result,
    state::AppState,
};

/// 发起紧急求助
///
/// POST /api/emergency/alert
pub async fn create_alert(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Json(req): Json<CreateEmergencyRequest>,
) -> Result<Json<ApiResponse<EmergencyView>>> {
    req.validate()?;
    let emergency = state.services.emergencies.create(&caller, req.into()).await?;
    warn!(
        emergency_id = %emergency.id,
        neighborhood = %emergency.neighborhood,
        "收到紧急求助"
    );
    Ok(Json(ApiResponse::success(emergency)))
}

/// 街区内有效的紧急求助
///
/// GET /api/emergency/neighborhood/{neighborhood}
pub async fn list_neighborhood_emergencies(
    State(state): State<AppState>,
    Path(neighborhood): Path<String>,
) -> Result<Json<ApiResponse<Vec<EmergencyView>>>> {
    let emergencies = state.services.emergencies.list_active(&neighborhood).await?;
    Ok(Json(ApiResponse::success(emergencies)))
}

/// 附近有效的紧急求助
///
/// GET /api/emergency/nearby?lng=&lat=&maxDistance=
pub async fn list_nearby_emergencies(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<ApiResponse<Vec<EmergencyView>>>> {
    let emergencies = state
        .services
        .emergencies
        .list_nearby(&query.coordinates(), query.max_distance)
        .await?;
    Ok(Json(ApiResponse::success(emergencies)))
}

/// 紧急求助详情
///
/// GET /api/emergency/{id}
pub async fn get_emergency(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<EmergencyView>>> {
    let emergency = state.services.emergencies.get(id).await?;
    Ok(Json(ApiResponse::success(emergency)))
}

/// 响应紧急求助
///
/// POST /api/emergency/{id}/respond
pub async fn respond_emergency(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<EmergencyView>>> {
    let emergency = state.services.emergencies.respond(&caller, id).await?;
    Ok(Json(ApiResponse::success(emergency)))
}

/// 标记紧急求助已解决
///
/// POST /api/emergency/{id}/resolve
pub async fn resolve_emergency(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<EmergencyView>>> {
    let emergency = state.services.emergencies.resolve(&caller, id).await?;
    Ok(Json(ApiResponse::success_with_message(emergency, "紧急求助已解决")))
}
