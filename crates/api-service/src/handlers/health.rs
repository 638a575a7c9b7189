//! 健康检查

use axum::{Json, extract::State, http::StatusCode};

use aid_shared::config::StorageBackend;

use crate::{dto::HealthResponse, state::AppState};

pub const SERVICE_NAME: &str = "aid-api-service";

/// 存活探针；Postgres 后端时同时检查数据库连接
///
/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let storage = match state.storage {
        StorageBackend::Postgres => "postgres",
        StorageBackend::Memory => "memory",
    };

    let healthy = match &state.database {
        Some(db) => db.health_check().await.is_ok(),
        None => true,
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if healthy { "ok" } else { "degraded" },
            service: SERVICE_NAME,
            storage,
        }),
    )
}
