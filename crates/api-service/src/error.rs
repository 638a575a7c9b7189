//! HTTP 层错误类型定义
//!
//! 将协作核心的错误分类映射为 HTTP 状态码和统一响应信封。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use aid_coordination::CoordinationError;

/// HTTP 层错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("未认证: {0}")]
    Unauthorized(String),

    #[error("禁止访问: {0}")]
    Forbidden(String),

    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Coordination(err) => match err {
                CoordinationError::Validation(_) | CoordinationError::Precondition(_) => {
                    StatusCode::BAD_REQUEST
                }
                CoordinationError::Permission(_) => StatusCode::FORBIDDEN,
                CoordinationError::InvalidState(_) | CoordinationError::Duplicate(_) => {
                    StatusCode::CONFLICT
                }
                CoordinationError::Expired(_) => StatusCode::GONE,
                CoordinationError::PostNotFound(_)
                | CoordinationError::EmergencyNotFound(_)
                | CoordinationError::UserNotFound(_) => StatusCode::NOT_FOUND,
                CoordinationError::Database(_) | CoordinationError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Coordination(err) => err.error_code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Coordination(CoordinationError::Database(e)) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Coordination(CoordinationError::Internal(e)) | Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (
                CoordinationError::Precondition("x".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                CoordinationError::Permission("x".into()).into(),
                StatusCode::FORBIDDEN,
            ),
            (
                CoordinationError::InvalidState("x".into()).into(),
                StatusCode::CONFLICT,
            ),
            (
                CoordinationError::Duplicate("x".into()).into(),
                StatusCode::CONFLICT,
            ),
            (CoordinationError::Expired("x".into()).into(), StatusCode::GONE),
            (
                CoordinationError::PostNotFound(Uuid::nil()).into(),
                StatusCode::NOT_FOUND,
            ),
            (
                CoordinationError::Database(sqlx::Error::PoolTimedOut).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status_code(), expected, "{err:?}");
        }
    }

    #[test]
    fn test_error_code_delegates_to_core() {
        let err: ApiError = CoordinationError::Duplicate("ratings".into()).into();
        assert_eq!(err.error_code(), "DUPLICATE");
        assert_eq!(ApiError::Unauthorized("x".into()).error_code(), "UNAUTHORIZED");
    }
}
