//! 协作核心错误类型
//!
//! 业务错误均为本地同步失败，核心内部不做重试；重试策略（如有）属于传输层。

use thiserror::Error;
use uuid::Uuid;

/// 协作核心错误类型
#[derive(Debug, Error)]
pub enum CoordinationError {
    // === 业务错误 ===
    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("无权操作: {0}")]
    Permission(String),

    #[error("当前状态不允许此操作: {0}")]
    InvalidState(String),

    #[error("前置条件不满足: {0}")]
    Precondition(String),

    #[error("重复操作: {0}")]
    Duplicate(String),

    #[error("已过期: {0}")]
    Expired(String),

    #[error("帖子不存在: {0}")]
    PostNotFound(Uuid),

    #[error("紧急求助不存在: {0}")]
    EmergencyNotFound(Uuid),

    #[error("用户不存在: {0}")]
    UserNotFound(Uuid),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(sqlx::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 协作核心 Result 类型别名
pub type Result<T> = std::result::Result<T, CoordinationError>;

/// Postgres 唯一约束冲突码
const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for CoordinationError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err
            && db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
        {
            let constraint = db_err.constraint().unwrap_or("unique").to_string();
            return Self::Duplicate(constraint);
        }
        Self::Database(err)
    }
}

impl CoordinationError {
    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(self, Self::Database(_) | Self::Internal(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PostNotFound(_) | Self::EmergencyNotFound(_) | Self::UserNotFound(_)
        )
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Permission(_) => "PERMISSION_DENIED",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Precondition(_) => "PRECONDITION_FAILED",
            Self::Duplicate(_) => "DUPLICATE",
            Self::Expired(_) => "EXPIRED",
            Self::PostNotFound(_) => "POST_NOT_FOUND",
            Self::EmergencyNotFound(_) => "EMERGENCY_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
