//! 身份中间件
//!
//! 身份认证由上游网关完成，网关通过以下请求头注入已认证用户：
//! `x-user-id`、`x-user-name`、`x-user-neighborhood`、`x-user-verified`，可选 `x-user-avatar`。
//! 本中间件解析这些请求头并将 `CallerContext` 注入请求扩展。

use axum::{
    body::Body,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use aid_coordination::CallerContext;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_NEIGHBORHOOD_HEADER: &str = "x-user-neighborhood";
pub const USER_VERIFIED_HEADER: &str = "x-user-verified";
pub const USER_AVATAR_HEADER: &str = "x-user-avatar";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// 从请求头解析调用方
pub fn parse_caller(headers: &HeaderMap) -> Result<CallerContext, ApiError> {
    let user_id = header(headers, USER_ID_HEADER)
        .ok_or_else(|| ApiError::Unauthorized("缺少用户身份".to_string()))?;
    let user_id = Uuid::parse_str(user_id)
        .map_err(|_| ApiError::Unauthorized("用户身份格式无效".to_string()))?;

    let neighborhood = header(headers, USER_NEIGHBORHOOD_HEADER)
        .ok_or_else(|| ApiError::Unauthorized("缺少用户所属街区".to_string()))?;
    let name = header(headers, USER_NAME_HEADER).unwrap_or_default();
    let verified = header(headers, USER_VERIFIED_HEADER)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);

    let mut caller = CallerContext::new(user_id, name, neighborhood, verified);
    caller.avatar = header(headers, USER_AVATAR_HEADER).map(String::from);
    Ok(caller)
}

/// 身份中间件
///
/// 缺少或无法解析身份时直接返回 401
pub async fn identity_middleware(mut request: Request<Body>, next: Next) -> Response {
    match parse_caller(request.headers()) {
        Ok(caller) => {
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// 认证用户校验中间件
///
/// 必须位于 `identity_middleware` 之后，未认证街区身份的用户返回 403
pub async fn require_verified(request: Request<Body>, next: Next) -> Response {
    match request.extensions().get::<CallerContext>() {
        Some(caller) if caller.verified => next.run(request).await,
        Some(_) => ApiError::Forbidden("该操作仅限已认证的街区用户".to_string()).into_response(),
        None => ApiError::Unauthorized("未认证".to_string()).into_response(),
    }
}
