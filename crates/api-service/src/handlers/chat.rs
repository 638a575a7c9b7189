//! 会话 API 处理器
//!
//! 每个帖子一个会话，仅作者与被指派的帮助者可访问

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;
use validator::Validate;

use aid_coordination::CallerContext;
use aid_coordination::dto::{ChatView, MarkReadResult, MessageView};

use crate::{
    dto::{ApiResponse, SendMessageRequest},
    error::Result,
    state::AppState,
};

/// 获取（必要时创建）帖子会话
///
/// GET /api/chat/post/{post_id}
pub async fn get_chat(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ChatView>>> {
    let chat = state.services.chats.open(&caller, post_id).await?;
    Ok(Json(ApiResponse::success(chat)))
}

/// 发送消息
///
/// POST /api/chat/post/{post_id}/message
pub async fn send_message(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<ApiResponse<MessageView>>> {
    req.validate()?;
    let message = state
        .services
        .chats
        .send_message(&caller, post_id, req.content)
        .await?;
    Ok(Json(ApiResponse::success(message)))
}

/// 将对方消息标记为已读
///
/// POST /api/chat/post/{post_id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<ApiResponse<MarkReadResult>>> {
    let result = state.services.chats.mark_read(&caller, post_id).await?;
    Ok(Json(ApiResponse::success(result)))
}
