//! 实时推送订阅（Server-Sent Events）
//!
//! 客户端通过 SSE 订阅街区主题或帖子会话主题；
//! 会话主题与会话读写使用同一门禁谓词。

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Extension,
    extract::{Path, State},
    response::sse::{Event, KeepAlive, KeepAliveStream, Sse},
};
use futures::StreamExt;
use futures::stream::BoxStream;
use tracing::info;
use uuid::Uuid;

use aid_coordination::CallerContext;
use aid_shared::events::{FanoutEvent, Topic};

use crate::{error::Result, state::AppState};

const KEEP_ALIVE_SECS: u64 = 15;

fn to_sse(event: FanoutEvent) -> Event {
    Event::default()
        .event(event.kind.as_str())
        .id(event.event_id.clone())
        .json_data(&event)
        .unwrap_or_else(|e| Event::default().comment(format!("事件序列化失败: {e}")))
}

type EventStream = BoxStream<'static, std::result::Result<Event, Infallible>>;

/// 带心跳的 SSE 响应
type TopicSse = Sse<KeepAliveStream<EventStream>>;

fn sse_for(state: &AppState, topic: &Topic) -> TopicSse {
    let stream = state
        .broker
        .subscribe(topic)
        .map(|event| Ok(to_sse(event)))
        .boxed();

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("ping"),
    )
}

/// 订阅街区推送
///
/// GET /api/stream/neighborhood/{name}
pub async fn neighborhood_stream(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(name): Path<String>,
) -> TopicSse {
    let topic = Topic::neighborhood(name);
    info!(user_id = %caller.user_id, topic = %topic, "客户端订阅街区推送");
    sse_for(&state, &topic)
}

/// 订阅帖子会话推送
///
/// GET /api/stream/chat/{post_id}
pub async fn chat_stream(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(post_id): Path<Uuid>,
) -> Result<TopicSse> {
    state.services.chats.authorize(caller.user_id, post_id).await?;
    let topic = Topic::chat(post_id);
    info!(user_id = %caller.user_id, topic = %topic, "客户端订阅会话推送");
    Ok(sse_for(&state, &topic))
}
