//! 会话门禁服务
//!
//! 每个帖子至多一个会话，只有作者和被指派的帮助者可以打开或发言。
//! 会话在指派后第一次访问或第一次发消息时惰性创建。

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use aid_shared::events::{EventKind, Topic};
use aid_shared::fanout::FanoutPublisher;
use aid_shared::observability::metrics;

use crate::error::{CoordinationError, Result};
use crate::models::{CallerContext, Chat, ChatMessage, Post};
use crate::repository::Repositories;
use crate::service::dto::{ChatView, MarkReadResult, MessageView, NewMessageEvent, UserDirectory};

/// 单条消息最大长度（字符）
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// 会话门禁服务
pub struct ChatService {
    repos: Repositories,
    fanout: FanoutPublisher,
}

impl ChatService {
    pub fn new(repos: Repositories, fanout: FanoutPublisher) -> Self {
        Self { repos, fanout }
    }

    /// 访问谓词：调用方须为作者或被指派者，且帖子已指派帮助者
    ///
    /// 通过后返回帖子，供会话订阅等外部入口复用。
    pub async fn authorize(&self, user_id: Uuid, post_id: Uuid) -> Result<Post> {
        let post = self
            .repos
            .posts
            .get(post_id)
            .await?
            .ok_or(CoordinationError::PostNotFound(post_id))?;

        if !post.is_participant(user_id) {
            return Err(CoordinationError::Permission(
                "只有作者和被指派的帮助者可以访问会话".to_string(),
            ));
        }
        if post.assigned_to.is_none() {
            return Err(CoordinationError::Precondition(
                "帖子尚未指派帮助者，会话不存在".to_string(),
            ));
        }
        Ok(post)
    }

    async fn get_or_create(&self, post: &Post) -> Result<Chat> {
        let participants: Vec<Uuid> = std::iter::once(post.author_id)
            .chain(post.assigned_to)
            .collect();
        self.repos.chats.get_or_create(post.id, &participants).await
    }

    /// 获取或创建帖子的会话
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn open(&self, caller: &CallerContext, post_id: Uuid) -> Result<ChatView> {
        let post = self.authorize(caller.user_id, post_id).await?;
        let chat = self.get_or_create(&post).await?;

        let ids: Vec<Uuid> = chat
            .participants
            .iter()
            .copied()
            .chain(chat.messages.iter().map(|m| m.sender_id))
            .collect();
        let users = UserDirectory::load(self.repos.users.as_ref(), ids).await?;
        Ok(ChatView::build(chat, &users))
    }

    /// 发送消息，并推送 new-message 到该帖子的会话主题
    #[instrument(skip(self, caller, content), fields(user_id = %caller.user_id))]
    pub async fn send_message(
        &self,
        caller: &CallerContext,
        post_id: Uuid,
        content: String,
    ) -> Result<MessageView> {
        // 先鉴权，非参与者不应看到内容校验结果
        let post = self.authorize(caller.user_id, post_id).await?;

        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(CoordinationError::Validation("消息内容不能为空".to_string()));
        }
        if content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(CoordinationError::Validation(format!(
                "消息内容不能超过 {MAX_MESSAGE_CHARS} 个字符"
            )));
        }

        let chat = self.get_or_create(&post).await?;

        let message = ChatMessage::new(caller.user_id, content, Utc::now());
        self.repos.chats.append_message(post_id, &message).await?;
        info!(post_id = %post_id, chat_id = %chat.id, message_id = %message.id, "会话消息已发送");
        metrics::record_chat_message();

        let users = UserDirectory::load(self.repos.users.as_ref(), [caller.user_id]).await?;
        let view = MessageView::build(message, &users);

        let event = NewMessageEvent {
            post_id,
            chat_id: chat.id,
            message: view.clone(),
        };
        self.fanout
            .publish(Topic::chat(post_id), EventKind::NewMessage, &event)
            .await;

        Ok(view)
    }

    /// 将对方发送的消息全部标记为已读
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn mark_read(&self, caller: &CallerContext, post_id: Uuid) -> Result<MarkReadResult> {
        let post = self.authorize(caller.user_id, post_id).await?;
        self.get_or_create(&post).await?;
        let marked = self.repos.chats.mark_read(post_id, caller.user_id).await?;
        Ok(MarkReadResult { marked })
    }
}
