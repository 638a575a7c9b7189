//! 会话模型
//!
//! 每个帖子至多一个会话，参与者在创建时固定为作者和被指派的帮助者。

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// 新消息，默认未读
    pub fn new(sender_id: Uuid, content: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            sender_id,
            content: content.into(),
            read: false,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Chat {
    pub id: Uuid,
    pub post_id: Uuid,
    pub participants: Vec<Uuid>,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    pub fn new(post_id: Uuid, participants: Vec<Uuid>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id,
            participants,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 将所有非 reader 发送的消息标记为已读，返回本次翻转的条数
    pub fn mark_read_for(&mut self, reader: Uuid) -> u64 {
        let mut flipped = 0;
        for message in self
            .messages
            .iter_mut()
            .filter(|m| m.sender_id != reader && !m.read)
        {
            message.read = true;
            flipped += 1;
        }
        flipped
    }

    pub fn unread_count_for(&self, reader: Uuid) -> usize {
        self.messages
            .iter()
            .filter(|m| m.sender_id != reader && !m.read)
            .count()
    }
}
