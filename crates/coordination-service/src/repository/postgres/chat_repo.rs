//! 会话仓储（Postgres）
//!
//! `chats.post_id` 唯一约束保证一帖一会话；`get_or_create` 为 insert-on-conflict 后再读取，
//! 并发调用得到同一条记录。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Chat, ChatMessage};
use crate::repository::traits::ChatRepositoryTrait;

#[derive(sqlx::FromRow)]
struct ChatRow {
    id: Uuid,
    post_id: Uuid,
    participants: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    sender_id: Uuid,
    content: String,
    read: bool,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            sender_id: row.sender_id,
            content: row.content,
            read: row.read,
            created_at: row.created_at,
        }
    }
}

/// 会话仓储
pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_messages(&self, chat_id: Uuid) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, sender_id, content, read, created_at
            FROM chat_messages
            WHERE chat_id = $1
            ORDER BY seq
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }

    async fn hydrate(&self, row: ChatRow) -> Result<Chat> {
        let messages = self.load_messages(row.id).await?;
        Ok(Chat {
            id: row.id,
            post_id: row.post_id,
            participants: row.participants,
            messages,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl ChatRepositoryTrait for ChatRepository {
    async fn get_or_create(&self, post_id: Uuid, participants: &[Uuid]) -> Result<Chat> {
        sqlx::query(
            r#"
            INSERT INTO chats (id, post_id, participants, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            ON CONFLICT (post_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(participants)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, ChatRow>(
            r#"
            SELECT id, post_id, participants, created_at, updated_at
            FROM chats
            WHERE post_id = $1
            "#,
        )
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;

        self.hydrate(row).await
    }

    async fn get_by_post(&self, post_id: Uuid) -> Result<Option<Chat>> {
        let row = sqlx::query_as::<_, ChatRow>(
            r#"
            SELECT id, post_id, participants, created_at, updated_at
            FROM chats
            WHERE post_id = $1
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn append_message(&self, post_id: Uuid, message: &ChatMessage) -> Result<()> {
        sqlx::query(
            r#"
            WITH touched AS (
                UPDATE chats SET updated_at = $6 WHERE post_id = $2 RETURNING id
            )
            INSERT INTO chat_messages (id, chat_id, sender_id, content, read, created_at)
            SELECT $1, id, $3, $4, $5, $6 FROM touched
            "#,
        )
        .bind(message.id)
        .bind(post_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(message.read)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_read(&self, post_id: Uuid, reader: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE chat_messages
            SET read = TRUE
            WHERE chat_id = (SELECT id FROM chats WHERE post_id = $1)
              AND sender_id <> $2 AND NOT read
            "#,
        )
        .bind(post_id)
        .bind(reader)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
