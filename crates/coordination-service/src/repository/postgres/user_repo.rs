//! 用户仓储（Postgres）
//!
//! 声望更新使用 `SELECT ... FOR UPDATE` 行锁，在事务内完成读改写

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::error::{CoordinationError, Result};
use crate::models::{Badge, RatingSummary, User};
use crate::repository::traits::UserRepositoryTrait;
use crate::reputation::ReputationEvent;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    avatar: Option<String>,
    neighborhood: String,
    verified: bool,
    karma: i64,
    badges: Vec<String>,
    helped_count: i32,
    rating_average: f64,
    rating_count: i32,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let badges: BTreeSet<Badge> = row
            .badges
            .iter()
            .filter_map(|raw| match raw.parse::<Badge>() {
                Ok(badge) => Some(badge),
                Err(e) => {
                    warn!(user_id = %row.id, error = %e, "忽略无法识别的徽章");
                    None
                }
            })
            .collect();

        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            avatar: row.avatar,
            neighborhood: row.neighborhood,
            verified: row.verified,
            karma: row.karma,
            badges,
            helped_count: row.helped_count,
            ratings: RatingSummary {
                average: row.rating_average,
                count: row.rating_count,
            },
            created_at: row.created_at,
        }
    }
}

fn badge_names(user: &User) -> Vec<String> {
    user.badges.iter().map(|b| b.as_str().to_string()).collect()
}

/// 用户仓储
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn create(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, avatar, neighborhood, verified,
                               karma, badges, helped_count, rating_average, rating_count,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .bind(&user.neighborhood)
        .bind(user.verified)
        .bind(user.karma)
        .bind(badge_names(user))
        .bind(user.helped_count)
        .bind(user.ratings.average)
        .bind(user.ratings.count)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, avatar, neighborhood, verified, karma,
                   badges, helped_count, rating_average, rating_count, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, avatar, neighborhood, verified, karma,
                   badges, helped_count, rating_average, rating_count, created_at
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn apply_reputation(&self, id: Uuid, event: ReputationEvent) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, avatar, neighborhood, verified, karma,
                   badges, helped_count, rating_average, rating_count, created_at
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CoordinationError::UserNotFound(id))?;

        let mut user = User::from(row);
        event.apply(&mut user);

        sqlx::query(
            r#"
            UPDATE users
            SET karma = $2, helped_count = $3, badges = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(user.karma)
        .bind(user.helped_count)
        .bind(badge_names(&user))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn set_rating_summary(&self, id: Uuid, summary: RatingSummary) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET rating_average = $2, rating_count = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(summary.average)
        .bind(summary.count)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoordinationError::UserNotFound(id));
        }
        Ok(())
    }

    async fn leaderboard(&self, neighborhood: &str, limit: i64) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, avatar, neighborhood, verified, karma,
                   badges, helped_count, rating_average, rating_count, created_at
            FROM users
            WHERE neighborhood = $1 AND verified
            ORDER BY karma DESC, name ASC
            LIMIT $2
            "#,
        )
        .bind(neighborhood)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }
}
