//! 评分仓储（Postgres）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Rating, RatingSummary};
use crate::repository::traits::RatingRepositoryTrait;

#[derive(sqlx::FromRow)]
struct RatingRow {
    id: Uuid,
    post_id: Uuid,
    rated_by: Uuid,
    rated_user: Uuid,
    rating: i32,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<RatingRow> for Rating {
    fn from(row: RatingRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            rated_by: row.rated_by,
            rated_user: row.rated_user,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

/// 评分仓储
pub struct RatingRepository {
    pool: PgPool,
}

impl RatingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RatingRepositoryTrait for RatingRepository {
    async fn create(&self, rating: &Rating) -> Result<()> {
        // (post_id, rated_by) 唯一约束冲突映射为 Duplicate
        sqlx::query(
            r#"
            INSERT INTO ratings (id, post_id, rated_by, rated_user, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(rating.id)
        .bind(rating.post_id)
        .bind(rating.rated_by)
        .bind(rating.rated_user)
        .bind(rating.rating)
        .bind(&rating.comment)
        .bind(rating.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, post_id: Uuid, rated_by: Uuid) -> Result<Option<Rating>> {
        let row = sqlx::query_as::<_, RatingRow>(
            r#"
            SELECT id, post_id, rated_by, rated_user, rating, comment, created_at
            FROM ratings
            WHERE post_id = $1 AND rated_by = $2
            "#,
        )
        .bind(post_id)
        .bind(rated_by)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Rating::from))
    }

    async fn list_for_user(&self, rated_user: Uuid, limit: i64) -> Result<Vec<Rating>> {
        let rows = sqlx::query_as::<_, RatingRow>(
            r#"
            SELECT id, post_id, rated_by, rated_user, rating, comment, created_at
            FROM ratings
            WHERE rated_user = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(rated_user)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Rating::from).collect())
    }

    async fn summarize(&self, rated_user: Uuid) -> Result<RatingSummary> {
        let (average, count): (f64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(AVG(rating)::float8, 0), COUNT(*)
            FROM ratings
            WHERE rated_user = $1
            "#,
        )
        .bind(rated_user)
        .fetch_one(&self.pool)
        .await?;

        Ok(RatingSummary {
            average,
            count: count as i32,
        })
    }
}
