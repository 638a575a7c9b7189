//! 帖子仓储（Postgres）
//!
//! 响应存于子表 `post_responses`，按自增 id 保持追加顺序。
//! 状态迁移均为带前置状态条件的单条 UPDATE；追加响应通过 CTE 先锁定仍为 active 的帖子行再插入。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    GeoPoint, Post, PostCategory, PostFilter, PostResponse, PostStatus, PostType, Urgency,
};
use crate::repository::traits::PostRepositoryTrait;

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    author_id: Uuid,
    post_type: PostType,
    category: PostCategory,
    title: String,
    description: String,
    urgency: Urgency,
    longitude: f64,
    latitude: f64,
    neighborhood: String,
    images: Vec<String>,
    status: PostStatus,
    assigned_to: Option<Uuid>,
    completed_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PostRow {
    fn into_post(self, responses: Vec<PostResponse>) -> Post {
        Post {
            id: self.id,
            author_id: self.author_id,
            post_type: self.post_type,
            category: self.category,
            title: self.title,
            description: self.description,
            urgency: self.urgency,
            location: GeoPoint {
                lng: self.longitude,
                lat: self.latitude,
            },
            neighborhood: self.neighborhood,
            images: self.images,
            status: self.status,
            responses,
            assigned_to: self.assigned_to,
            completed_at: self.completed_at,
            expires_at: self.expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ResponseRow {
    post_id: Uuid,
    user_id: Uuid,
    message: String,
    created_at: DateTime<Utc>,
}

fn status_names(statuses: &[PostStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

/// 帖子仓储
pub struct PostRepository {
    pool: PgPool,
}

impl PostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 批量加载响应并组装帖子，保持 rows 的顺序
    async fn hydrate(&self, rows: Vec<PostRow>) -> Result<Vec<Post>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let responses = sqlx::query_as::<_, ResponseRow>(
            r#"
            SELECT post_id, user_id, message, created_at
            FROM post_responses
            WHERE post_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<PostResponse>> = HashMap::new();
        for r in responses {
            grouped.entry(r.post_id).or_default().push(PostResponse {
                user_id: r.user_id,
                message: r.message,
                created_at: r.created_at,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let responses = grouped.remove(&row.id).unwrap_or_default();
                row.into_post(responses)
            })
            .collect())
    }
}

#[async_trait]
impl PostRepositoryTrait for PostRepository {
    async fn create(&self, post: &Post) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, author_id, post_type, category, title, description, urgency,
                               longitude, latitude, neighborhood, images, status, assigned_to,
                               completed_at, expires_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(post.id)
        .bind(post.author_id)
        .bind(post.post_type)
        .bind(post.category)
        .bind(&post.title)
        .bind(&post.description)
        .bind(post.urgency)
        .bind(post.location.lng)
        .bind(post.location.lat)
        .bind(&post.neighborhood)
        .bind(&post.images)
        .bind(post.status)
        .bind(post.assigned_to)
        .bind(post.completed_at)
        .bind(post.expires_at)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, author_id, post_type, category, title, description, urgency,
                   longitude, latitude, neighborhood, images, status, assigned_to,
                   completed_at, expires_at, created_at, updated_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_by_filter(&self, filter: &PostFilter, limit: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, author_id, post_type, category, title, description, urgency,
                   longitude, latitude, neighborhood, images, status, assigned_to,
                   completed_at, expires_at, created_at, updated_at
            FROM posts
            WHERE neighborhood = $1
              AND status = ANY($2)
              AND ($3::varchar IS NULL OR post_type = $3)
              AND ($4::varchar IS NULL OR category = $4)
            ORDER BY created_at DESC
            LIMIT $5
            "#,
        )
        .bind(&filter.neighborhood)
        .bind(status_names(&filter.effective_statuses()))
        .bind(filter.post_type)
        .bind(filter.category)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn list_nearby(
        &self,
        point: GeoPoint,
        radius_m: f64,
        statuses: &[PostStatus],
        limit: i64,
    ) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT * FROM (
                SELECT id, author_id, post_type, category, title, description, urgency,
                       longitude, latitude, neighborhood, images, status, assigned_to,
                       completed_at, expires_at, created_at, updated_at,
                       6371000 * 2 * ASIN(LEAST(1.0, SQRT(
                           POWER(SIN(RADIANS(latitude - $2) / 2), 2)
                           + COS(RADIANS($2)) * COS(RADIANS(latitude))
                             * POWER(SIN(RADIANS(longitude - $1) / 2), 2)
                       ))) AS distance_m
                FROM posts
                WHERE status = ANY($3)
            ) AS candidates
            WHERE distance_m <= $4
            ORDER BY distance_m
            LIMIT $5
            "#,
        )
        .bind(point.lng)
        .bind(point.lat)
        .bind(status_names(statuses))
        .bind(radius_m)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, author_id, post_type, category, title, description, urgency,
                   longitude, latitude, neighborhood, images, status, assigned_to,
                   completed_at, expires_at, created_at, updated_at
            FROM posts
            WHERE author_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn append_response(&self, post_id: Uuid, response: &PostResponse) -> Result<bool> {
        let result = sqlx::query(
            r#"
            WITH target AS (
                UPDATE posts SET updated_at = $4
                WHERE id = $1 AND status = 'active'
                RETURNING id
            )
            INSERT INTO post_responses (post_id, user_id, message, created_at)
            SELECT id, $2, $3, $4 FROM target
            "#,
        )
        .bind(post_id)
        .bind(response.user_id)
        .bind(&response.message)
        .bind(response.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn assign(&self, post_id: Uuid, helper_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET assigned_to = $2, status = 'in-progress', updated_at = $3
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(post_id)
        .bind(helper_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn complete(&self, post_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET status = 'completed', completed_at = $2, updated_at = $2
            WHERE id = $1 AND status = 'in-progress'
            "#,
        )
        .bind(post_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
