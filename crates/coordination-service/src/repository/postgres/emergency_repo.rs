//! 紧急求助仓储（Postgres）
//!
//! 响应者存于子表 `emergency_responders`，`UNIQUE (emergency_id, user_id)` 保证每人至多响应一次。
//! "有效" 查询同时比对 `status` 和 `expires_at`，与 `Emergency::effective_status` 保持一致。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Emergency, EmergencyStatus, EmergencyType, GeoPoint, Responder};
use crate::repository::traits::EmergencyRepositoryTrait;

#[derive(sqlx::FromRow)]
struct EmergencyRow {
    id: Uuid,
    user_id: Uuid,
    emergency_type: EmergencyType,
    message: String,
    longitude: f64,
    latitude: f64,
    neighborhood: String,
    status: EmergencyStatus,
    expires_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EmergencyRow {
    fn into_emergency(self, responders: Vec<Responder>) -> Emergency {
        Emergency {
            id: self.id,
            user_id: self.user_id,
            emergency_type: self.emergency_type,
            message: self.message,
            location: GeoPoint {
                lng: self.longitude,
                lat: self.latitude,
            },
            neighborhood: self.neighborhood,
            status: self.status,
            responders,
            expires_at: self.expires_at,
            resolved_at: self.resolved_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ResponderRow {
    emergency_id: Uuid,
    user_id: Uuid,
    responded_at: DateTime<Utc>,
}

/// 紧急求助仓储
pub struct EmergencyRepository {
    pool: PgPool,
}

impl EmergencyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn hydrate(&self, rows: Vec<EmergencyRow>) -> Result<Vec<Emergency>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let responders = sqlx::query_as::<_, ResponderRow>(
            r#"
            SELECT emergency_id, user_id, responded_at
            FROM emergency_responders
            WHERE emergency_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<Responder>> = HashMap::new();
        for r in responders {
            grouped.entry(r.emergency_id).or_default().push(Responder {
                user_id: r.user_id,
                responded_at: r.responded_at,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let responders = grouped.remove(&row.id).unwrap_or_default();
                row.into_emergency(responders)
            })
            .collect())
    }
}

#[async_trait]
impl EmergencyRepositoryTrait for EmergencyRepository {
    async fn create(&self, emergency: &Emergency) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO emergencies (id, user_id, emergency_type, message, longitude, latitude,
                                     neighborhood, status, expires_at, resolved_at,
                                     created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(emergency.id)
        .bind(emergency.user_id)
        .bind(emergency.emergency_type)
        .bind(&emergency.message)
        .bind(emergency.location.lng)
        .bind(emergency.location.lat)
        .bind(&emergency.neighborhood)
        .bind(emergency.status)
        .bind(emergency.expires_at)
        .bind(emergency.resolved_at)
        .bind(emergency.created_at)
        .bind(emergency.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Emergency>> {
        let row = sqlx::query_as::<_, EmergencyRow>(
            r#"
            SELECT id, user_id, emergency_type, message, longitude, latitude, neighborhood,
                   status, expires_at, resolved_at, created_at, updated_at
            FROM emergencies
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

    async fn list_active(&self, neighborhood: &str, now: DateTime<Utc>) -> Result<Vec<Emergency>> {
        let rows = sqlx::query_as::<_, EmergencyRow>(
            r#"
            SELECT id, user_id, emergency_type, message, longitude, latitude, neighborhood,
                   status, expires_at, resolved_at, created_at, updated_at
            FROM emergencies
            WHERE neighborhood = $1 AND status = 'active' AND expires_at >= $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(neighborhood)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn list_nearby_active(
        &self,
        point: GeoPoint,
        radius_m: f64,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Emergency>> {
        let rows = sqlx::query_as::<_, EmergencyRow>(
            r#"
            SELECT * FROM (
                SELECT id, user_id, emergency_type, message, longitude, latitude, neighborhood,
                       status, expires_at, resolved_at, created_at, updated_at,
                       6371000 * 2 * ASIN(LEAST(1.0, SQRT(
                           POWER(SIN(RADIANS(latitude - $2) / 2), 2)
                           + COS(RADIANS($2)) * COS(RADIANS(latitude))
                             * POWER(SIN(RADIANS(longitude - $1) / 2), 2)
                       ))) AS distance_m
                FROM emergencies
                WHERE status = 'active' AND expires_at >= $3
            ) AS candidates
            WHERE distance_m <= $4
            ORDER BY distance_m
            LIMIT $5
            "#,
        )
        .bind(point.lng)
        .bind(point.lat)
        .bind(now)
        .bind(radius_m)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn add_responder(&self, emergency_id: Uuid, responder: &Responder) -> Result<bool> {
        // 唯一约束冲突由 From<sqlx::Error> 映射为 Duplicate
        let result = sqlx::query(
            r#"
            WITH target AS (
                UPDATE emergencies SET updated_at = $3
                WHERE id = $1 AND status = 'active' AND user_id <> $2
                RETURNING id
            )
            INSERT INTO emergency_responders (emergency_id, user_id, responded_at)
            SELECT id, $2, $3 FROM target
            "#,
        )
        .bind(emergency_id)
        .bind(responder.user_id)
        .bind(responder.responded_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_expired(&self, emergency_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE emergencies
            SET status = 'expired', updated_at = $2
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(emergency_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn resolve(&self, emergency_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE emergencies
            SET status = 'resolved', resolved_at = $2, updated_at = $2
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(emergency_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
