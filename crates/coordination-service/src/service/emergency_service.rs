//! 紧急求助生命周期服务
//!
//! 状态机：`active → resolved`，`active → expired`。
//!
//! 过期没有后台扫描：`respond` 发现已超过截止时间时把状态落盘为 expired 并返回
//! `Expired`；其余读取方通过有效状态（重新比对 `expires_at`）排除过期记录。
//! 所有状态变化都会推送到求助所在街区的主题，推送失败不影响主流程。

use chrono::{Duration, Utc};
use tracing::{error, info, instrument};
use uuid::Uuid;

use aid_shared::config::LifecycleConfig;
use aid_shared::events::{EventKind, Topic};
use aid_shared::fanout::FanoutPublisher;
use aid_shared::observability::metrics;

use crate::error::{CoordinationError, Result};
use crate::models::{CallerContext, Emergency, EmergencyStatus, GeoPoint, NewEmergency, Responder};
use crate::reputation::ReputationEvent;
use crate::repository::Repositories;
use crate::service::dto::{
    CreateEmergencyInput, EmergencyResolvedEvent, EmergencyResponseEvent, EmergencyView,
    UserDirectory, emergency_user_ids,
};

/// 紧急求助生命周期服务
pub struct EmergencyService {
    repos: Repositories,
    fanout: FanoutPublisher,
    lifecycle: LifecycleConfig,
}

impl EmergencyService {
    pub fn new(repos: Repositories, fanout: FanoutPublisher, lifecycle: LifecycleConfig) -> Self {
        Self {
            repos,
            fanout,
            lifecycle,
        }
    }

    async fn load(&self, id: Uuid) -> Result<Emergency> {
        self.repos
            .emergencies
            .get(id)
            .await?
            .ok_or(CoordinationError::EmergencyNotFound(id))
    }

    async fn project(&self, emergency: Emergency) -> Result<EmergencyView> {
        let users =
            UserDirectory::load(self.repos.users.as_ref(), emergency_user_ids(&emergency)).await?;
        Ok(EmergencyView::build(emergency, &users, Utc::now()))
    }

    async fn project_all(&self, emergencies: Vec<Emergency>) -> Result<Vec<EmergencyView>> {
        let users = UserDirectory::load(
            self.repos.users.as_ref(),
            emergencies
                .iter()
                .flat_map(|e| emergency_user_ids(e))
                .collect::<Vec<_>>(),
        )
        .await?;
        let now = Utc::now();
        Ok(emergencies
            .into_iter()
            .map(|e| EmergencyView::build(e, &users, now))
            .collect())
    }

    // ==================== 命令 ====================

    /// 发起紧急求助，并推送 new-emergency 到街区
    #[instrument(skip(self, caller, input), fields(user_id = %caller.user_id))]
    pub async fn create(
        &self,
        caller: &CallerContext,
        input: CreateEmergencyInput,
    ) -> Result<EmergencyView> {
        let location = GeoPoint::from_coordinates(&input.coordinates)?;

        let emergency = Emergency::new(
            NewEmergency {
                user_id: caller.user_id,
                neighborhood: caller.neighborhood.clone(),
                emergency_type: input.emergency_type,
                message: input.message,
                location,
            },
            Duration::minutes(self.lifecycle.emergency_ttl_minutes),
            Utc::now(),
        );
        self.repos.emergencies.create(&emergency).await?;

        info!(
            emergency_id = %emergency.id,
            neighborhood = %emergency.neighborhood,
            emergency_type = ?emergency.emergency_type,
            expires_at = %emergency.expires_at,
            "紧急求助已发起"
        );
        metrics::record_emergency_transition("active");

        let topic = Topic::neighborhood(&emergency.neighborhood);
        let view = self.project(emergency).await?;
        self.fanout
            .publish(topic, EventKind::NewEmergency, &view)
            .await;

        Ok(view)
    }

    /// 响应紧急求助
    ///
    /// 检查顺序：持久化状态 → 截止时间（过期则落盘 expired）→ 创建者本人 → 重复响应。
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn respond(&self, caller: &CallerContext, emergency_id: Uuid) -> Result<EmergencyView> {
        let emergency = self.load(emergency_id).await?;
        if emergency.status != EmergencyStatus::Active {
            return Err(CoordinationError::InvalidState(format!(
                "紧急求助状态为 {}，无法响应",
                emergency.status
            )));
        }

        let now = Utc::now();
        if emergency.is_past_deadline(now) {
            if self.repos.emergencies.mark_expired(emergency_id, now).await? {
                info!(emergency_id = %emergency_id, "紧急求助已过期，状态已落盘");
                metrics::record_emergency_transition("expired");
            }
            return Err(CoordinationError::Expired(format!(
                "紧急求助已于 {} 过期",
                emergency.expires_at
            )));
        }

        if emergency.user_id == caller.user_id {
            return Err(CoordinationError::Permission(
                "不能响应自己发起的紧急求助".to_string(),
            ));
        }
        if emergency.has_responder(caller.user_id) {
            return Err(CoordinationError::Duplicate(
                "已响应过该紧急求助".to_string(),
            ));
        }

        let responder = Responder {
            user_id: caller.user_id,
            responded_at: now,
        };
        if !self
            .repos
            .emergencies
            .add_responder(emergency_id, &responder)
            .await?
        {
            let current = self.load(emergency_id).await?;
            return Err(CoordinationError::InvalidState(format!(
                "紧急求助状态为 {}，无法响应",
                current.status
            )));
        }
        info!(emergency_id = %emergency_id, "紧急求助收到响应");

        match self
            .repos
            .users
            .apply_reputation(caller.user_id, ReputationEvent::EmergencyHelp)
            .await
        {
            Ok(user) => {
                info!(user_id = %user.id, karma = user.karma, "紧急响应声望已更新");
                metrics::record_reputation_award(ReputationEvent::EmergencyHelp.kind());
            }
            Err(e) => {
                error!(
                    emergency_id = %emergency_id,
                    user_id = %caller.user_id,
                    error = %e,
                    "响应已落盘，但声望更新失败"
                );
                return Err(e);
            }
        }

        let emergency = self.load(emergency_id).await?;
        let users =
            UserDirectory::load(self.repos.users.as_ref(), emergency_user_ids(&emergency)).await?;
        let event = EmergencyResponseEvent {
            emergency_id,
            responder: users.summary(caller.user_id),
            responders_count: emergency.responders.len(),
        };
        let view = EmergencyView::build(emergency, &users, Utc::now());
        self.fanout
            .publish(
                Topic::neighborhood(&view.neighborhood),
                EventKind::EmergencyResponse,
                &event,
            )
            .await;

        Ok(view)
    }

    /// 创建者关闭紧急求助：active → resolved
    ///
    /// 以持久化状态为准，已过截止时间但尚未落盘 expired 的求助仍可关闭。
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn resolve(&self, caller: &CallerContext, emergency_id: Uuid) -> Result<EmergencyView> {
        let emergency = self.load(emergency_id).await?;
        if emergency.user_id != caller.user_id {
            return Err(CoordinationError::Permission(
                "只有发起人可以关闭紧急求助".to_string(),
            ));
        }

        if !self.repos.emergencies.resolve(emergency_id, Utc::now()).await? {
            let current = self.load(emergency_id).await?;
            return Err(CoordinationError::InvalidState(format!(
                "紧急求助状态为 {}，无法关闭",
                current.status
            )));
        }
        info!(emergency_id = %emergency_id, "紧急求助已关闭");
        metrics::record_emergency_transition("resolved");

        let view = self.project(self.load(emergency_id).await?).await?;
        let event = EmergencyResolvedEvent {
            emergency_id,
            resolved_at: view.resolved_at,
        };
        self.fanout
            .publish(
                Topic::neighborhood(&view.neighborhood),
                EventKind::EmergencyResolved,
                &event,
            )
            .await;

        Ok(view)
    }

    // ==================== 查询 ====================

    pub async fn get(&self, emergency_id: Uuid) -> Result<EmergencyView> {
        self.project(self.load(emergency_id).await?).await
    }

    /// 街区内有效的紧急求助
    #[instrument(skip(self))]
    pub async fn list_active(&self, neighborhood: &str) -> Result<Vec<EmergencyView>> {
        let emergencies = self
            .repos
            .emergencies
            .list_active(neighborhood, Utc::now())
            .await?;
        self.project_all(emergencies).await
    }

    /// 附近有效的紧急求助，按距离升序
    #[instrument(skip(self))]
    pub async fn list_nearby(
        &self,
        coordinates: &[f64],
        radius_m: Option<f64>,
    ) -> Result<Vec<EmergencyView>> {
        let point = GeoPoint::from_coordinates(coordinates)?;
        let radius = radius_m.unwrap_or(self.lifecycle.nearby_emergency_radius_m);
        if !(radius.is_finite() && radius > 0.0) {
            return Err(CoordinationError::Validation(
                "查询半径必须为正数".to_string(),
            ));
        }

        let emergencies = self
            .repos
            .emergencies
            .list_nearby_active(point, radius, Utc::now(), self.lifecycle.nearby_emergency_limit)
            .await?;
        self.project_all(emergencies).await
    }
}
