//! 帖子生命周期服务
//!
//! 维护求助/提供帮助帖子的状态机：
//!
//! ```text
//! active ──assign──▶ in-progress ──complete──▶ completed
//!    └──────────────▶ cancelled（当前无操作驱动）
//! ```
//!
//! ## 跨实体窗口
//!
//! `complete` 与 `rate` 先落盘帖子/评分，再更新帮助者的声望。第二步失败时
//! 第一步不回滚：记录 error 日志后把错误返回给调用方，不做自动重试。

use chrono::{Duration, Utc};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use aid_shared::config::LifecycleConfig;
use aid_shared::observability::metrics;

use crate::error::{CoordinationError, Result};
use crate::models::{
    CallerContext, GeoPoint, NewPost, Post, PostFilter, PostResponse, PostStatus, Rating,
};
use crate::reputation::ReputationEvent;
use crate::repository::Repositories;
use crate::service::dto::{
    CreatePostInput, PostView, RatingView, UserDirectory, post_user_ids,
};

/// 帖子生命周期服务
pub struct PostService {
    repos: Repositories,
    lifecycle: LifecycleConfig,
}

impl PostService {
    pub fn new(repos: Repositories, lifecycle: LifecycleConfig) -> Self {
        Self { repos, lifecycle }
    }

    async fn load(&self, post_id: Uuid) -> Result<Post> {
        self.repos
            .posts
            .get(post_id)
            .await?
            .ok_or(CoordinationError::PostNotFound(post_id))
    }

    async fn project(&self, post: Post) -> Result<PostView> {
        let users = UserDirectory::load(self.repos.users.as_ref(), post_user_ids(&post)).await?;
        Ok(PostView::build(post, &users))
    }

    async fn project_all(&self, posts: Vec<Post>) -> Result<Vec<PostView>> {
        let users = UserDirectory::load(
            self.repos.users.as_ref(),
            posts.iter().flat_map(|p| post_user_ids(p)).collect::<Vec<_>>(),
        )
        .await?;
        Ok(posts
            .into_iter()
            .map(|p| PostView::build(p, &users))
            .collect())
    }

    // ==================== 命令 ====================

    /// 创建帖子，街区取自作者
    #[instrument(skip(self, caller, input), fields(user_id = %caller.user_id))]
    pub async fn create(&self, caller: &CallerContext, input: CreatePostInput) -> Result<PostView> {
        let location = GeoPoint::from_coordinates(&input.coordinates)?;
        if input.title.trim().is_empty() {
            return Err(CoordinationError::Validation("标题不能为空".to_string()));
        }

        let post = Post::new(
            NewPost {
                author_id: caller.user_id,
                neighborhood: caller.neighborhood.clone(),
                post_type: input.post_type,
                category: input.category,
                title: input.title,
                description: input.description,
                urgency: input.urgency.unwrap_or_default(),
                location,
                images: input.images,
            },
            Duration::days(self.lifecycle.post_ttl_days),
            Utc::now(),
        );
        self.repos.posts.create(&post).await?;

        info!(
            post_id = %post.id,
            neighborhood = %post.neighborhood,
            post_type = ?post.post_type,
            "帖子已创建"
        );
        metrics::record_post_transition("active");

        self.project(post).await
    }

    /// 响应帖子（仅 active 状态）
    ///
    /// 作者可以响应自己的帖子。
    #[instrument(skip(self, caller, message), fields(user_id = %caller.user_id))]
    pub async fn respond(
        &self,
        caller: &CallerContext,
        post_id: Uuid,
        message: String,
    ) -> Result<PostView> {
        let post = self.load(post_id).await?;
        if post.status != PostStatus::Active {
            return Err(CoordinationError::InvalidState(format!(
                "帖子状态为 {}，不再接受响应",
                post.status
            )));
        }

        let response = PostResponse {
            user_id: caller.user_id,
            message,
            created_at: Utc::now(),
        };
        if !self.repos.posts.append_response(post_id, &response).await? {
            return Err(CoordinationError::InvalidState(
                "帖子已不在 active 状态".to_string(),
            ));
        }

        info!(post_id = %post_id, "帖子收到新响应");
        self.project(self.load(post_id).await?).await
    }

    /// 作者指派帮助者：active → in-progress
    ///
    /// 不校验帮助者是否在响应列表中。
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn assign(
        &self,
        caller: &CallerContext,
        post_id: Uuid,
        helper_id: Uuid,
    ) -> Result<PostView> {
        let post = self.load(post_id).await?;
        if !post.is_author(caller.user_id) {
            return Err(CoordinationError::Permission(
                "只有作者可以指派帮助者".to_string(),
            ));
        }
        if self.repos.users.get(helper_id).await?.is_none() {
            return Err(CoordinationError::UserNotFound(helper_id));
        }

        if !self.repos.posts.assign(post_id, helper_id, Utc::now()).await? {
            let current = self.load(post_id).await?;
            return Err(CoordinationError::InvalidState(format!(
                "帖子状态为 {}，无法指派",
                current.status
            )));
        }

        info!(post_id = %post_id, helper_id = %helper_id, "帖子已指派帮助者");
        metrics::record_post_transition("in-progress");

        self.project(self.load(post_id).await?).await
    }

    /// 完成帖子：in-progress → completed，并为帮助者记一次帮助
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn complete(&self, caller: &CallerContext, post_id: Uuid) -> Result<PostView> {
        let post = self.load(post_id).await?;
        if !post.is_participant(caller.user_id) {
            return Err(CoordinationError::Permission(
                "只有作者或被指派的帮助者可以完成帖子".to_string(),
            ));
        }
        let helper_id = post.assigned_to.ok_or_else(|| {
            CoordinationError::InvalidState(format!("帖子状态为 {}，尚未指派帮助者", post.status))
        })?;

        if !self.repos.posts.complete(post_id, Utc::now()).await? {
            let current = self.load(post_id).await?;
            return Err(CoordinationError::InvalidState(format!(
                "帖子状态为 {}，无法完成",
                current.status
            )));
        }
        info!(post_id = %post_id, helper_id = %helper_id, "帖子已完成");
        metrics::record_post_transition("completed");

        self.award(helper_id, ReputationEvent::Help, post_id).await?;

        self.project(self.load(post_id).await?).await
    }

    /// 作者为帮助者评分（仅 completed 状态，每帖每人一次）
    #[instrument(skip(self, caller, comment), fields(user_id = %caller.user_id))]
    pub async fn rate(
        &self,
        caller: &CallerContext,
        post_id: Uuid,
        rating: i32,
        comment: Option<String>,
    ) -> Result<RatingView> {
        let post = self.load(post_id).await?;
        if post.status != PostStatus::Completed {
            return Err(CoordinationError::InvalidState(format!(
                "帖子状态为 {}，只能对已完成的帖子评分",
                post.status
            )));
        }
        if !post.is_author(caller.user_id) {
            return Err(CoordinationError::Permission(
                "只有作者可以评分".to_string(),
            ));
        }
        if self
            .repos
            .ratings
            .find(post_id, caller.user_id)
            .await?
            .is_some()
        {
            return Err(CoordinationError::Duplicate(
                "已对该帖子评过分".to_string(),
            ));
        }
        let rated_user = post.assigned_to.ok_or_else(|| {
            CoordinationError::Precondition("帖子没有被指派的帮助者".to_string())
        })?;

        let record = Rating::new(post_id, caller.user_id, rated_user, rating, comment)?;
        self.repos.ratings.create(&record).await?;
        info!(post_id = %post_id, rated_user = %rated_user, rating, "评分已创建");

        if let Err(e) = self.refresh_rating_summary(rated_user).await {
            error!(
                post_id = %post_id,
                rated_user = %rated_user,
                error = %e,
                "评分已落盘，但帮助者评分汇总更新失败"
            );
            return Err(e);
        }
        self.award(rated_user, ReputationEvent::RatingBonus(rating), post_id)
            .await?;

        let users = UserDirectory::load(self.repos.users.as_ref(), [caller.user_id]).await?;
        Ok(RatingView::build(record, &users))
    }

    async fn refresh_rating_summary(&self, user_id: Uuid) -> Result<()> {
        let summary = self.repos.ratings.summarize(user_id).await?;
        self.repos.users.set_rating_summary(user_id, summary).await
    }

    /// 跨实体第二步：失败时记录日志并返回错误
    async fn award(&self, user_id: Uuid, event: ReputationEvent, post_id: Uuid) -> Result<()> {
        match self.repos.users.apply_reputation(user_id, event).await {
            Ok(user) => {
                info!(
                    user_id = %user_id,
                    kind = event.kind(),
                    karma = user.karma,
                    helped_count = user.helped_count,
                    "声望已更新"
                );
                metrics::record_reputation_award(event.kind());
                Ok(())
            }
            Err(e) => {
                error!(
                    post_id = %post_id,
                    user_id = %user_id,
                    kind = event.kind(),
                    error = %e,
                    "帖子已落盘，但声望更新失败"
                );
                Err(e)
            }
        }
    }

    // ==================== 查询 ====================

    pub async fn get(&self, post_id: Uuid) -> Result<PostView> {
        self.project(self.load(post_id).await?).await
    }

    /// 街区帖子，默认只含 active / in-progress
    #[instrument(skip(self))]
    pub async fn list_neighborhood(&self, filter: PostFilter) -> Result<Vec<PostView>> {
        let posts = self
            .repos
            .posts
            .list_by_filter(&filter, self.lifecycle.neighborhood_post_limit)
            .await?;
        self.project_all(posts).await
    }

    /// 附近的 active / in-progress 帖子，按距离升序
    #[instrument(skip(self))]
    pub async fn list_nearby(
        &self,
        coordinates: &[f64],
        radius_m: Option<f64>,
    ) -> Result<Vec<PostView>> {
        let point = GeoPoint::from_coordinates(coordinates)?;
        let radius = radius_m.unwrap_or(self.lifecycle.nearby_post_radius_m);
        if !(radius.is_finite() && radius > 0.0) {
            warn!(radius, "非法的查询半径");
            return Err(CoordinationError::Validation(
                "查询半径必须为正数".to_string(),
            ));
        }

        let posts = self
            .repos
            .posts
            .list_nearby(point, radius, &PostStatus::OPEN, self.lifecycle.nearby_post_limit)
            .await?;
        self.project_all(posts).await
    }

    pub async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<PostView>> {
        let posts = self.repos.posts.list_by_author(author_id).await?;
        self.project_all(posts).await
    }
}
