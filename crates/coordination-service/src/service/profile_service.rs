//! 用户资料查询服务（只读）

use tracing::instrument;
use uuid::Uuid;

use aid_shared::config::LifecycleConfig;

use crate::error::{CoordinationError, Result};
use crate::models::UserProfile;
use crate::repository::Repositories;
use crate::service::dto::{RatingView, UserDirectory};

/// 用户资料查询服务
pub struct ProfileService {
    repos: Repositories,
    lifecycle: LifecycleConfig,
}

impl ProfileService {
    pub fn new(repos: Repositories, lifecycle: LifecycleConfig) -> Self {
        Self { repos, lifecycle }
    }

    /// 公开资料，不含凭据
    pub async fn profile(&self, user_id: Uuid) -> Result<UserProfile> {
        self.repos
            .users
            .get(user_id)
            .await?
            .map(|u| UserProfile::from(&u))
            .ok_or(CoordinationError::UserNotFound(user_id))
    }

    /// 街区排行榜：已认证用户按 karma 降序
    #[instrument(skip(self))]
    pub async fn leaderboard(&self, neighborhood: &str, limit: Option<i64>) -> Result<Vec<UserProfile>> {
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(self.lifecycle.leaderboard_limit);
        let users = self.repos.users.leaderboard(neighborhood, limit).await?;
        Ok(users.iter().map(UserProfile::from).collect())
    }

    /// 用户收到的评分，最新优先
    #[instrument(skip(self))]
    pub async fn ratings_received(&self, user_id: Uuid) -> Result<Vec<RatingView>> {
        let ratings = self
            .repos
            .ratings
            .list_for_user(user_id, self.lifecycle.ratings_limit)
            .await?;
        let users =
            UserDirectory::load(self.repos.users.as_ref(), ratings.iter().map(|r| r.rated_by))
                .await?;
        Ok(ratings
            .into_iter()
            .map(|r| RatingView::build(r, &users))
            .collect())
    }
}
