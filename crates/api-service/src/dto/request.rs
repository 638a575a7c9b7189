//! 请求 DTO 定义
//!
//! 所有请求体字段使用 camelCase；坐标统一为 `[经度, 纬度]`。

use serde::Deserialize;
use validator::Validate;

use aid_coordination::dto::{CreateEmergencyInput, CreatePostInput};
use aid_coordination::models::{
    EmergencyType, PostCategory, PostFilter, PostStatus, PostType, Urgency,
};

/// 发布帖子请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub category: PostCategory,
    #[validate(length(min = 1, max = 100, message = "标题长度必须在1-100个字符之间"))]
    pub title: String,
    #[validate(length(max = 2000, message = "描述不能超过2000个字符"))]
    #[serde(default)]
    pub description: String,
    #[validate(length(equal = 2, message = "坐标必须为 [经度, 纬度]"))]
    pub coordinates: Vec<f64>,
    pub urgency: Option<Urgency>,
    #[validate(length(max = 10, message = "图片不能超过10张"))]
    #[serde(default)]
    pub images: Vec<String>,
}

impl From<CreatePostRequest> for CreatePostInput {
    fn from(req: CreatePostRequest) -> Self {
        Self {
            post_type: req.post_type,
            category: req.category,
            title: req.title,
            description: req.description,
            coordinates: req.coordinates,
            urgency: req.urgency,
            images: req.images,
        }
    }
}

/// 响应帖子请求
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RespondPostRequest {
    #[validate(length(max = 1000, message = "留言不能超过1000个字符"))]
    #[serde(default)]
    pub message: String,
}

/// 评分请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RatePostRequest {
    #[validate(range(min = 1, max = 5, message = "评分必须在1-5之间"))]
    pub rating: i32,
    #[validate(length(max = 500, message = "评语不能超过500个字符"))]
    pub comment: Option<String>,
}

/// 发起紧急求助请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmergencyRequest {
    #[serde(rename = "type")]
    pub emergency_type: EmergencyType,
    #[validate(length(min = 1, max = 500, message = "求助内容长度必须在1-500个字符之间"))]
    pub message: String,
    #[validate(length(equal = 2, message = "坐标必须为 [经度, 纬度]"))]
    pub coordinates: Vec<f64>,
}

impl From<CreateEmergencyRequest> for CreateEmergencyInput {
    fn from(req: CreateEmergencyRequest) -> Self {
        Self {
            emergency_type: req.emergency_type,
            message: req.message,
            coordinates: req.coordinates,
        }
    }
}

/// 发送会话消息请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 2000, message = "消息长度必须在1-2000个字符之间"))]
    pub content: String,
}

/// 街区帖子列表查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListQuery {
    #[serde(rename = "type")]
    pub post_type: Option<PostType>,
    pub category: Option<PostCategory>,
    pub status: Option<PostStatus>,
}

impl PostListQuery {
    pub fn into_filter(self, neighborhood: String) -> PostFilter {
        PostFilter {
            post_type: self.post_type,
            category: self.category,
            statuses: self.status.into_iter().collect(),
            ..PostFilter::for_neighborhood(neighborhood)
        }
    }
}

/// 附近查询参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQuery {
    pub lng: f64,
    pub lat: f64,
    /// 半径（米），缺省使用配置值
    pub max_distance: Option<f64>,
}

impl NearbyQuery {
    pub fn coordinates(&self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

/// 排行榜查询参数
#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}
