use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: PostCategory,
    pub images: Vec<String>,
    pub author: PostAuthor,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub likes: i64,
    pub comment_count: i64,
    pub resolved: bool,
    pub edit_count: i64,
}

/// 帖子分类。`All` 只用于列表筛选,不能作为帖子自身的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostCategory {
    All,
    General,
    Academics,
    Events,
    Marketplace,
    LostAndFound,
}

impl PostCategory {
    pub fn is_assignable(&self) -> bool {
        !matches!(self, Self::All)
    }

    /// 只有交易和失物招领类帖子有"已解决"状态
    pub fn supports_resolution(&self) -> bool {
        matches!(self, Self::Marketplace | Self::LostAndFound)
    }
}

/// 冗余在帖子/评论上的作者信息,省去读路径上的用户查询
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostAuthor {
    pub user_id: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1, max = 20000))]
    pub content: String,

    pub category: PostCategory,

    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 20000))]
    pub content: Option<String>,

    pub category: Option<PostCategory>,
    pub images: Option<Vec<String>>,
    pub resolved: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostSort {
    #[default]
    Newest,
    Oldest,
    Popular,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostQuery {
    pub category: Option<PostCategory>,
    pub search: Option<String>,
    pub sort: Option<PostSort>,
}

/// 内容存储的列表参数,由服务层从查询参数归一化而来
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub category: Option<PostCategory>,
    pub search: Option<String>,
    pub sort: PostSort,
}

/// 待创建的帖子,id/时间戳/计数器由存储层填充
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub category: PostCategory,
    pub images: Vec<String>,
    pub author: PostAuthor,
}

/// 帖子字段补丁。计数器不走这里,只通过存储层的显式增量修改
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<PostCategory>,
    pub images: Option<Vec<String>>,
    pub resolved: Option<bool>,
    pub edit_count: Option<i64>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PostPatch {
    /// 是否包含任何实际的内容变更 (编辑计数和时间戳由服务层在有变更时才设置)
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.category.is_none()
            && self.images.is_none()
            && self.resolved.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostResponse {
    #[serde(flatten)]
    pub post: Post,
    pub is_liked_by_user: Option<bool>,
    pub is_saved_by_user: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LikeToggleResponse {
    pub is_liked_by_user: bool,
    pub likes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveToggleResponse {
    pub is_saved_by_user: bool,
    pub saves: i64,
}
