use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::post::PostAuthor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub text: String,
    pub author: PostAuthor,
    pub created_at: DateTime<Utc>,
    pub likes: i64,
    pub edit_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCommentRequest {
    pub post_id: i64,

    #[validate(length(min = 1, max = 5000))]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, max = 5000))]
    pub text: String,
}

/// 待创建的评论,id/时间戳/计数器由存储层填充
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub text: String,
    pub author: PostAuthor,
}

#[derive(Debug, Clone, Default)]
pub struct CommentPatch {
    pub text: Option<String>,
    pub edit_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentResponse {
    #[serde(flatten)]
    pub comment: Comment,
    pub is_liked_by_user: Option<bool>,
}
