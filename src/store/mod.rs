use async_trait::async_trait;

use crate::models::{
    comment::{Comment, CommentPatch, NewComment},
    notification::{NewNotification, Notification, UserNotificationSettings},
    post::{NewPost, Post, PostFilter, PostPatch},
};

pub mod memory;

pub use memory::{MemoryRelationStore, MemoryStore};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// 帖子与评论的存储契约。
///
/// 计数字段 (`likes`, `comment_count`) 只通过 `adjust_*` 的显式增量修改,
/// 读写热路径上从不由关系行重新计算 (对账任务在本服务之外)。
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn create_post(&self, new: NewPost) -> StoreResult<Post>;
    async fn get_post(&self, id: i64) -> StoreResult<Option<Post>>;
    async fn list_posts(&self, filter: &PostFilter) -> StoreResult<Vec<Post>>;
    async fn update_post_fields(&self, id: i64, patch: PostPatch) -> StoreResult<Post>;
    async fn delete_post(&self, id: i64) -> StoreResult<()>;
    async fn adjust_post_likes(&self, id: i64, delta: i64) -> StoreResult<i64>;
    async fn adjust_post_comment_count(&self, id: i64, delta: i64) -> StoreResult<i64>;

    async fn create_comment(&self, new: NewComment) -> StoreResult<Comment>;
    async fn get_comment(&self, id: i64) -> StoreResult<Option<Comment>>;
    /// 按创建时间升序返回帖子下的全部评论
    async fn list_comments_for_post(&self, post_id: i64) -> StoreResult<Vec<Comment>>;
    async fn update_comment_fields(&self, id: i64, patch: CommentPatch) -> StoreResult<Comment>;
    async fn delete_comment(&self, id: i64) -> StoreResult<()>;
    /// 删除帖子下的全部评论,返回被删除的评论 id
    async fn delete_comments_for_post(&self, post_id: i64) -> StoreResult<Vec<i64>>;
    async fn adjust_comment_likes(&self, id: i64, delta: i64) -> StoreResult<i64>;
}

/// (subject, user) 关系行的存储契约,点赞/收藏共用。
///
/// 唯一性由存储自身在写锁内保证:同一用户的并发重复点赞只有一个 `create`
/// 会成功,另一个得到 `AlreadyExists`。调用方据此分支,而不是先查再写。
#[async_trait]
pub trait RelationStore: Send + Sync {
    async fn exists(&self, subject_id: i64, user_id: &str) -> StoreResult<bool>;
    async fn create(&self, subject_id: i64, user_id: &str) -> StoreResult<()>;
    async fn remove(&self, subject_id: i64, user_id: &str) -> StoreResult<()>;
    async fn count_for_subject(&self, subject_id: i64) -> StoreResult<i64>;
    /// 级联删除用:清掉某个主体的全部关系行,返回删除数量
    async fn remove_all_for_subject(&self, subject_id: i64) -> StoreResult<usize>;
    async fn subjects_for_user(&self, user_id: &str) -> StoreResult<Vec<i64>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, new: NewNotification) -> StoreResult<Notification>;
    async fn get(&self, id: i64) -> StoreResult<Option<Notification>>;
    /// 按创建时间降序返回接收者的通知
    async fn list_for_recipient(&self, user_id: &str, unread_only: bool) -> StoreResult<Vec<Notification>>;
    async fn unread_count(&self, user_id: &str) -> StoreResult<i64>;
    async fn mark_read(&self, id: i64) -> StoreResult<Notification>;
    async fn mark_all_read(&self, user_id: &str) -> StoreResult<usize>;
    async fn delete(&self, id: i64) -> StoreResult<()>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, user_id: &str) -> StoreResult<Option<UserNotificationSettings>>;
    async fn upsert(&self, settings: UserNotificationSettings) -> StoreResult<UserNotificationSettings>;
}
