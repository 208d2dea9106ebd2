use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: String,
    /// 系统广播没有发送者
    pub sender_id: Option<String>,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub notification_type: NotificationType,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    PostComment,
    PostLike,
    CommentLike,
    ThreadReply,
    PostResolvedStatus,
    NewPostInCategory,
    EmergencyAlert,
}

/// 待派发的通知,只有通过接收者偏好裁决后才会落库
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: String,
    pub sender_id: Option<String>,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub notification_type: NotificationType,
    pub message: String,
}

/// 通知设置分类。分类与通知类型不是一一对应:一个分类可覆盖多个类型,
/// 未映射到任何分类的类型始终放行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Comments,
    Likes,
    StatusUpdates,
    Community,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserNotificationSettings {
    pub user_id: String,
    pub comments: bool,
    pub likes: bool,
    pub status_updates: bool,
    pub community: bool,
}

impl UserNotificationSettings {
    /// 没有设置记录等价于全部开启
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            comments: true,
            likes: true,
            status_updates: true,
            community: true,
        }
    }

    pub fn allows(&self, category: NotificationCategory) -> bool {
        match category {
            NotificationCategory::Comments => self.comments,
            NotificationCategory::Likes => self.likes,
            NotificationCategory::StatusUpdates => self.status_updates,
            NotificationCategory::Community => self.community,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNotificationSettingsRequest {
    pub comments: Option<bool>,
    pub likes: Option<bool>,
    pub status_updates: Option<bool>,
    pub community: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationQuery {
    pub unread: Option<bool>,
}

/// 仅限版主的紧急广播请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BroadcastRequest {
    #[validate(length(min = 1))]
    pub recipient_ids: Vec<String>,

    #[validate(length(min = 1, max = 1000))]
    pub message: String,
}
