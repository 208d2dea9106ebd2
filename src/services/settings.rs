use std::sync::Arc;

use tracing::debug;

use crate::{
    error::Result,
    models::notification::{
        NotificationCategory, NotificationType, UpdateNotificationSettingsRequest,
        UserNotificationSettings,
    },
    store::SettingsStore,
};

/// 通知类型到设置分类的固定映射。
///
/// 返回 `None` 的类型 (帖子点赞、紧急广播) 是刻意不映射的:
/// 它们不受任何开关约束,始终放行。
pub fn category_for(notification_type: NotificationType) -> Option<NotificationCategory> {
    match notification_type {
        NotificationType::PostComment | NotificationType::ThreadReply => {
            Some(NotificationCategory::Comments)
        }
        NotificationType::CommentLike => Some(NotificationCategory::Likes),
        NotificationType::PostResolvedStatus => Some(NotificationCategory::StatusUpdates),
        NotificationType::NewPostInCategory => Some(NotificationCategory::Community),
        NotificationType::PostLike | NotificationType::EmergencyAlert => None,
    }
}

/// 偏好解析服务:决定某个接收者是否接受某类通知
#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn SettingsStore>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// 读取用户设置;没有记录时等价于全部开启
    pub async fn get_settings(&self, user_id: &str) -> Result<UserNotificationSettings> {
        Ok(self
            .store
            .get(user_id)
            .await?
            .unwrap_or_else(|| UserNotificationSettings::defaults_for(user_id)))
    }

    pub async fn update_settings(
        &self,
        user_id: &str,
        request: UpdateNotificationSettingsRequest,
    ) -> Result<UserNotificationSettings> {
        let mut settings = self.get_settings(user_id).await?;

        if let Some(comments) = request.comments {
            settings.comments = comments;
        }
        if let Some(likes) = request.likes {
            settings.likes = likes;
        }
        if let Some(status_updates) = request.status_updates {
            settings.status_updates = status_updates;
        }
        if let Some(community) = request.community {
            settings.community = community;
        }

        debug!("Updating notification settings for user: {}", user_id);
        Ok(self.store.upsert(settings).await?)
    }

    /// 偏好裁决:接收者是否接受该类型的通知
    pub async fn allows(&self, recipient_id: &str, notification_type: NotificationType) -> Result<bool> {
        match category_for(notification_type) {
            None => Ok(true),
            Some(category) => Ok(self.get_settings(recipient_id).await?.allows(category)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> SettingsService {
        SettingsService::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_type_to_category_mapping() {
        assert_eq!(
            category_for(NotificationType::PostComment),
            Some(NotificationCategory::Comments)
        );
        assert_eq!(
            category_for(NotificationType::ThreadReply),
            Some(NotificationCategory::Comments)
        );
        assert_eq!(
            category_for(NotificationType::CommentLike),
            Some(NotificationCategory::Likes)
        );
        assert_eq!(
            category_for(NotificationType::PostResolvedStatus),
            Some(NotificationCategory::StatusUpdates)
        );
        assert_eq!(
            category_for(NotificationType::NewPostInCategory),
            Some(NotificationCategory::Community)
        );
        // 未映射的类型始终放行
        assert_eq!(category_for(NotificationType::PostLike), None);
        assert_eq!(category_for(NotificationType::EmergencyAlert), None);
    }

    #[tokio::test]
    async fn test_missing_record_allows_everything() {
        let service = service();
        assert!(service.allows("u1", NotificationType::ThreadReply).await.unwrap());
        assert!(service.allows("u1", NotificationType::CommentLike).await.unwrap());
    }

    #[tokio::test]
    async fn test_disabled_category_blocks_mapped_types_only() {
        let service = service();
        service
            .update_settings(
                "u1",
                UpdateNotificationSettingsRequest {
                    comments: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!service.allows("u1", NotificationType::PostComment).await.unwrap());
        assert!(!service.allows("u1", NotificationType::ThreadReply).await.unwrap());
        // 其他分类与未映射类型不受影响
        assert!(service.allows("u1", NotificationType::CommentLike).await.unwrap());
        assert!(service.allows("u1", NotificationType::PostLike).await.unwrap());
        assert!(service.allows("u1", NotificationType::EmergencyAlert).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_persists_partial_patch() {
        let service = service();
        let settings = service
            .update_settings(
                "u1",
                UpdateNotificationSettingsRequest {
                    likes: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!settings.likes);
        assert!(settings.comments);

        let reloaded = service.get_settings("u1").await.unwrap();
        assert!(!reloaded.likes);
    }
}
