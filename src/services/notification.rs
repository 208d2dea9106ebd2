use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    error::{AppError, Result},
    models::{
        comment::Comment,
        notification::{NewNotification, Notification, NotificationType},
        post::Post,
        user::AuthUser,
    },
    services::settings::SettingsService,
    store::NotificationStore,
};

/// 通知派发服务。
///
/// 每次派发先询问偏好解析;被接收者关掉的分类直接丢弃,既不落库也不排队。
/// 派发失败只记日志,绝不反过来让触发它的发帖/评论/点赞失败。
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    settings: SettingsService,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>, settings: SettingsService) -> Self {
        Self { store, settings }
    }

    /// 创建单条通知;接收者关闭了对应分类时返回 `Ok(None)`
    pub async fn dispatch(&self, new: NewNotification) -> Result<Option<Notification>> {
        if !self.settings.allows(&new.recipient_id, new.notification_type).await? {
            debug!(
                "Notification suppressed by recipient preference: {:?} -> {}",
                new.notification_type, new.recipient_id
            );
            return Ok(None);
        }

        let created = self.store.create(new).await?;
        Ok(Some(created))
    }

    /// 新评论的扇出:帖子作者一条 post_comment,既往评论者去重后各一条 thread_reply。
    ///
    /// `prior_commenters` 是新评论入库前该帖的全部评论作者 (可含重复),
    /// 去重和排除评论者本人/帖子作者都在这里完成。单个接收者派发失败
    /// 不影响其余接收者。
    pub async fn fan_out_new_comment(
        &self,
        post: &Post,
        comment: &Comment,
        prior_commenters: &[String],
    ) -> Result<()> {
        let commenter = &comment.author.user_id;

        if post.author.user_id != *commenter {
            let new = NewNotification {
                recipient_id: post.author.user_id.clone(),
                sender_id: Some(commenter.clone()),
                post_id: Some(post.id),
                comment_id: Some(comment.id),
                notification_type: NotificationType::PostComment,
                message: format!(
                    "{} commented on your post \"{}\"",
                    comment.author.name, post.title
                ),
            };
            if let Err(e) = self.dispatch(new).await {
                warn!(
                    "Failed to deliver post_comment notification for post {}: {}",
                    post.id, e
                );
            }
        }

        let mut notified: HashSet<&str> = HashSet::new();
        for user_id in prior_commenters {
            if user_id == commenter || *user_id == post.author.user_id {
                continue;
            }
            // 同一个人评论过多少次都只收一条
            if !notified.insert(user_id) {
                continue;
            }

            let new = NewNotification {
                recipient_id: user_id.clone(),
                sender_id: Some(commenter.clone()),
                post_id: Some(post.id),
                comment_id: Some(comment.id),
                notification_type: NotificationType::ThreadReply,
                message: format!(
                    "{} also commented on \"{}\"",
                    comment.author.name, post.title
                ),
            };
            if let Err(e) = self.dispatch(new).await {
                warn!(
                    "Failed to deliver thread_reply notification to {}: {}",
                    user_id, e
                );
            }
        }

        Ok(())
    }

    /// 帖子被点赞时通知作者。自己给自己点赞不通知
    pub async fn notify_post_liked(&self, post: &Post, liker: &AuthUser) -> Result<()> {
        if post.author.user_id == liker.id {
            return Ok(());
        }

        self.dispatch(NewNotification {
            recipient_id: post.author.user_id.clone(),
            sender_id: Some(liker.id.clone()),
            post_id: Some(post.id),
            comment_id: None,
            notification_type: NotificationType::PostLike,
            message: format!("{} liked your post \"{}\"", liker.display_name(), post.title),
        })
        .await?;
        Ok(())
    }

    /// 评论被点赞时通知评论作者。自己给自己点赞不通知
    pub async fn notify_comment_liked(&self, comment: &Comment, liker: &AuthUser) -> Result<()> {
        if comment.author.user_id == liker.id {
            return Ok(());
        }

        self.dispatch(NewNotification {
            recipient_id: comment.author.user_id.clone(),
            sender_id: Some(liker.id.clone()),
            post_id: Some(comment.post_id),
            comment_id: Some(comment.id),
            notification_type: NotificationType::CommentLike,
            message: format!("{} liked your comment", liker.display_name()),
        })
        .await?;
        Ok(())
    }

    /// 帖子"已解决"状态翻转时通知既往评论者 (去重,不含作者本人)
    pub async fn notify_resolved_status(&self, post: &Post, commenters: &[String]) -> Result<()> {
        let status = if post.resolved { "resolved" } else { "unresolved" };

        let mut notified: HashSet<&str> = HashSet::new();
        for user_id in commenters {
            if *user_id == post.author.user_id || !notified.insert(user_id) {
                continue;
            }

            let new = NewNotification {
                recipient_id: user_id.clone(),
                sender_id: Some(post.author.user_id.clone()),
                post_id: Some(post.id),
                comment_id: None,
                notification_type: NotificationType::PostResolvedStatus,
                message: format!(
                    "The post \"{}\" you commented on was marked {}",
                    post.title, status
                ),
            };
            if let Err(e) = self.dispatch(new).await {
                warn!(
                    "Failed to deliver post_resolved_status notification to {}: {}",
                    user_id, e
                );
            }
        }

        Ok(())
    }

    /// 系统级紧急广播,没有发送者。接收者名单由调用方给出,这里去重后逐条派发
    pub async fn broadcast_alert(&self, recipient_ids: &[String], message: &str) -> Result<usize> {
        let mut notified: HashSet<&str> = HashSet::new();
        let mut sent = 0;

        for recipient_id in recipient_ids {
            if !notified.insert(recipient_id) {
                continue;
            }

            let created = self
                .dispatch(NewNotification {
                    recipient_id: recipient_id.clone(),
                    sender_id: None,
                    post_id: None,
                    comment_id: None,
                    notification_type: NotificationType::EmergencyAlert,
                    message: message.to_string(),
                })
                .await?;
            if created.is_some() {
                sent += 1;
            }
        }

        info!("Broadcast emergency alert to {} recipients", sent);
        Ok(sent)
    }

    pub async fn list_for(&self, user_id: &str, unread_only: bool) -> Result<Vec<Notification>> {
        Ok(self.store.list_for_recipient(user_id, unread_only).await?)
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<i64> {
        Ok(self.store.unread_count(user_id).await?)
    }

    /// 标记已读。只有接收者本人可以操作;对他人的通知一律按不存在处理
    pub async fn mark_read(&self, id: i64, user_id: &str) -> Result<Notification> {
        let notification = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("Notification"))?;
        if notification.recipient_id != user_id {
            return Err(AppError::not_found("Notification"));
        }

        Ok(self.store.mark_read(id).await?)
    }

    pub async fn mark_all_read(&self, user_id: &str) -> Result<usize> {
        Ok(self.store.mark_all_read(user_id).await?)
    }

    pub async fn delete(&self, id: i64, user_id: &str) -> Result<()> {
        let notification = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("Notification"))?;
        if notification.recipient_id != user_id {
            return Err(AppError::not_found("Notification"));
        }

        Ok(self.store.delete(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::UpdateNotificationSettingsRequest;
    use crate::store::MemoryStore;

    fn service() -> (NotificationService, SettingsService) {
        let store = Arc::new(MemoryStore::new());
        let settings = SettingsService::new(store.clone());
        (NotificationService::new(store, settings.clone()), settings)
    }

    fn alert_for(recipient: &str) -> NewNotification {
        NewNotification {
            recipient_id: recipient.to_string(),
            sender_id: None,
            post_id: None,
            comment_id: None,
            notification_type: NotificationType::EmergencyAlert,
            message: "campus closed".to_string(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_drops_disabled_category() {
        let (service, settings) = service();
        settings
            .update_settings(
                "u1",
                UpdateNotificationSettingsRequest {
                    likes: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let dropped = service
            .dispatch(NewNotification {
                recipient_id: "u1".into(),
                sender_id: Some("u2".into()),
                post_id: None,
                comment_id: Some(1),
                notification_type: NotificationType::CommentLike,
                message: "x".into(),
            })
            .await
            .unwrap();

        assert!(dropped.is_none());
        assert!(service.list_for("u1", false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_is_recipient_scoped() {
        let (service, _) = service();
        let created = service.dispatch(alert_for("u1")).await.unwrap().unwrap();

        // 非接收者按不存在处理,不泄露通知是否存在
        let err = service.mark_read(created.id, "u2").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let read = service.mark_read(created.id, "u1").await.unwrap();
        assert!(read.is_read);
    }

    #[tokio::test]
    async fn test_delete_is_recipient_scoped() {
        let (service, _) = service();
        let created = service.dispatch(alert_for("u1")).await.unwrap().unwrap();

        assert!(service.delete(created.id, "u2").await.is_err());
        service.delete(created.id, "u1").await.unwrap();
        assert!(service.list_for("u1", false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_deduplicates_recipients() {
        let (service, _) = service();
        let recipients = vec!["u1".to_string(), "u2".to_string(), "u1".to_string()];

        let sent = service.broadcast_alert(&recipients, "storm warning").await.unwrap();
        assert_eq!(sent, 2);
        assert_eq!(service.list_for("u1", false).await.unwrap().len(), 1);

        let received = &service.list_for("u2", false).await.unwrap()[0];
        assert_eq!(received.sender_id, None);
        assert_eq!(received.notification_type, NotificationType::EmergencyAlert);
    }
}
