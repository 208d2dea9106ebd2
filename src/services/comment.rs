use std::sync::Arc;

use tracing::{debug, info, warn};
use validator::Validate;

use crate::{
    error::{AppError, Result},
    models::{
        comment::*,
        post::{LikeToggleResponse, PostAuthor},
        user::AuthUser,
    },
    services::notification::NotificationService,
    store::{ContentStore, RelationStore, StoreError},
};

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn ContentStore>,
    comment_likes: Arc<dyn RelationStore>,
    notifications: NotificationService,
}

impl CommentService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        comment_likes: Arc<dyn RelationStore>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            store,
            comment_likes,
            notifications,
        }
    }

    pub async fn create_comment(
        &self,
        author: &AuthUser,
        request: CreateCommentRequest,
    ) -> Result<Comment> {
        debug!("Creating comment on post: {}", request.post_id);

        request.validate().map_err(AppError::ValidatorError)?;

        let text = request.text.trim();
        if text.is_empty() {
            return Err(AppError::validation("Comment text must not be empty"));
        }

        // Verify the post exists before anything else
        let post = self
            .store
            .get_post(request.post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post"))?;

        // Same profile rule as posts: fail before any write so nothing
        // (comment or notification) is created for an incomplete profile
        if !author.has_complete_profile() {
            return Err(AppError::ProfileIncomplete(
                "Add your first and last name before commenting".to_string(),
            ));
        }

        // Fan-out targets are the commenters that existed before this one
        let prior_commenters: Vec<String> = self
            .store
            .list_comments_for_post(post.id)
            .await?
            .into_iter()
            .map(|c| c.author.user_id)
            .collect();

        let created = self
            .store
            .create_comment(NewComment {
                post_id: post.id,
                text: text.to_string(),
                author: PostAuthor {
                    user_id: author.id.clone(),
                    name: author.display_name(),
                    avatar_url: author.avatar_url.clone(),
                },
            })
            .await?;

        self.store.adjust_post_comment_count(post.id, 1).await?;

        // Best-effort: a notification failure never fails the comment itself
        if let Err(e) = self
            .notifications
            .fan_out_new_comment(&post, &created, &prior_commenters)
            .await
        {
            warn!(
                "Failed to fan out notifications for comment {}: {}",
                created.id, e
            );
        }

        info!("Created comment {} on post {} by user {}", created.id, post.id, author.id);
        Ok(created)
    }

    /// 帖子下的全部评论,最早在前,附带当前用户的点赞状态
    pub async fn list_post_comments(
        &self,
        post_id: i64,
        viewer: Option<&AuthUser>,
    ) -> Result<Vec<CommentResponse>> {
        if self.store.get_post(post_id).await?.is_none() {
            return Err(AppError::not_found("Post"));
        }

        let comments = self.store.list_comments_for_post(post_id).await?;
        let mut responses = Vec::with_capacity(comments.len());
        for comment in comments {
            let is_liked = match viewer {
                Some(user) => Some(self.comment_likes.exists(comment.id, &user.id).await?),
                None => None,
            };
            responses.push(CommentResponse {
                comment,
                is_liked_by_user: is_liked,
            });
        }
        Ok(responses)
    }

    pub async fn update_comment(
        &self,
        comment_id: i64,
        actor: &AuthUser,
        request: UpdateCommentRequest,
    ) -> Result<Comment> {
        request.validate().map_err(AppError::ValidatorError)?;

        let text = request.text.trim();
        if text.is_empty() {
            return Err(AppError::validation("Comment text must not be empty"));
        }

        let comment = self
            .store
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::not_found("Comment"))?;

        if comment.author.user_id != actor.id {
            return Err(AppError::forbidden("You can only edit your own comments"));
        }

        // Identical text is a no-op and must not bump the edit count
        if text == comment.text {
            return Ok(comment);
        }

        let updated = self
            .store
            .update_comment_fields(
                comment_id,
                CommentPatch {
                    text: Some(text.to_string()),
                    edit_count: Some(comment.edit_count + 1),
                },
            )
            .await?;

        Ok(updated)
    }

    pub async fn delete_comment(&self, comment_id: i64, actor: &AuthUser) -> Result<()> {
        let comment = self
            .store
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::not_found("Comment"))?;

        if comment.author.user_id != actor.id && !actor.is_moderator() {
            return Err(AppError::forbidden(
                "Only the author or a moderator can delete this comment",
            ));
        }

        self.store.delete_comment(comment_id).await?;
        self.comment_likes.remove_all_for_subject(comment_id).await?;
        // 父帖可能正在被级联删除,计数回退失败不视为错误
        match self.store.adjust_post_comment_count(comment.post_id, -1).await {
            Ok(_) | Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        info!("Deleted comment {} (by {})", comment_id, actor.id);
        Ok(())
    }

    /// 评论点赞开关,与帖子点赞同一套先写后分支的纪律
    pub async fn toggle_like(&self, comment_id: i64, user: &AuthUser) -> Result<LikeToggleResponse> {
        let comment = self
            .store
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::not_found("Comment"))?;

        match self.comment_likes.create(comment_id, &user.id).await {
            Ok(()) => {
                let likes = self.store.adjust_comment_likes(comment_id, 1).await?;

                if let Err(e) = self.notifications.notify_comment_liked(&comment, user).await {
                    warn!(
                        "Failed to dispatch comment_like notification for comment {}: {}",
                        comment_id, e
                    );
                }

                Ok(LikeToggleResponse {
                    is_liked_by_user: true,
                    likes,
                })
            }
            Err(StoreError::AlreadyExists) => {
                match self.comment_likes.remove(comment_id, &user.id).await {
                    Ok(()) | Err(StoreError::NotFound) => {}
                    Err(e) => return Err(e.into()),
                }
                let likes = self.store.adjust_comment_likes(comment_id, -1).await?;

                Ok(LikeToggleResponse {
                    is_liked_by_user: false,
                    likes,
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::notification::{NotificationType, UpdateNotificationSettingsRequest};
    use crate::models::post::{CreatePostRequest, PostCategory};
    use crate::models::user::UserRole;
    use crate::services::post::PostService;
    use crate::services::settings::SettingsService;
    use crate::store::{MemoryRelationStore, MemoryStore};

    struct Harness {
        posts: PostService,
        comments: CommentService,
        notifications: NotificationService,
        settings: SettingsService,
        store: Arc<MemoryStore>,
        comment_likes: Arc<MemoryRelationStore>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let post_likes = Arc::new(MemoryRelationStore::new());
        let post_saves = Arc::new(MemoryRelationStore::new());
        let comment_likes = Arc::new(MemoryRelationStore::new());
        let settings = SettingsService::new(store.clone());
        let notifications = NotificationService::new(store.clone(), settings.clone());

        Harness {
            posts: PostService::new(
                Config::default(),
                store.clone(),
                post_likes,
                post_saves,
                comment_likes.clone(),
                notifications.clone(),
            ),
            comments: CommentService::new(store.clone(), comment_likes.clone(), notifications.clone()),
            notifications,
            settings,
            store,
            comment_likes,
        }
    }

    fn member(id: &str, first: &str, last: &str) -> AuthUser {
        AuthUser {
            id: id.to_string(),
            username: id.to_string(),
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            avatar_url: None,
            role: UserRole::Member,
        }
    }

    async fn seed_post(h: &Harness, author: &AuthUser) -> i64 {
        h.posts
            .create_post(
                author,
                CreatePostRequest {
                    title: "Study group".to_string(),
                    content: "Thursdays at the library".to_string(),
                    category: PostCategory::Academics,
                    images: vec![],
                },
            )
            .await
            .unwrap()
            .id
    }

    fn comment_on(post_id: i64, text: &str) -> CreateCommentRequest {
        CreateCommentRequest {
            post_id,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_comment_trims_and_rejects_blank_text() {
        let h = harness();
        let author = member("u1", "Ada", "Liu");
        let post_id = seed_post(&h, &author).await;

        let err = h
            .comments
            .create_comment(&author, comment_on(post_id, "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let created = h
            .comments
            .create_comment(&author, comment_on(post_id, "  hello  "))
            .await
            .unwrap();
        assert_eq!(created.text, "hello");
        assert_eq!(created.likes, 0);
        assert_eq!(created.edit_count, 0);
    }

    #[tokio::test]
    async fn test_create_comment_requires_existing_post() {
        let h = harness();
        let err = h
            .comments
            .create_comment(&member("u1", "Ada", "Liu"), comment_on(999, "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_incomplete_profile_creates_nothing() {
        let h = harness();
        let author = member("u1", "Ada", "Liu");
        let post_id = seed_post(&h, &author).await;

        let mut incomplete = member("u2", "Bo", "Chen");
        incomplete.last_name = Some("  ".to_string());

        let err = h
            .comments
            .create_comment(&incomplete, comment_on(post_id, "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ProfileIncomplete(_)));

        // 评论没有落库,也没有任何通知发出
        assert!(h.store.list_comments_for_post(post_id).await.unwrap().is_empty());
        assert!(h.notifications.list_for("u1", false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comment_count_tracks_creation_and_deletion() {
        let h = harness();
        let author = member("u1", "Ada", "Liu");
        let other = member("u2", "Bo", "Chen");
        let post_id = seed_post(&h, &author).await;

        let comment = h.comments.create_comment(&other, comment_on(post_id, "one")).await.unwrap();
        h.comments.create_comment(&other, comment_on(post_id, "two")).await.unwrap();
        assert_eq!(h.store.get_post(post_id).await.unwrap().unwrap().comment_count, 2);

        h.comments.delete_comment(comment.id, &other).await.unwrap();
        assert_eq!(h.store.get_post(post_id).await.unwrap().unwrap().comment_count, 1);
    }

    #[tokio::test]
    async fn test_fan_out_dedupes_and_skips_author_and_commenter() {
        let h = harness();
        let author = member("author", "Ada", "Liu");
        let a = member("a", "An", "Zhang");
        let b = member("b", "Bo", "Chen");
        let c = member("c", "Cai", "Wang");
        let post_id = seed_post(&h, &author).await;

        // A 评论了三次,B 一次
        h.comments.create_comment(&a, comment_on(post_id, "first")).await.unwrap();
        h.comments.create_comment(&a, comment_on(post_id, "second")).await.unwrap();
        h.comments.create_comment(&a, comment_on(post_id, "third")).await.unwrap();
        h.comments.create_comment(&b, comment_on(post_id, "hello")).await.unwrap();

        // C 发新评论:A 和 B 各恰好一条 thread_reply,C 自己没有
        h.comments.create_comment(&c, comment_on(post_id, "me too")).await.unwrap();

        let replies_for = |list: Vec<crate::models::notification::Notification>| {
            list.into_iter()
                .filter(|n| n.notification_type == NotificationType::ThreadReply)
                .collect::<Vec<_>>()
        };

        let a_replies = replies_for(h.notifications.list_for("a", false).await.unwrap());
        let b_replies = replies_for(h.notifications.list_for("b", false).await.unwrap());
        let c_replies = replies_for(h.notifications.list_for("c", false).await.unwrap());

        // A 此前已因 B 的评论收到一条,这次 C 的评论再多一条
        assert_eq!(a_replies.len(), 2);
        assert_eq!(b_replies.len(), 1);
        assert!(c_replies.is_empty());

        // 帖子作者收到的是 post_comment 而不是 thread_reply
        let author_inbox = h.notifications.list_for("author", false).await.unwrap();
        assert_eq!(
            author_inbox
                .iter()
                .filter(|n| n.notification_type == NotificationType::PostComment)
                .count(),
            5
        );
        assert!(author_inbox
            .iter()
            .all(|n| n.notification_type != NotificationType::ThreadReply));
    }

    #[tokio::test]
    async fn test_disabled_category_suppresses_fan_out() {
        let h = harness();
        let author = member("author", "Ada", "Liu");
        let a = member("a", "An", "Zhang");
        let b = member("b", "Bo", "Chen");
        let post_id = seed_post(&h, &author).await;

        h.comments.create_comment(&a, comment_on(post_id, "first")).await.unwrap();

        // A 关掉评论分类:B 的新评论不再给 A 建任何通知行
        h.settings
            .update_settings(
                "a",
                UpdateNotificationSettingsRequest {
                    comments: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        h.comments.create_comment(&b, comment_on(post_id, "second")).await.unwrap();

        assert!(h
            .notifications
            .list_for("a", false)
            .await
            .unwrap()
            .iter()
            .all(|n| n.notification_type != NotificationType::ThreadReply));
    }

    #[tokio::test]
    async fn test_update_comment_edit_count_discipline() {
        let h = harness();
        let author = member("u1", "Ada", "Liu");
        let post_id = seed_post(&h, &author).await;
        let comment = h.comments.create_comment(&author, comment_on(post_id, "draft")).await.unwrap();

        let unchanged = h
            .comments
            .update_comment(comment.id, &author, UpdateCommentRequest { text: "draft".to_string() })
            .await
            .unwrap();
        assert_eq!(unchanged.edit_count, 0);

        let updated = h
            .comments
            .update_comment(comment.id, &author, UpdateCommentRequest { text: "final".to_string() })
            .await
            .unwrap();
        assert_eq!(updated.edit_count, 1);
        assert_eq!(updated.text, "final");

        let err = h
            .comments
            .update_comment(
                comment.id,
                &member("u2", "Bo", "Chen"),
                UpdateCommentRequest { text: "hijack".to_string() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_toggle_like_involution_and_notification() {
        let h = harness();
        let author = member("u1", "Ada", "Liu");
        let liker = member("u2", "Bo", "Chen");
        let post_id = seed_post(&h, &author).await;
        let comment = h.comments.create_comment(&author, comment_on(post_id, "mine")).await.unwrap();

        let on = h.comments.toggle_like(comment.id, &liker).await.unwrap();
        assert!(on.is_liked_by_user);
        assert_eq!(on.likes, 1);

        let off = h.comments.toggle_like(comment.id, &liker).await.unwrap();
        assert!(!off.is_liked_by_user);
        assert_eq!(off.likes, 0);

        let likes: Vec<_> = h
            .notifications
            .list_for("u1", false)
            .await
            .unwrap()
            .into_iter()
            .filter(|n| n.notification_type == NotificationType::CommentLike)
            .collect();
        assert_eq!(likes.len(), 1);
    }

    #[tokio::test]
    async fn test_self_comment_like_sends_no_notification() {
        let h = harness();
        let author = member("u1", "Ada", "Liu");
        let post_id = seed_post(&h, &author).await;
        let comment = h.comments.create_comment(&author, comment_on(post_id, "mine")).await.unwrap();

        h.comments.toggle_like(comment.id, &author).await.unwrap();

        assert!(h
            .notifications
            .list_for("u1", false)
            .await
            .unwrap()
            .iter()
            .all(|n| n.notification_type != NotificationType::CommentLike));
    }

    #[tokio::test]
    async fn test_delete_comment_cleans_its_likes() {
        let h = harness();
        let author = member("u1", "Ada", "Liu");
        let liker = member("u2", "Bo", "Chen");
        let post_id = seed_post(&h, &author).await;
        let comment = h.comments.create_comment(&author, comment_on(post_id, "mine")).await.unwrap();

        h.comments.toggle_like(comment.id, &liker).await.unwrap();
        h.comments.delete_comment(comment.id, &author).await.unwrap();

        assert!(h.store.get_comment(comment.id).await.unwrap().is_none());
        assert_eq!(h.comment_likes.count_for_subject(comment.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_post_comments_oldest_first_with_like_flags() {
        let h = harness();
        let author = member("u1", "Ada", "Liu");
        let viewer = member("u2", "Bo", "Chen");
        let post_id = seed_post(&h, &author).await;

        let first = h.comments.create_comment(&author, comment_on(post_id, "first")).await.unwrap();
        h.comments.create_comment(&author, comment_on(post_id, "second")).await.unwrap();
        h.comments.toggle_like(first.id, &viewer).await.unwrap();

        let listed = h.comments.list_post_comments(post_id, Some(&viewer)).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].comment.text, "first");
        assert_eq!(listed[0].is_liked_by_user, Some(true));
        assert_eq!(listed[1].is_liked_by_user, Some(false));

        // 匿名读取不带点赞标记
        let anonymous = h.comments.list_post_comments(post_id, None).await.unwrap();
        assert_eq!(anonymous[0].is_liked_by_user, None);
    }
}
