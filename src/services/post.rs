use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, Result},
    models::{
        post::*,
        user::AuthUser,
    },
    services::notification::NotificationService,
    store::{ContentStore, RelationStore, StoreError},
    utils::validation::validate_image_payloads,
};

#[derive(Clone)]
pub struct PostService {
    config: Config,
    store: Arc<dyn ContentStore>,
    post_likes: Arc<dyn RelationStore>,
    post_saves: Arc<dyn RelationStore>,
    comment_likes: Arc<dyn RelationStore>,
    notifications: NotificationService,
}

impl PostService {
    pub fn new(
        config: Config,
        store: Arc<dyn ContentStore>,
        post_likes: Arc<dyn RelationStore>,
        post_saves: Arc<dyn RelationStore>,
        comment_likes: Arc<dyn RelationStore>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            config,
            store,
            post_likes,
            post_saves,
            comment_likes,
            notifications,
        }
    }

    /// 创建新帖子
    pub async fn create_post(&self, author: &AuthUser, request: CreatePostRequest) -> Result<Post> {
        debug!("Creating post for user: {}", author.id);

        // 验证输入
        request.validate().map_err(AppError::ValidatorError)?;

        if !request.category.is_assignable() {
            return Err(AppError::validation(
                "Category \"All\" is only valid as a list filter",
            ));
        }

        // 发帖要求完整的个人资料,提示客户端引导用户补全
        if !author.has_complete_profile() {
            return Err(AppError::ProfileIncomplete(
                "Add your first and last name before posting".to_string(),
            ));
        }

        validate_image_payloads(
            &request.images,
            self.config.max_images_per_post,
            self.config.max_image_payload_bytes,
        )?;

        let created = self
            .store
            .create_post(NewPost {
                title: request.title,
                content: request.content,
                category: request.category,
                images: request.images,
                author: PostAuthor {
                    user_id: author.id.clone(),
                    name: author.display_name(),
                    avatar_url: author.avatar_url.clone(),
                },
            })
            .await?;

        info!("Created post {} by user {}", created.id, author.id);
        Ok(created)
    }

    /// 根据 ID 获取帖子,附带当前用户的点赞/收藏状态
    pub async fn get_post(&self, post_id: i64, viewer: Option<&AuthUser>) -> Result<PostResponse> {
        let post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post"))?;

        self.annotate(post, viewer).await
    }

    /// 获取帖子列表。`All` 分类等价于不过滤
    pub async fn list_posts(
        &self,
        query: PostQuery,
        viewer: Option<&AuthUser>,
    ) -> Result<Vec<PostResponse>> {
        debug!("Fetching posts list with query: {:?}", query);

        let filter = PostFilter {
            category: query.category.filter(|c| c.is_assignable()),
            search: query
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            sort: query.sort.unwrap_or_default(),
        };

        let posts = self.store.list_posts(&filter).await?;
        let mut responses = Vec::with_capacity(posts.len());
        for post in posts {
            responses.push(self.annotate(post, viewer).await?);
        }
        Ok(responses)
    }

    /// 当前用户收藏的帖子,最新在前
    pub async fn list_saved_posts(&self, user: &AuthUser) -> Result<Vec<PostResponse>> {
        let ids = self.post_saves.subjects_for_user(&user.id).await?;

        let mut posts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(post) = self.store.get_post(id).await? {
                posts.push(post);
            }
        }
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let mut responses = Vec::with_capacity(posts.len());
        for post in posts {
            responses.push(self.annotate(post, Some(user)).await?);
        }
        Ok(responses)
    }

    /// 更新帖子。只应用与当前值不同的字段;
    /// 有任何实际变化时编辑计数加一并刷新更新时间,否则是无副作用的空操作
    pub async fn update_post(
        &self,
        post_id: i64,
        actor: &AuthUser,
        request: UpdatePostRequest,
    ) -> Result<Post> {
        debug!("Updating post: {} by user: {}", post_id, actor.id);

        request.validate().map_err(AppError::ValidatorError)?;

        let post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post"))?;

        if post.author.user_id != actor.id {
            return Err(AppError::forbidden("Only the post author can edit this post"));
        }

        let mut patch = PostPatch::default();

        if let Some(title) = request.title {
            if title != post.title {
                patch.title = Some(title);
            }
        }
        if let Some(content) = request.content {
            if content != post.content {
                patch.content = Some(content);
            }
        }
        if let Some(category) = request.category {
            if !category.is_assignable() {
                return Err(AppError::validation(
                    "Category \"All\" is only valid as a list filter",
                ));
            }
            if category != post.category {
                patch.category = Some(category);
            }
        }
        if let Some(images) = request.images {
            validate_image_payloads(
                &images,
                self.config.max_images_per_post,
                self.config.max_image_payload_bytes,
            )?;
            if images != post.images {
                patch.images = Some(images);
            }
        }

        let mut resolved_changed = false;
        if let Some(resolved) = request.resolved {
            if resolved != post.resolved {
                let category = patch.category.unwrap_or(post.category);
                if !category.supports_resolution() {
                    return Err(AppError::validation(
                        "This category does not support resolved status",
                    ));
                }
                patch.resolved = Some(resolved);
                resolved_changed = true;
            }
        }

        // 所有字段都与现值相同:不动编辑计数,也不碰更新时间
        if patch.is_empty() {
            return Ok(post);
        }

        patch.edit_count = Some(post.edit_count + 1);
        patch.updated_at = Some(Utc::now());

        let updated = self.store.update_post_fields(post_id, patch).await?;
        info!("Updated post {} (edit #{})", post_id, updated.edit_count);

        if resolved_changed {
            if let Err(e) = self.notify_resolved(&updated).await {
                warn!(
                    "Failed to dispatch resolved-status notifications for post {}: {}",
                    post_id, e
                );
            }
        }

        Ok(updated)
    }

    /// 删除帖子并级联清理。
    ///
    /// 顺序是保证不出现悬挂引用的关键:先收集评论 id,然后删除帖子本体,
    /// 再删除其评论,最后清掉帖子的点赞/收藏行与这些评论的点赞行。
    /// 中途崩溃可能留下暂时的孤儿行,由外部对账任务回收。
    pub async fn delete_post(&self, post_id: i64, actor: &AuthUser) -> Result<()> {
        debug!("Deleting post: {} by user: {}", post_id, actor.id);

        let post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post"))?;

        if post.author.user_id != actor.id && !actor.is_moderator() {
            return Err(AppError::forbidden(
                "Only the author or a moderator can delete this post",
            ));
        }

        let comment_ids: Vec<i64> = self
            .store
            .list_comments_for_post(post_id)
            .await?
            .iter()
            .map(|c| c.id)
            .collect();

        self.store.delete_post(post_id).await?;
        self.store.delete_comments_for_post(post_id).await?;
        self.post_likes.remove_all_for_subject(post_id).await?;
        self.post_saves.remove_all_for_subject(post_id).await?;
        for comment_id in &comment_ids {
            self.comment_likes.remove_all_for_subject(*comment_id).await?;
        }

        info!(
            "Deleted post {} with {} comments (by {})",
            post_id,
            comment_ids.len(),
            actor.id
        );
        Ok(())
    }

    /// 点赞开关。
    ///
    /// 先对关系存储尝试写入,再按结果分支:并发的重复请求会被存储的
    /// 唯一性约束挡下,而不是依赖先查后写
    pub async fn toggle_like(&self, post_id: i64, user: &AuthUser) -> Result<LikeToggleResponse> {
        let post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post"))?;

        match self.post_likes.create(post_id, &user.id).await {
            Ok(()) => {
                let likes = self.store.adjust_post_likes(post_id, 1).await?;

                if post.author.user_id != user.id {
                    if let Err(e) = self.notifications.notify_post_liked(&post, user).await {
                        warn!(
                            "Failed to dispatch post_like notification for post {}: {}",
                            post_id, e
                        );
                    }
                }

                Ok(LikeToggleResponse {
                    is_liked_by_user: true,
                    likes,
                })
            }
            Err(StoreError::AlreadyExists) => {
                // 已点赞,这次是取消;并发竞态下行可能已被对方删掉
                match self.post_likes.remove(post_id, &user.id).await {
                    Ok(()) | Err(StoreError::NotFound) => {}
                    Err(e) => return Err(e.into()),
                }
                let likes = self.store.adjust_post_likes(post_id, -1).await?;

                Ok(LikeToggleResponse {
                    is_liked_by_user: false,
                    likes,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 收藏开关,与点赞同一套纪律;收藏数直接取关系行计数
    pub async fn toggle_save(&self, post_id: i64, user: &AuthUser) -> Result<SaveToggleResponse> {
        if self.store.get_post(post_id).await?.is_none() {
            return Err(AppError::not_found("Post"));
        }

        let is_saved = match self.post_saves.create(post_id, &user.id).await {
            Ok(()) => true,
            Err(StoreError::AlreadyExists) => {
                match self.post_saves.remove(post_id, &user.id).await {
                    Ok(()) | Err(StoreError::NotFound) => {}
                    Err(e) => return Err(e.into()),
                }
                false
            }
            Err(e) => return Err(e.into()),
        };

        let saves = self.post_saves.count_for_subject(post_id).await?;
        Ok(SaveToggleResponse {
            is_saved_by_user: is_saved,
            saves,
        })
    }

    async fn annotate(&self, post: Post, viewer: Option<&AuthUser>) -> Result<PostResponse> {
        let (is_liked, is_saved) = match viewer {
            Some(user) => (
                Some(self.post_likes.exists(post.id, &user.id).await?),
                Some(self.post_saves.exists(post.id, &user.id).await?),
            ),
            None => (None, None),
        };

        Ok(PostResponse {
            post,
            is_liked_by_user: is_liked,
            is_saved_by_user: is_saved,
        })
    }

    async fn notify_resolved(&self, post: &Post) -> Result<()> {
        let commenters: Vec<String> = self
            .store
            .list_comments_for_post(post.id)
            .await?
            .into_iter()
            .map(|c| c.author.user_id)
            .collect();

        self.notifications.notify_resolved_status(post, &commenters).await
    }
}
