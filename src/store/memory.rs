use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::{ContentStore, NotificationStore, RelationStore, SettingsStore, StoreError, StoreResult};
use crate::models::{
    comment::{Comment, CommentPatch, NewComment},
    notification::{NewNotification, Notification, UserNotificationSettings},
    post::{NewPost, Post, PostFilter, PostPatch, PostSort},
};

/// 进程内存储后端。
///
/// 每个操作都在同一把锁内完成,对调用方表现为原子操作;
/// 换用持久化后端时替换这里的实现即可,服务层不感知。
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    posts: HashMap<i64, Post>,
    comments: HashMap<i64, Comment>,
    notifications: HashMap<i64, Notification>,
    settings: HashMap<String, UserNotificationSettings>,
    next_post_id: i64,
    next_comment_id: i64,
    next_notification_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn create_post(&self, new: NewPost) -> StoreResult<Post> {
        let mut state = self.state.write();
        state.next_post_id += 1;
        let post = Post {
            id: state.next_post_id,
            title: new.title,
            content: new.content,
            category: new.category,
            images: new.images,
            author: new.author,
            created_at: Utc::now(),
            updated_at: None,
            likes: 0,
            comment_count: 0,
            resolved: false,
            edit_count: 0,
        };
        state.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn get_post(&self, id: i64) -> StoreResult<Option<Post>> {
        Ok(self.state.read().posts.get(&id).cloned())
    }

    async fn list_posts(&self, filter: &PostFilter) -> StoreResult<Vec<Post>> {
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());
        let mut posts: Vec<Post> = self
            .state
            .read()
            .posts
            .values()
            .filter(|p| filter.category.map_or(true, |c| p.category == c))
            .filter(|p| {
                needle.as_ref().map_or(true, |n| {
                    p.title.to_lowercase().contains(n) || p.content.to_lowercase().contains(n)
                })
            })
            .cloned()
            .collect();

        match filter.sort {
            PostSort::Newest => {
                posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
            }
            PostSort::Oldest => {
                posts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            }
            // 最多赞优先,平局按创建时间新者在前
            PostSort::Popular => posts.sort_by(|a, b| {
                b.likes
                    .cmp(&a.likes)
                    .then(b.created_at.cmp(&a.created_at))
                    .then(b.id.cmp(&a.id))
            }),
        }

        Ok(posts)
    }

    async fn update_post_fields(&self, id: i64, patch: PostPatch) -> StoreResult<Post> {
        let mut state = self.state.write();
        let post = state.posts.get_mut(&id).ok_or(StoreError::NotFound)?;

        if let Some(title) = patch.title {
            post.title = title;
        }
        if let Some(content) = patch.content {
            post.content = content;
        }
        if let Some(category) = patch.category {
            post.category = category;
        }
        if let Some(images) = patch.images {
            post.images = images;
        }
        if let Some(resolved) = patch.resolved {
            post.resolved = resolved;
        }
        if let Some(edit_count) = patch.edit_count {
            post.edit_count = edit_count;
        }
        if let Some(updated_at) = patch.updated_at {
            post.updated_at = Some(updated_at);
        }

        Ok(post.clone())
    }

    async fn delete_post(&self, id: i64) -> StoreResult<()> {
        self.state
            .write()
            .posts
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn adjust_post_likes(&self, id: i64, delta: i64) -> StoreResult<i64> {
        let mut state = self.state.write();
        let post = state.posts.get_mut(&id).ok_or(StoreError::NotFound)?;
        post.likes = (post.likes + delta).max(0);
        Ok(post.likes)
    }

    async fn adjust_post_comment_count(&self, id: i64, delta: i64) -> StoreResult<i64> {
        let mut state = self.state.write();
        let post = state.posts.get_mut(&id).ok_or(StoreError::NotFound)?;
        post.comment_count = (post.comment_count + delta).max(0);
        Ok(post.comment_count)
    }

    async fn create_comment(&self, new: NewComment) -> StoreResult<Comment> {
        let mut state = self.state.write();
        state.next_comment_id += 1;
        let comment = Comment {
            id: state.next_comment_id,
            post_id: new.post_id,
            text: new.text,
            author: new.author,
            created_at: Utc::now(),
            likes: 0,
            edit_count: 0,
        };
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn get_comment(&self, id: i64) -> StoreResult<Option<Comment>> {
        Ok(self.state.read().comments.get(&id).cloned())
    }

    async fn list_comments_for_post(&self, post_id: i64) -> StoreResult<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .state
            .read()
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn update_comment_fields(&self, id: i64, patch: CommentPatch) -> StoreResult<Comment> {
        let mut state = self.state.write();
        let comment = state.comments.get_mut(&id).ok_or(StoreError::NotFound)?;

        if let Some(text) = patch.text {
            comment.text = text;
        }
        if let Some(edit_count) = patch.edit_count {
            comment.edit_count = edit_count;
        }

        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: i64) -> StoreResult<()> {
        self.state
            .write()
            .comments
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn delete_comments_for_post(&self, post_id: i64) -> StoreResult<Vec<i64>> {
        let mut state = self.state.write();
        let mut removed: Vec<i64> = state
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .map(|c| c.id)
            .collect();
        removed.sort_unstable();
        for id in &removed {
            state.comments.remove(id);
        }
        Ok(removed)
    }

    async fn adjust_comment_likes(&self, id: i64, delta: i64) -> StoreResult<i64> {
        let mut state = self.state.write();
        let comment = state.comments.get_mut(&id).ok_or(StoreError::NotFound)?;
        comment.likes = (comment.likes + delta).max(0);
        Ok(comment.likes)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn create(&self, new: NewNotification) -> StoreResult<Notification> {
        let mut state = self.state.write();
        state.next_notification_id += 1;
        let notification = Notification {
            id: state.next_notification_id,
            recipient_id: new.recipient_id,
            sender_id: new.sender_id,
            post_id: new.post_id,
            comment_id: new.comment_id,
            notification_type: new.notification_type,
            message: new.message,
            is_read: false,
            created_at: Utc::now(),
        };
        state.notifications.insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn get(&self, id: i64) -> StoreResult<Option<Notification>> {
        Ok(self.state.read().notifications.get(&id).cloned())
    }

    async fn list_for_recipient(&self, user_id: &str, unread_only: bool) -> StoreResult<Vec<Notification>> {
        let mut notifications: Vec<Notification> = self
            .state
            .read()
            .notifications
            .values()
            .filter(|n| n.recipient_id == user_id)
            .filter(|n| !unread_only || !n.is_read)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(notifications)
    }

    async fn unread_count(&self, user_id: &str) -> StoreResult<i64> {
        Ok(self
            .state
            .read()
            .notifications
            .values()
            .filter(|n| n.recipient_id == user_id && !n.is_read)
            .count() as i64)
    }

    async fn mark_read(&self, id: i64) -> StoreResult<Notification> {
        let mut state = self.state.write();
        let notification = state.notifications.get_mut(&id).ok_or(StoreError::NotFound)?;
        notification.is_read = true;
        Ok(notification.clone())
    }

    async fn mark_all_read(&self, user_id: &str) -> StoreResult<usize> {
        let mut state = self.state.write();
        let mut updated = 0;
        for notification in state.notifications.values_mut() {
            if notification.recipient_id == user_id && !notification.is_read {
                notification.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        self.state
            .write()
            .notifications
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get(&self, user_id: &str) -> StoreResult<Option<UserNotificationSettings>> {
        Ok(self.state.read().settings.get(user_id).cloned())
    }

    async fn upsert(&self, settings: UserNotificationSettings) -> StoreResult<UserNotificationSettings> {
        self.state
            .write()
            .settings
            .insert(settings.user_id.clone(), settings.clone());
        Ok(settings)
    }
}

/// 点赞/收藏关系行的进程内实现。唯一性靠 `HashSet` 在写锁内的
/// `insert`/`remove` 返回值保证,不存在先查后写的窗口。
#[derive(Clone, Default)]
pub struct MemoryRelationStore {
    pairs: Arc<RwLock<HashSet<(i64, String)>>>,
}

impl MemoryRelationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RelationStore for MemoryRelationStore {
    async fn exists(&self, subject_id: i64, user_id: &str) -> StoreResult<bool> {
        Ok(self.pairs.read().contains(&(subject_id, user_id.to_string())))
    }

    async fn create(&self, subject_id: i64, user_id: &str) -> StoreResult<()> {
        if !self.pairs.write().insert((subject_id, user_id.to_string())) {
            return Err(StoreError::AlreadyExists);
        }
        Ok(())
    }

    async fn remove(&self, subject_id: i64, user_id: &str) -> StoreResult<()> {
        if !self.pairs.write().remove(&(subject_id, user_id.to_string())) {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn count_for_subject(&self, subject_id: i64) -> StoreResult<i64> {
        Ok(self
            .pairs
            .read()
            .iter()
            .filter(|(subject, _)| *subject == subject_id)
            .count() as i64)
    }

    async fn remove_all_for_subject(&self, subject_id: i64) -> StoreResult<usize> {
        let mut pairs = self.pairs.write();
        let before = pairs.len();
        pairs.retain(|(subject, _)| *subject != subject_id);
        Ok(before - pairs.len())
    }

    async fn subjects_for_user(&self, user_id: &str) -> StoreResult<Vec<i64>> {
        Ok(self
            .pairs
            .read()
            .iter()
            .filter(|(_, user)| user == user_id)
            .map(|(subject, _)| *subject)
            .collect())
    }
}
