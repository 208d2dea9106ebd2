use std::sync::Arc;

use crate::{
    config::Config,
    services::{AuthService, CommentService, NotificationService, PostService, SettingsService},
    store::{MemoryRelationStore, MemoryStore},
};

/// 应用程序的共享状态
/// 包含所有服务和配置的引用
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Config,

    /// 认证服务
    pub auth_service: AuthService,

    /// 帖子服务
    pub post_service: PostService,

    /// 评论服务
    pub comment_service: CommentService,

    /// 通知服务
    pub notification_service: NotificationService,

    /// 通知设置服务
    pub settings_service: SettingsService,
}

impl AppState {
    /// 以进程内存储后端组装全部服务。
    /// 换用持久化后端时只需在这里替换各个存储实现
    pub fn new(config: Config) -> Arc<Self> {
        let store = Arc::new(MemoryStore::new());
        let post_likes = Arc::new(MemoryRelationStore::new());
        let post_saves = Arc::new(MemoryRelationStore::new());
        let comment_likes = Arc::new(MemoryRelationStore::new());

        let auth_service = AuthService::new(&config);
        let settings_service = SettingsService::new(store.clone());
        let notification_service = NotificationService::new(store.clone(), settings_service.clone());
        let post_service = PostService::new(
            config.clone(),
            store.clone(),
            post_likes,
            post_saves,
            comment_likes.clone(),
            notification_service.clone(),
        );
        let comment_service = CommentService::new(store, comment_likes, notification_service.clone());

        Arc::new(Self {
            config,
            auth_service,
            post_service,
            comment_service,
            notification_service,
            settings_service,
        })
    }
}
