pub mod auth;
pub mod comment;
pub mod notification;
pub mod post;
pub mod settings;

// 重新导出常用类型
pub use auth::AuthService;
pub use comment::CommentService;
pub use notification::NotificationService;
pub use post::PostService;
pub use settings::SettingsService;
