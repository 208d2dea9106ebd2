pub mod comments;
pub mod notifications;
pub mod posts;
