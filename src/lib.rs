use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;

use crate::state::AppState;

/// 组装完整的 axum 应用:资源路由加上认证/限流/观测等中间件层
pub fn app(state: Arc<AppState>) -> Router {
    // 配置 CORS
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(
            state
                .config
                .cors_allowed_origins
                .split(',')
                .filter_map(|origin| origin.trim().parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        );

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .nest("/api/feed/posts", routes::posts::router())
        .nest("/api/feed/comments", routes::comments::router())
        .nest("/api/feed/notifications", routes::notifications::router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            utils::middleware::auth_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            utils::middleware::rate_limit_middleware,
        ))
        .layer(axum::middleware::from_fn(utils::middleware::request_id_middleware))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "Campus-Feed is running!"
}
