use crate::{
    error::{AppError, Result},
    models::post::*,
    state::AppState,
    utils::middleware::OptionalAuth,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/saved", get(list_saved_posts))
        .route("/:id", get(get_post).put(update_post).delete(delete_post))
        .route("/:id/like", post(toggle_like))
        .route("/:id/save", post(toggle_save))
}

/// 获取帖子列表
/// GET /api/feed/posts?category&search&sort
async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PostQuery>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    debug!("Fetching posts list with query: {:?}", query);

    let posts = state.post_service.list_posts(query, user.as_ref()).await?;

    Ok(Json(json!({
        "success": true,
        "data": posts
    })))
}

/// 发布新帖子
/// POST /api/feed/posts
async fn create_post(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<CreatePostRequest>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let created = state.post_service.create_post(&user, request).await?;

    Ok(Json(json!({
        "success": true,
        "data": created
    })))
}

/// 当前用户收藏的帖子
/// GET /api/feed/posts/saved
async fn list_saved_posts(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let posts = state.post_service.list_saved_posts(&user).await?;

    Ok(Json(json!({
        "success": true,
        "data": posts
    })))
}

/// 获取单个帖子
/// GET /api/feed/posts/:id
async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<i64>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let post = state.post_service.get_post(post_id, user.as_ref()).await?;

    Ok(Json(json!({
        "success": true,
        "data": post
    })))
}

/// 更新帖子 (仅作者)
/// PUT /api/feed/posts/:id
async fn update_post(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(post_id): Path<i64>,
    Json(request): Json<UpdatePostRequest>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let updated = state.post_service.update_post(post_id, &user, request).await?;

    Ok(Json(json!({
        "success": true,
        "data": updated
    })))
}

/// 删除帖子 (作者或版主),级联清理评论与关系行
/// DELETE /api/feed/posts/:id
async fn delete_post(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(post_id): Path<i64>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    state.post_service.delete_post(post_id, &user).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Post deleted successfully"
    })))
}

/// 点赞开关
/// POST /api/feed/posts/:id/like
async fn toggle_like(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(post_id): Path<i64>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let result = state.post_service.toggle_like(post_id, &user).await?;

    Ok(Json(json!({
        "success": true,
        "data": result
    })))
}

/// 收藏开关
/// POST /api/feed/posts/:id/save
async fn toggle_save(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(post_id): Path<i64>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let result = state.post_service.toggle_save(post_id, &user).await?;

    Ok(Json(json!({
        "success": true,
        "data": result
    })))
}
