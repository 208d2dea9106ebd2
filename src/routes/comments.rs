use crate::{
    error::{AppError, Result},
    models::comment::*,
    state::AppState,
    utils::middleware::OptionalAuth,
};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_comment))
        .route("/post/:post_id", get(get_post_comments))
        .route("/:id", axum::routing::put(update_comment).delete(delete_comment))
        .route("/:id/like", post(toggle_like))
}

/// 帖子下的评论列表
/// GET /api/feed/comments/post/:post_id
async fn get_post_comments(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<i64>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let comments = state
        .comment_service
        .list_post_comments(post_id, user.as_ref())
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": comments
    })))
}

/// 发表评论
/// POST /api/feed/comments
async fn create_comment(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<CreateCommentRequest>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let comment = state.comment_service.create_comment(&user, request).await?;

    Ok(Json(json!({
        "success": true,
        "data": comment
    })))
}

/// 编辑评论 (仅作者)
/// PUT /api/feed/comments/:id
async fn update_comment(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(comment_id): Path<i64>,
    Json(request): Json<UpdateCommentRequest>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let comment = state
        .comment_service
        .update_comment(comment_id, &user, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": comment
    })))
}

/// 删除评论 (作者或版主)
/// DELETE /api/feed/comments/:id
async fn delete_comment(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(comment_id): Path<i64>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    state.comment_service.delete_comment(comment_id, &user).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Comment deleted successfully"
    })))
}

/// 评论点赞开关
/// POST /api/feed/comments/:id/like
async fn toggle_like(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(comment_id): Path<i64>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let result = state.comment_service.toggle_like(comment_id, &user).await?;

    Ok(Json(json!({
        "success": true,
        "data": result
    })))
}
