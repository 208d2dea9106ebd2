use crate::{
    error::{AppError, Result},
    models::notification::*,
    state::AppState,
    utils::middleware::OptionalAuth,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read-all", put(mark_all_read))
        .route("/broadcast", post(broadcast_alert))
        .route("/settings", get(get_settings).put(update_settings))
        .route("/:id/read", put(mark_read))
        .route("/:id", delete(delete_notification))
}

/// 当前用户的通知,最新在前
/// GET /api/feed/notifications?unread=true
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let notifications = state
        .notification_service
        .list_for(&user.id, query.unread.unwrap_or(false))
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": notifications
    })))
}

/// GET /api/feed/notifications/unread-count
async fn unread_count(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let count = state.notification_service.unread_count(&user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "unread": count }
    })))
}

/// 标记单条已读
/// PUT /api/feed/notifications/:id/read
async fn mark_read(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let notification = state.notification_service.mark_read(id, &user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": notification
    })))
}

/// 全部标记已读
/// PUT /api/feed/notifications/read-all
async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let updated = state.notification_service.mark_all_read(&user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "updated": updated }
    })))
}

/// 删除通知 (仅接收者)
/// DELETE /api/feed/notifications/:id
async fn delete_notification(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    state.notification_service.delete(id, &user.id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Notification deleted successfully"
    })))
}

/// 紧急广播,仅限版主;接收者名单由调用方给出
/// POST /api/feed/notifications/broadcast
async fn broadcast_alert(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<BroadcastRequest>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;
    if !user.is_moderator() {
        return Err(AppError::forbidden("Moderator role required"));
    }

    request.validate().map_err(AppError::ValidatorError)?;

    let sent = state
        .notification_service
        .broadcast_alert(&request.recipient_ids, &request.message)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": { "sent": sent }
    })))
}

/// 当前用户的通知设置,缺省全部开启
/// GET /api/feed/notifications/settings
async fn get_settings(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let settings = state.settings_service.get_settings(&user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": settings
    })))
}

/// 更新通知设置
/// PUT /api/feed/notifications/settings
async fn update_settings(
    State(state): State<Arc<AppState>>,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<UpdateNotificationSettingsRequest>,
) -> Result<Json<Value>> {
    let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;

    let settings = state
        .settings_service
        .update_settings(&user.id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": settings
    })))
}
