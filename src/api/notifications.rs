//! Notification API endpoints
//!
//! - GET /_api/notifications - Newest first, paginated, `unread_only` filter
//! - GET /_api/notifications/unread-count
//! - POST /_api/notifications/:id/read - Recipient only
//! - POST /_api/notifications/read-all

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::default_limit;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};

/// Query parameters for the notification list
#[derive(Debug, Deserialize)]
pub struct NotificationListQuery {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Serialize)]
struct UnreadCountResponse {
    unread: i64,
}

#[derive(Debug, Serialize)]
struct MarkAllReadResponse {
    marked: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/{id}/read", post(mark_read))
        .route("/read-all", post(mark_all_read))
}

/// GET /_api/notifications - List notifications
async fn list_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<NotificationListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);

    let notifications = state
        .notification_service
        .list(user.0.id, query.unread_only, limit, offset)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(notifications))
}

/// GET /_api/notifications/unread-count
async fn unread_count(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let unread = state
        .notification_service
        .unread_count(user.0.id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(UnreadCountResponse { unread }))
}

/// POST /_api/notifications/:id/read - Mark one read
async fn mark_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let marked = state
        .notification_service
        .mark_read(id, user.0.id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    if !marked {
        return Err(ApiError::not_found("Notification not found"));
    }

    Ok(Json(serde_json::json!({ "read": true })))
}

/// POST /_api/notifications/read-all - Mark everything read
async fn mark_all_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let marked = state
        .notification_service
        .mark_all_read(user.0.id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(MarkAllReadResponse { marked }))
}
