//! Saved item (bookmark) API endpoints
//!
//! - GET /_api/saved-items - Caller's bookmarks, optional type filter
//! - POST /_api/saved-items - Save a post or combo (idempotent)
//! - DELETE /_api/saved-items - Unsave by (type, id)

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::SavedTargetType;
use crate::services::saved_item::SavedItemServiceError;

/// Query parameters for listing bookmarks
#[derive(Debug, Deserialize)]
pub struct SavedListQuery {
    pub target_type: Option<SavedTargetType>,
}

/// Request body for saving or unsaving
#[derive(Debug, Deserialize)]
pub struct SavedItemBody {
    pub target_type: SavedTargetType,
    pub target_id: i64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_saved).post(save_item).delete(unsave_item))
}

/// GET /_api/saved-items - List bookmarks
async fn list_saved(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<SavedListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state
        .saved_item_service
        .list(user.0.id, query.target_type)
        .await
        .map_err(map_saved_error)?;

    Ok(Json(items))
}

/// POST /_api/saved-items - Save a post or combo
async fn save_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<SavedItemBody>,
) -> Result<impl IntoResponse, ApiError> {
    let saved = state
        .saved_item_service
        .save(user.0.id, body.target_type, body.target_id)
        .await
        .map_err(map_saved_error)?;

    Ok((StatusCode::CREATED, Json(saved)))
}

/// DELETE /_api/saved-items - Remove a bookmark
async fn unsave_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<SavedItemBody>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .saved_item_service
        .unsave(user.0.id, body.target_type, body.target_id)
        .await
        .map_err(map_saved_error)?;

    if !removed {
        return Err(ApiError::not_found("Nothing saved for that target"));
    }

    Ok(StatusCode::NO_CONTENT)
}

fn map_saved_error(e: SavedItemServiceError) -> ApiError {
    match e {
        SavedItemServiceError::TargetNotFound => ApiError::not_found("Target not found"),
        SavedItemServiceError::InternalError(e) => ApiError::internal_error(e.to_string()),
    }
}
