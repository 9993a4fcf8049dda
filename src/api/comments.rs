//! Comment API endpoints
//!
//! - GET /_api/comments/:post_id - Threaded comments for a post
//! - POST /_api/comments - Create a comment or reply
//! - DELETE /_api/comments/:id - Delete (author or post owner)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::CreateCommentInput;
use crate::services::comment::CommentServiceError;

pub fn public_router() -> Router<AppState> {
    Router::new().route("/{id}", get(get_comments))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_comment))
        .route("/{id}", delete(delete_comment))
}

/// GET /_api/comments/:post_id - Threaded comments, top-level with replies
async fn get_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = state
        .comment_service
        .get_by_post(post_id)
        .await
        .map_err(map_comment_error)?;

    Ok(Json(comments))
}

/// POST /_api/comments - Create a comment
async fn create_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<CreateCommentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state
        .comment_service
        .create(user.0.id, input)
        .await
        .map_err(map_comment_error)?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// DELETE /_api/comments/:id - Delete a comment
async fn delete_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .comment_service
        .delete(id, user.0.id)
        .await
        .map_err(map_comment_error)?;

    Ok(StatusCode::NO_CONTENT)
}

fn map_comment_error(e: CommentServiceError) -> ApiError {
    match e {
        CommentServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        CommentServiceError::NotFound(msg) => ApiError::not_found(msg),
        CommentServiceError::Forbidden(msg) => ApiError::forbidden(msg),
        CommentServiceError::InternalError(e) => ApiError::internal_error(e.to_string()),
    }
}
