//! Post and voting API endpoints
//!
//! - POST /_api/posts - Create a post
//! - GET /_api/posts/feed - Voting feed
//! - GET /_api/posts/:id - Single post with vote totals
//! - DELETE /_api/posts/:id - Delete own post
//! - POST /_api/posts/:id/vote - Cast or change a vote
//! - DELETE /_api/posts/:id/vote - Retract a vote

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CreatePostInput, VoteValue};
use crate::services::post::PostServiceError;

/// Request body for casting a vote
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    /// 1 for hot, -1 for not
    pub value: i32,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/{id}", get(get_post))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_post))
        .route("/feed", get(get_feed))
        .route("/{id}", delete(delete_post))
        .route("/{id}/vote", post(cast_vote).delete(retract_vote))
}

/// POST /_api/posts - Create a post
async fn create_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<CreatePostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state
        .post_service
        .create(user.0.id, input)
        .await
        .map_err(map_post_error)?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /_api/posts/feed - Paginated voting feed
///
/// Excludes the caller's own posts and posts they already voted on.
async fn get_feed(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(pagination): Query<PaginationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = pagination.clamped();
    let posts = state
        .post_service
        .feed(user.0.id, limit, offset)
        .await
        .map_err(map_post_error)?;

    Ok(Json(posts))
}

/// GET /_api/posts/:id - Single post
///
/// Auth is optional; the viewer's own vote is included when present.
async fn get_post(
    State(state): State<AppState>,
    viewer: Option<Extension<AuthenticatedUser>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer_id = viewer.map(|Extension(u)| u.0.id);
    let post = state
        .post_service
        .get(id, viewer_id)
        .await
        .map_err(map_post_error)?;

    Ok(Json(post))
}

/// DELETE /_api/posts/:id - Delete own post
async fn delete_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .post_service
        .delete(id, user.0.id)
        .await
        .map_err(map_post_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /_api/posts/:id/vote - Cast or change a vote
async fn cast_vote(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let value = VoteValue::from_i32(body.value)
        .ok_or_else(|| ApiError::validation_error("Vote value must be 1 or -1"))?;

    let post = state
        .post_service
        .vote(id, user.0.id, value)
        .await
        .map_err(map_post_error)?;

    Ok(Json(post))
}

/// DELETE /_api/posts/:id/vote - Retract a vote
async fn retract_vote(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .post_service
        .retract_vote(id, user.0.id)
        .await
        .map_err(map_post_error)?;

    Ok(Json(post))
}

fn map_post_error(e: PostServiceError) -> ApiError {
    match e {
        PostServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        PostServiceError::NotFound => ApiError::not_found("Post not found"),
        PostServiceError::Forbidden(msg) => ApiError::forbidden(msg),
        PostServiceError::InternalError(e) => ApiError::internal_error(e.to_string()),
    }
}
