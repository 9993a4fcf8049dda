//! Friend API endpoints
//!
//! - GET /_api/friends - Accepted friends of the caller
//! - GET /_api/friends/requests - Incoming pending requests
//! - POST /_api/friends/requests - Send a friend request
//! - POST /_api/friends/requests/:id/respond - Accept or decline
//! - DELETE /_api/friends/:id - Unfriend

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::services::friend::FriendServiceError;

/// Request body for sending a friend request
#[derive(Debug, Deserialize)]
pub struct SendRequestBody {
    pub addressee_id: i64,
}

/// Request body for responding to a friend request
#[derive(Debug, Deserialize)]
pub struct RespondBody {
    pub accept: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_friends))
        .route("/requests", get(list_requests).post(send_request))
        .route("/requests/{id}/respond", post(respond))
        .route("/{id}", delete(unfriend))
}

/// GET /_api/friends - Accepted friends
async fn list_friends(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let friends = state
        .friend_service
        .list_friends(user.0.id)
        .await
        .map_err(map_friend_error)?;

    Ok(Json(friends))
}

/// GET /_api/friends/requests - Incoming pending requests
async fn list_requests(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let requests = state
        .friend_service
        .list_incoming_requests(user.0.id)
        .await
        .map_err(map_friend_error)?;

    Ok(Json(requests))
}

/// POST /_api/friends/requests - Send a friend request
async fn send_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<SendRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let request = state
        .friend_service
        .send_request(user.0.id, body.addressee_id)
        .await
        .map_err(map_friend_error)?;

    Ok((StatusCode::CREATED, Json(request)))
}

/// POST /_api/friends/requests/:id/respond - Accept or decline a request
async fn respond(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<RespondBody>,
) -> Result<impl IntoResponse, ApiError> {
    let friendship = state
        .friend_service
        .respond(id, user.0.id, body.accept)
        .await
        .map_err(map_friend_error)?;

    Ok(Json(friendship))
}

/// DELETE /_api/friends/:id - Unfriend
async fn unfriend(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .friend_service
        .unfriend(id, user.0.id)
        .await
        .map_err(map_friend_error)?;

    Ok(StatusCode::NO_CONTENT)
}

fn map_friend_error(e: FriendServiceError) -> ApiError {
    match e {
        FriendServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        FriendServiceError::NotFound(msg) => ApiError::not_found(msg),
        FriendServiceError::Forbidden(msg) => ApiError::forbidden(msg),
        FriendServiceError::Conflict(msg) => ApiError::conflict(msg),
        FriendServiceError::InternalError(e) => ApiError::internal_error(e.to_string()),
    }
}
