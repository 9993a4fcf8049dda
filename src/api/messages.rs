//! Direct message API endpoints
//!
//! - GET /_api/messages/conversations - Conversation list with previews
//! - POST /_api/messages/conversations - Open a conversation with a friend
//! - GET /_api/messages/conversations/:id - Message page (marks read)
//! - POST /_api/messages/conversations/:id - Send a message
//! - GET /_api/messages/unread-count - Unread badge count

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::services::message::MessageServiceError;

/// Request body for opening a conversation
#[derive(Debug, Deserialize)]
pub struct StartConversationBody {
    pub user_id: i64,
}

/// Request body for sending a message
#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
    pub body: String,
}

#[derive(Debug, Serialize)]
struct UnreadCountResponse {
    unread: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/conversations",
            get(list_conversations).post(start_conversation),
        )
        .route(
            "/conversations/{id}",
            get(get_messages).post(send_message),
        )
        .route("/unread-count", get(unread_count))
}

/// GET /_api/messages/conversations - Conversation list
async fn list_conversations(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let conversations = state
        .message_service
        .list_conversations(user.0.id)
        .await
        .map_err(map_message_error)?;

    Ok(Json(conversations))
}

/// POST /_api/messages/conversations - Get-or-create a conversation
async fn start_conversation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<StartConversationBody>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation = state
        .message_service
        .start_conversation(user.0.id, body.user_id)
        .await
        .map_err(map_message_error)?;

    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /_api/messages/conversations/:id - Message page, oldest first
///
/// Fetched messages become read for the caller.
async fn get_messages(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = pagination.clamped();
    let messages = state
        .message_service
        .get_messages(id, user.0.id, limit, offset)
        .await
        .map_err(map_message_error)?;

    Ok(Json(messages))
}

/// POST /_api/messages/conversations/:id - Send a message
async fn send_message(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<SendMessageBody>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .message_service
        .send_message(id, user.0.id, &body.body)
        .await
        .map_err(map_message_error)?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /_api/messages/unread-count - Total unread messages
async fn unread_count(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let unread = state
        .message_service
        .unread_count(user.0.id)
        .await
        .map_err(map_message_error)?;

    Ok(Json(UnreadCountResponse { unread }))
}

fn map_message_error(e: MessageServiceError) -> ApiError {
    match e {
        MessageServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        MessageServiceError::NotFound(msg) => ApiError::not_found(msg),
        MessageServiceError::Forbidden(msg) => ApiError::forbidden(msg),
        MessageServiceError::InternalError(e) => ApiError::internal_error(e.to_string()),
    }
}
