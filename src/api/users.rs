//! User profile API endpoints
//!
//! - GET /_api/users/:id - Public profile (no email)
//! - PUT /_api/users/me - Update own profile
//! - PUT /_api/users/me/password - Change own password

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::auth::UserResponse;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{UpdateProfileInput, User};
use crate::services::user::UserServiceError;

/// Public profile, email omitted
#[derive(Debug, Serialize)]
pub struct PublicProfile {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: String,
    pub bio: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for PublicProfile {
    fn from(user: User) -> Self {
        let avatar_url = user.avatar_or_fallback();
        Self {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            avatar_url,
            bio: user.bio,
            created_at: user.created_at,
        }
    }
}

/// Request body for changing the password
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/{id}", get(get_profile))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/me", put(update_profile))
        .route("/me/password", put(change_password))
}

/// GET /_api/users/:id - Public profile
async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PublicProfile>, ApiError> {
    let user = state
        .user_service
        .get_by_id(id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(user.into()))
}

/// PUT /_api/users/me - Update profile
async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<UpdateProfileInput>,
) -> Result<Json<UserResponse>, ApiError> {
    let updated = state
        .user_service
        .update_profile(user.0.id, input)
        .await
        .map_err(map_user_error)?;

    Ok(Json(updated.into()))
}

/// PUT /_api/users/me/password - Change password
async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .user_service
        .change_password(user.0.id, &body.current_password, &body.new_password)
        .await
        .map_err(map_user_error)?;

    Ok(StatusCode::NO_CONTENT)
}

fn map_user_error(e: UserServiceError) -> ApiError {
    match e {
        UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
        UserServiceError::NotFound => ApiError::not_found("User not found"),
        UserServiceError::UserExists(msg) => ApiError::conflict(msg),
        UserServiceError::InternalError(e) => ApiError::internal_error(e.to_string()),
    }
}
