//! Style combo API endpoints
//!
//! - POST /_api/style-combos - Create a combo with items
//! - GET /_api/style-combos - Paginated list, affiliate-tagged
//! - GET /_api/style-combos/:id - Combo with items by position
//! - PUT /_api/style-combos/:id - Curator only, full item replacement
//! - DELETE /_api/style-combos/:id - Curator only

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::CreateStyleComboInput;
use crate::services::style_combo::StyleComboServiceError;

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_combos))
        .route("/{id}", get(get_combo))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_combo))
        .route("/{id}", axum::routing::put(update_combo).delete(delete_combo))
}

/// POST /_api/style-combos - Create a combo
async fn create_combo(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<CreateStyleComboInput>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state
        .style_combo_service
        .create(user.0.id, input)
        .await
        .map_err(map_combo_error)?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /_api/style-combos - Paginated list, newest first
async fn list_combos(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = pagination.clamped();
    let combos = state
        .style_combo_service
        .list(limit, offset)
        .await
        .map_err(map_combo_error)?;

    Ok(Json(combos))
}

/// GET /_api/style-combos/:id - Combo with items
async fn get_combo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let combo = state
        .style_combo_service
        .get(id)
        .await
        .map_err(map_combo_error)?;

    Ok(Json(combo))
}

/// PUT /_api/style-combos/:id - Replace a combo and its items
async fn update_combo(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<CreateStyleComboInput>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .style_combo_service
        .update(id, user.0.id, input)
        .await
        .map_err(map_combo_error)?;

    Ok(Json(updated))
}

/// DELETE /_api/style-combos/:id - Delete a combo
async fn delete_combo(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .style_combo_service
        .delete(id, user.0.id)
        .await
        .map_err(map_combo_error)?;

    Ok(StatusCode::NO_CONTENT)
}

fn map_combo_error(e: StyleComboServiceError) -> ApiError {
    match e {
        StyleComboServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        StyleComboServiceError::NotFound => ApiError::not_found("Style combo not found"),
        StyleComboServiceError::Forbidden(msg) => ApiError::forbidden(msg),
        StyleComboServiceError::InternalError(e) => ApiError::internal_error(e.to_string()),
    }
}
