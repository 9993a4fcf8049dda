//! AI stylist API endpoints
//!
//! - POST /_api/stylist/recommendations - Vision analysis into a StyleProfile
//! - POST /_api/stylist/match-combos - Rank combos by embedding similarity

use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::services::stylist::{RecommendationInput, StyleProfile, StylistServiceError};

/// Request body for the combo matcher
#[derive(Debug, Deserialize)]
pub struct MatchCombosRequest {
    pub profile: StyleProfile,
    /// Top-N cutoff, defaults to 5
    pub limit: Option<usize>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recommendations", post(recommend))
        .route("/match-combos", post(match_combos))
}

/// POST /_api/stylist/recommendations - Analyze a selfie into a style profile
async fn recommend(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(input): Json<RecommendationInput>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .stylist_service
        .recommend(input)
        .await
        .map_err(map_stylist_error)?;

    Ok(Json(profile))
}

/// POST /_api/stylist/match-combos - Rank style combos against a profile
async fn match_combos(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(body): Json<MatchCombosRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ranked = state
        .stylist_service
        .match_combos(&body.profile, body.limit)
        .await
        .map_err(map_stylist_error)?;

    Ok(Json(ranked))
}

fn map_stylist_error(e: StylistServiceError) -> ApiError {
    match e {
        StylistServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        // Provider messages are already sanitized at the service boundary
        StylistServiceError::ProviderError(msg) => ApiError::bad_gateway(msg),
        StylistServiceError::InternalError(e) => ApiError::internal_error(e.to_string()),
    }
}
