//! Authentication API endpoints
//!
//! Handles HTTP requests for user authentication:
//! - POST /_api/auth/register - User registration
//! - POST /_api/auth/login - User login (rate limited)
//! - POST /_api/auth/logout - User logout
//! - GET /_api/auth/me - Get current user

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::User;
use crate::services::user::{LoginInput, RegisterInput, UserServiceError};

/// Request body for user registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Response for the authenticated user's own info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: String,
    pub bio: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let avatar_url = user.avatar_or_fallback();
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            avatar_url,
            bio: user.bio,
            created_at: user.created_at,
        }
    }
}

/// Public routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Protected routes (auth required)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
}

fn session_cookie(session_id: &str, lifetime_days: i64) -> Result<HeaderValue, ApiError> {
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session_id,
        lifetime_days * 24 * 60 * 60
    );
    HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::internal_error(format!("Invalid cookie value: {}", e)))
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// POST /_api/auth/register - User registration
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = RegisterInput::new(body.username, body.email, body.password);

    let (user, session) = state.user_service.register(input).await.map_err(|e| match e {
        UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        UserServiceError::UserExists(msg) => ApiError::conflict(msg),
        other => ApiError::internal_error(other.to_string()),
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session_cookie(&session.id, state.session_lifetime_days)?,
    );

    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    ))
}

/// POST /_api/auth/login - User login
///
/// Rate limited per username (5 failures / 15 min) and per IP (10 req / min).
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // IP rate limit (10 requests per minute)
    if let Some(ip) = extract_ip_address(&headers).and_then(|s| s.parse().ok()) {
        if state.rate_limiter.is_ip_limited(ip).await {
            return Err(ApiError::rate_limited("Too many requests, slow down", 60));
        }
        state.rate_limiter.record_ip_request(ip).await;
    }

    // Username rate limit (5 failed attempts per 15 minutes)
    if state
        .rate_limiter
        .is_username_limited(&body.username_or_email)
        .await
    {
        let retry_after = state
            .rate_limiter
            .username_retry_after(&body.username_or_email)
            .await;
        return Err(ApiError::rate_limited(
            "Too many failed login attempts, try again later",
            retry_after,
        ));
    }

    let input = LoginInput::new(body.username_or_email.clone(), body.password);

    let (user, session) = match state.user_service.login(input).await {
        Ok(ok) => ok,
        Err(UserServiceError::AuthenticationError(_)) => {
            state
                .rate_limiter
                .record_failed_attempt(&body.username_or_email)
                .await;
            return Err(ApiError::unauthorized("Invalid username or password"));
        }
        Err(e) => return Err(ApiError::internal_error(e.to_string())),
    };

    state
        .rate_limiter
        .clear_username_attempts(&body.username_or_email)
        .await;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        session_cookie(&session.id, state.session_lifetime_days)?,
    );

    Ok((
        response_headers,
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    ))
}

/// POST /_api/auth/logout - User logout
async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| {
            s.split(';')
                .map(str::trim)
                .find_map(|c| c.strip_prefix("session="))
                .map(String::from)
        })
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
                .map(String::from)
        });

    if let Some(token) = token {
        state
            .user_service
            .logout(&token)
            .await
            .map_err(|e| ApiError::internal_error(e.to_string()))?;
    }

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::SET_COOKIE, clear_session_cookie());

    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /_api/auth/me - Current user
async fn get_current_user(user: AuthenticatedUser) -> Json<UserResponse> {
    Json(user.0.into())
}

/// Extract client IP address from proxy headers
fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            // First hop in the list is the client
            if let Some(ip) = forwarded_str.split(',').next() {
                return Some(ip.trim().to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(extract_ip_address(&headers).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_extract_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(extract_ip_address(&headers).as_deref(), Some("198.51.100.2"));
    }

    #[test]
    fn test_extract_ip_none_without_headers() {
        assert!(extract_ip_address(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_session_cookie_format() {
        let value = session_cookie("abc123", 30).unwrap();
        let s = value.to_str().unwrap();
        assert!(s.starts_with("session=abc123;"));
        assert!(s.contains("HttpOnly"));
        assert!(s.contains(&format!("Max-Age={}", 30 * 24 * 60 * 60)));
    }
}
