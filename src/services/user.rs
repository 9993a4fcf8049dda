//! User service
//!
//! Registration, login, session management, and profile updates. Sessions
//! are opaque UUID tokens stored server-side with a 30-day default
//! lifetime; validation lazily deletes expired rows.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, UpdateProfileInput, User};
use crate::services::password::{hash_password, verify_password};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 30;

/// Minimum accepted password length
const MIN_PASSWORD_LENGTH: usize = 8;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// User already exists
    #[error("User already exists: {0}")]
    UserExists(String),

    /// User not found
    #[error("User not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
        }
    }

    /// Create a user service with a custom session lifetime
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Register a new user and open their first session.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for empty or malformed fields and short passwords
    /// - `UserExists` when the username or email is taken
    /// - `InternalError` for database errors
    pub async fn register(
        &self,
        input: RegisterInput,
    ) -> Result<(User, Session), UserServiceError> {
        self.validate_register_input(&input)?;

        if self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Username '{}' is already taken",
                input.username
            )));
        }

        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                input.email
            )));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(input.username, input.email, password_hash);

        let created_user = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        let session = self.create_session(created_user.id).await?;

        Ok((created_user, session))
    }

    /// Login with username-or-email plus password.
    ///
    /// Returns the user together with a fresh session. The error message is
    /// deliberately the same for unknown users and wrong passwords.
    pub async fn login(&self, input: LoginInput) -> Result<(User, Session), UserServiceError> {
        let user = self
            .find_user_by_username_or_email(&input.username_or_email)
            .await?
            .ok_or_else(|| {
                UserServiceError::AuthenticationError("Invalid username or password".to_string())
            })?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;

        if !password_valid {
            return Err(UserServiceError::AuthenticationError(
                "Invalid username or password".to_string(),
            ));
        }

        let session = self.create_session(user.id).await?;
        Ok((user, session))
    }

    /// Logout (invalidate session). Deleting a nonexistent session is fine.
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    /// Validate a session token and return the associated user.
    ///
    /// Expired sessions are deleted on sight and validate to `None`.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            let _ = self.session_repo.delete(token).await;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;

        Ok(user)
    }

    /// Update profile fields. Empty strings clear optional fields.
    pub async fn update_profile(
        &self,
        user_id: i64,
        input: UpdateProfileInput,
    ) -> Result<User, UserServiceError> {
        let mut user = self
            .user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::NotFound)?;

        if let Some(display_name) = input.display_name {
            user.display_name = normalize_optional(display_name);
        }
        if let Some(avatar_url) = input.avatar_url {
            if let Some(url) = &normalize_optional(avatar_url.clone()) {
                if !is_http_url(url) {
                    return Err(UserServiceError::ValidationError(
                        "Avatar URL must be an http(s) URL".to_string(),
                    ));
                }
            }
            user.avatar_url = normalize_optional(avatar_url);
        }
        if let Some(bio) = input.bio {
            user.bio = normalize_optional(bio);
        }

        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update user")?;

        Ok(updated)
    }

    /// Change password after verifying the current one. All other sessions
    /// stay valid; the cookie token is not rotated here.
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), UserServiceError> {
        if new_password.len() < MIN_PASSWORD_LENGTH {
            return Err(UserServiceError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let mut user = self
            .user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::NotFound)?;

        let valid = verify_password(current_password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            return Err(UserServiceError::AuthenticationError(
                "Current password is incorrect".to_string(),
            ));
        }

        user.password_hash =
            hash_password(new_password).context("Failed to hash new password")?;
        self.user_repo
            .update(&user)
            .await
            .context("Failed to update password")?;

        Ok(())
    }

    /// Delete all expired sessions; called periodically from a sweep task.
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;

        Ok(count)
    }

    fn validate_register_input(&self, input: &RegisterInput) -> Result<(), UserServiceError> {
        if input.username.trim().is_empty() {
            return Err(UserServiceError::ValidationError(
                "Username cannot be empty".to_string(),
            ));
        }

        if input.username.len() > 50 {
            return Err(UserServiceError::ValidationError(
                "Username must be at most 50 characters".to_string(),
            ));
        }

        if input.email.trim().is_empty() || !input.email.contains('@') {
            return Err(UserServiceError::ValidationError(
                "Invalid email format".to_string(),
            ));
        }

        if input.password.len() < MIN_PASSWORD_LENGTH {
            return Err(UserServiceError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        Ok(())
    }

    async fn find_user_by_username_or_email(
        &self,
        username_or_email: &str,
    ) -> Result<Option<User>, UserServiceError> {
        if let Some(user) = self
            .user_repo
            .get_by_username(username_or_email)
            .await
            .context("Failed to get user by username")?
        {
            return Ok(Some(user));
        }

        let user = self
            .user_repo
            .get_by_email(username_or_email)
            .await
            .context("Failed to get user by email")?;

        Ok(user)
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(self.session_expiration_days),
            created_at: now,
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(created)
    }
}

fn normalize_optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Input for user registration
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterInput {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Input for user login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(username_or_email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username_or_email: username_or_email.into(),
            password: password.into(),
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::services::password::{hash_password, verify_password};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    async fn setup_property_test_service() -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
        )
    }

    fn unique_suffix() -> u64 {
        TEST_COUNTER.fetch_add(1, Ordering::SeqCst)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// For any valid credentials, login returns a token that validates
        /// back to the same user.
        #[test]
        fn property_auth_roundtrip(
            username in "[a-z]{3,10}",
            email_prefix in "[a-z]{3,10}",
            password in "[a-zA-Z0-9!@#$%^&*]{8,20}"
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), TestCaseError> = rt.block_on(async {
                let service = setup_property_test_service().await;
                let suffix = unique_suffix();

                let unique_username = format!("{}_{}", username, suffix);
                let unique_email = format!("{}_{}@example.com", email_prefix, suffix);

                let (registered, _) = service
                    .register(RegisterInput::new(
                        unique_username.clone(),
                        unique_email,
                        password.clone(),
                    ))
                    .await
                    .expect("Registration should succeed");

                let (_, session) = service
                    .login(LoginInput::new(unique_username, password))
                    .await
                    .expect("Login should succeed with valid credentials");

                let validated = service
                    .validate_session(&session.id)
                    .await
                    .expect("Session validation should not error")
                    .expect("Session should be valid");

                prop_assert_eq!(validated.id, registered.id);
                prop_assert_eq!(validated.username, registered.username);
                Ok(())
            });
            result?;
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// For any password, the stored hash differs from the plaintext,
        /// verifies only for the right password, and salts independently.
        #[test]
        fn property_password_secure_storage(
            password in "[a-zA-Z0-9!@#$%^&*()_+-=]{8,50}"
        ) {
            let hash = hash_password(&password).expect("hash");

            prop_assert_ne!(&hash, &password);
            prop_assert!(hash.starts_with("$argon2id$"));

            prop_assert!(verify_password(&password, &hash).expect("verify"));
            let wrong = format!("{}wrong", password);
            prop_assert!(!verify_password(&wrong, &hash).expect("verify"));

            let hash2 = hash_password(&password).expect("hash");
            prop_assert_ne!(&hash, &hash2);
        }
    }
}
