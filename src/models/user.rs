//! User model
//!
//! Defines the User entity for the GlamScan backend. Passwords are stored
//! as Argon2id hashes and never serialized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity representing a registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Display name shown on posts and combos
    pub display_name: Option<String>,
    /// Avatar image URL
    pub avatar_url: Option<String>,
    /// Short profile bio
    pub bio: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// The password must already be hashed; use
    /// `services::password::hash_password()`.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            password_hash,
            display_name: None,
            avatar_url: None,
            bio: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Name to display publicly, falling back to the username
    pub fn public_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.username)
    }

    /// Avatar URL with a gravatar-style fallback derived from the email
    pub fn avatar_or_fallback(&self) -> String {
        match &self.avatar_url {
            Some(url) if !url.trim().is_empty() => url.clone(),
            _ => {
                let hash = format!("{:x}", md5::compute(self.email.trim().to_lowercase()));
                format!("https://www.gravatar.com/avatar/{}?d=mp&s=160", hash)
            }
        }
    }
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    /// Username
    pub username: String,
    /// Email address
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
}

/// Input for updating a user's profile
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileInput {
    /// New display name (empty string clears it)
    pub display_name: Option<String>,
    /// New avatar URL (empty string clears it)
    pub avatar_url: Option<String>,
    /// New bio (empty string clears it)
    pub bio: Option<String>,
}
