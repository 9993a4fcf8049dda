//! Friend model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Friend request / friendship status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FriendStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
}

impl std::fmt::Display for FriendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Accepted => write!(f, "accepted"),
            Self::Declined => write!(f, "declined"),
        }
    }
}

impl std::str::FromStr for FriendStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            _ => Err(anyhow::anyhow!("Invalid friend status: {}", s)),
        }
    }
}

/// Friend row: a directed request that becomes a friendship when accepted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friend {
    pub id: i64,
    pub requester_id: i64,
    pub addressee_id: i64,
    pub status: FriendStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Friend {
    /// The other participant, from `user_id`'s point of view
    pub fn other_user(&self, user_id: i64) -> i64 {
        if self.requester_id == user_id {
            self.addressee_id
        } else {
            self.requester_id
        }
    }

    /// Whether `user_id` participates in this row
    pub fn involves(&self, user_id: i64) -> bool {
        self.requester_id == user_id || self.addressee_id == user_id
    }
}

/// Accepted friend, joined with the friend's public profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendView {
    pub friendship_id: i64,
    pub user_id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: String,
    pub since: DateTime<Utc>,
}

/// Incoming pending request, joined with the requester's public profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequestView {
    pub request_id: i64,
    pub requester_id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: String,
    pub sent_at: DateTime<Utc>,
}
