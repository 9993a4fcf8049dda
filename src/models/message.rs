//! Conversation and message models
//!
//! Read receipts live on the message as a JSON array of user ids
//! (`read_by`). A message is unread for a user when they are neither the
//! sender nor a member of that array.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conversation between two users.
///
/// The pair is stored ordered (`user_a_id < user_b_id`) so the UNIQUE
/// constraint catches both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub user_a_id: i64,
    pub user_b_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Normalize a user pair into storage order
    pub fn ordered_pair(x: i64, y: i64) -> (i64, i64) {
        if x <= y {
            (x, y)
        } else {
            (y, x)
        }
    }

    /// The other participant, from `user_id`'s point of view
    pub fn other_user(&self, user_id: i64) -> i64 {
        if self.user_a_id == user_id {
            self.user_b_id
        } else {
            self.user_a_id
        }
    }

    /// Whether `user_id` participates in this conversation
    pub fn involves(&self, user_id: i64) -> bool {
        self.user_a_id == user_id || self.user_b_id == user_id
    }
}

/// Message entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub body: String,
    /// User ids that have read this message, persisted as a JSON text column
    pub read_by: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Whether this message counts as unread for `user_id`
    pub fn is_unread_for(&self, user_id: i64) -> bool {
        self.sender_id != user_id && !self.read_by.contains(&user_id)
    }
}

/// Conversation list entry with the other participant and unread count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: i64,
    pub other_user_id: i64,
    pub other_user_name: String,
    pub other_user_avatar: String,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: i64,
}
