//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comment entity
///
/// Threading is self-referential through `parent_id` and surfaced as one
/// level of nested replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Comment with author info and nested replies for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithMeta {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub author_name: String,
    pub avatar_url: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub replies: Vec<CommentWithMeta>,
}

/// Input for creating a comment
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub content: String,
}
