//! Post and vote models
//!
//! Posts are the unit of the hot-or-not feed: an image with an optional
//! caption and shoppable product tags. Votes are one row per (post, user),
//! updated in place when a user changes their mind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A shoppable product tag attached to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTag {
    /// Short label, e.g. "vintage denim jacket"
    pub label: String,
    /// Shopping URL
    pub url: String,
}

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub image_url: String,
    pub caption: Option<String>,
    /// Product tags, persisted as a JSON text column
    pub product_tags: Vec<ProductTag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post with vote totals for feed display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithVotes {
    pub id: i64,
    pub user_id: i64,
    pub author_name: String,
    pub author_avatar: String,
    pub image_url: String,
    pub caption: Option<String>,
    pub product_tags: Vec<ProductTag>,
    pub upvotes: i64,
    pub downvotes: i64,
    /// The requesting user's vote, if any
    pub my_vote: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a post
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostInput {
    pub image_url: String,
    pub caption: Option<String>,
    #[serde(default)]
    pub product_tags: Vec<ProductTag>,
}

/// Vote direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    /// Numeric value stored in the votes table (+1 / -1)
    pub fn as_i32(self) -> i32 {
        match self {
            VoteValue::Up => 1,
            VoteValue::Down => -1,
        }
    }

    /// Parse from the stored numeric value
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(VoteValue::Up),
            -1 => Some(VoteValue::Down),
            _ => None,
        }
    }
}

/// Vote entity: one row per (post, user)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    /// +1 or -1
    pub value: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_value_round_trip() {
        assert_eq!(VoteValue::Up.as_i32(), 1);
        assert_eq!(VoteValue::Down.as_i32(), -1);
        assert_eq!(VoteValue::from_i32(1), Some(VoteValue::Up));
        assert_eq!(VoteValue::from_i32(-1), Some(VoteValue::Down));
        assert_eq!(VoteValue::from_i32(0), None);
        assert_eq!(VoteValue::from_i32(2), None);
    }

    #[test]
    fn test_product_tags_json_round_trip() {
        let tags = vec![
            ProductTag {
                label: "silk scarf".to_string(),
                url: "https://www.amazon.com/dp/B0EXAMPLE".to_string(),
            },
            ProductTag {
                label: "ankle boots".to_string(),
                url: "https://shop.example.com/boots".to_string(),
            },
        ];
        let json = serde_json::to_string(&tags).expect("serialize");
        let back: Vec<ProductTag> = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, tags);
    }
}
