//! Notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notification kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    FriendRequest,
    FriendAccept,
    Comment,
    Vote,
    Message,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FriendRequest => write!(f, "friend_request"),
            Self::FriendAccept => write!(f, "friend_accept"),
            Self::Comment => write!(f, "comment"),
            Self::Vote => write!(f, "vote"),
            Self::Message => write!(f, "message"),
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "friend_request" => Ok(Self::FriendRequest),
            "friend_accept" => Ok(Self::FriendAccept),
            "comment" => Ok(Self::Comment),
            "vote" => Ok(Self::Vote),
            "message" => Ok(Self::Message),
            _ => Err(anyhow::anyhow!("Invalid notification kind: {}", s)),
        }
    }
}

/// Notification entity.
///
/// `subject_id` is a polymorphic reference whose meaning depends on the
/// kind: post id for comments/votes, friendship id for friend events,
/// conversation id for messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    /// Recipient
    pub user_id: i64,
    pub kind: NotificationKind,
    /// User whose action produced the notification
    pub actor_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            NotificationKind::FriendRequest,
            NotificationKind::FriendAccept,
            NotificationKind::Comment,
            NotificationKind::Vote,
            NotificationKind::Message,
        ] {
            let s = kind.to_string();
            assert_eq!(NotificationKind::from_str(&s).unwrap(), kind);
        }
        assert!(NotificationKind::from_str("poke").is_err());
    }

    #[test]
    fn test_kind_serde_matches_display() {
        let json = serde_json::to_string(&NotificationKind::FriendRequest).expect("serialize");
        assert_eq!(json, "\"friend_request\"");
    }
}
