//! Friend service
//!
//! Friend requests are directed rows that become friendships on accept.
//! Uniqueness is per unordered pair, so a pending request in either
//! direction blocks a new one.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;

use crate::db::repositories::{FriendRepository, NotificationRepository, UserRepository};
use crate::models::{
    Friend, FriendRequestView, FriendStatus, FriendView, Notification, NotificationKind,
};

/// Error types for friend operations
#[derive(Debug, thiserror::Error)]
pub enum FriendServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Friend service
pub struct FriendService {
    friend_repo: Arc<dyn FriendRepository>,
    user_repo: Arc<dyn UserRepository>,
    notification_repo: Arc<dyn NotificationRepository>,
}

impl FriendService {
    pub fn new(
        friend_repo: Arc<dyn FriendRepository>,
        user_repo: Arc<dyn UserRepository>,
        notification_repo: Arc<dyn NotificationRepository>,
    ) -> Self {
        Self {
            friend_repo,
            user_repo,
            notification_repo,
        }
    }

    /// Accepted friends of a user
    pub async fn list_friends(&self, user_id: i64) -> Result<Vec<FriendView>, FriendServiceError> {
        let friends = self
            .friend_repo
            .list_friends(user_id)
            .await
            .context("Failed to list friends")?;

        Ok(friends)
    }

    /// Incoming pending requests
    pub async fn list_incoming_requests(
        &self,
        user_id: i64,
    ) -> Result<Vec<FriendRequestView>, FriendServiceError> {
        let requests = self
            .friend_repo
            .list_incoming_requests(user_id)
            .await
            .context("Failed to list friend requests")?;

        Ok(requests)
    }

    /// Send a friend request and notify the addressee.
    pub async fn send_request(
        &self,
        requester_id: i64,
        addressee_id: i64,
    ) -> Result<Friend, FriendServiceError> {
        if requester_id == addressee_id {
            return Err(FriendServiceError::ValidationError(
                "You cannot friend yourself".to_string(),
            ));
        }

        let requester = self
            .user_repo
            .get_by_id(requester_id)
            .await
            .context("Failed to get requester")?
            .ok_or_else(|| FriendServiceError::NotFound("User not found".to_string()))?;

        if self
            .user_repo
            .get_by_id(addressee_id)
            .await
            .context("Failed to get addressee")?
            .is_none()
        {
            return Err(FriendServiceError::NotFound("User not found".to_string()));
        }

        // One row per unordered pair, whatever its status
        if let Some(existing) = self
            .friend_repo
            .get_between(requester_id, addressee_id)
            .await
            .context("Failed to check existing friendship")?
        {
            let message = match existing.status {
                FriendStatus::Accepted => "You are already friends",
                FriendStatus::Pending => "A friend request is already pending",
                FriendStatus::Declined => "A previous request was declined",
            };
            return Err(FriendServiceError::Conflict(message.to_string()));
        }

        let request = self
            .friend_repo
            .create_request(requester_id, addressee_id)
            .await
            .context("Failed to create friend request")?;

        self.notification_repo
            .create(&Notification {
                id: 0,
                user_id: addressee_id,
                kind: NotificationKind::FriendRequest,
                actor_id: Some(requester_id),
                subject_id: Some(request.id),
                body: format!("{} sent you a friend request", requester.public_name()),
                read: false,
                created_at: Utc::now(),
            })
            .await
            .context("Failed to create friend request notification")?;

        Ok(request)
    }

    /// Accept or decline an incoming request; addressee only.
    ///
    /// Accepting updates the status and notifies the requester in one
    /// transaction inside the repository.
    pub async fn respond(
        &self,
        request_id: i64,
        caller_id: i64,
        accept: bool,
    ) -> Result<Friend, FriendServiceError> {
        let request = self
            .friend_repo
            .get_by_id(request_id)
            .await
            .context("Failed to get friend request")?
            .ok_or_else(|| FriendServiceError::NotFound("Friend request not found".to_string()))?;

        if request.addressee_id != caller_id {
            return Err(FriendServiceError::Forbidden(
                "Only the addressee can respond to a request".to_string(),
            ));
        }

        if request.status != FriendStatus::Pending {
            return Err(FriendServiceError::Conflict(
                "This request has already been answered".to_string(),
            ));
        }

        let status = if accept {
            FriendStatus::Accepted
        } else {
            FriendStatus::Declined
        };

        let addressee_name = self
            .user_repo
            .get_by_id(caller_id)
            .await
            .context("Failed to get addressee")?
            .map(|u| u.public_name().to_string())
            .unwrap_or_else(|| "Someone".to_string());

        let updated = self
            .friend_repo
            .respond(
                request_id,
                status,
                &format!("{} accepted your friend request", addressee_name),
            )
            .await
            .context("Failed to respond to friend request")?;

        Ok(updated)
    }

    /// Remove a friendship; either participant may do it.
    pub async fn unfriend(
        &self,
        friendship_id: i64,
        caller_id: i64,
    ) -> Result<(), FriendServiceError> {
        let friendship = self
            .friend_repo
            .get_by_id(friendship_id)
            .await
            .context("Failed to get friendship")?
            .ok_or_else(|| FriendServiceError::NotFound("Friendship not found".to_string()))?;

        if !friendship.involves(caller_id) {
            return Err(FriendServiceError::Forbidden(
                "You are not part of this friendship".to_string(),
            ));
        }

        self.friend_repo
            .delete(friendship_id)
            .await
            .context("Failed to delete friendship")?;

        Ok(())
    }

    /// Whether two users are accepted friends
    pub async fn are_friends(&self, user_a: i64, user_b: i64) -> Result<bool, FriendServiceError> {
        let friendship = self
            .friend_repo
            .get_between(user_a, user_b)
            .await
            .context("Failed to check friendship")?;

        Ok(matches!(
            friendship,
            Some(f) if f.status == FriendStatus::Accepted
        ))
    }
}
