//! Message service
//!
//! Direct messages between friends. Conversations are created lazily on
//! first contact and require an accepted friendship; sending requires
//! participation only, so unfriending does not lock existing threads.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;

use crate::db::repositories::{
    FriendRepository, MessageRepository, NotificationRepository, UserRepository,
};
use crate::models::{
    Conversation, ConversationSummary, FriendStatus, Message, Notification, NotificationKind,
};

/// Maximum message length
const MAX_MESSAGE_LENGTH: usize = 4000;

/// Error types for messaging operations
#[derive(Debug, thiserror::Error)]
pub enum MessageServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Message service
pub struct MessageService {
    message_repo: Arc<dyn MessageRepository>,
    friend_repo: Arc<dyn FriendRepository>,
    user_repo: Arc<dyn UserRepository>,
    notification_repo: Arc<dyn NotificationRepository>,
}

impl MessageService {
    pub fn new(
        message_repo: Arc<dyn MessageRepository>,
        friend_repo: Arc<dyn FriendRepository>,
        user_repo: Arc<dyn UserRepository>,
        notification_repo: Arc<dyn NotificationRepository>,
    ) -> Self {
        Self {
            message_repo,
            friend_repo,
            user_repo,
            notification_repo,
        }
    }

    /// Conversation list with previews and unread counts
    pub async fn list_conversations(
        &self,
        user_id: i64,
    ) -> Result<Vec<ConversationSummary>, MessageServiceError> {
        let summaries = self
            .message_repo
            .list_conversations(user_id)
            .await
            .context("Failed to list conversations")?;

        Ok(summaries)
    }

    /// Get or create the conversation with a friend.
    pub async fn start_conversation(
        &self,
        caller_id: i64,
        other_user_id: i64,
    ) -> Result<Conversation, MessageServiceError> {
        if caller_id == other_user_id {
            return Err(MessageServiceError::ValidationError(
                "You cannot message yourself".to_string(),
            ));
        }

        if self
            .user_repo
            .get_by_id(other_user_id)
            .await
            .context("Failed to get user")?
            .is_none()
        {
            return Err(MessageServiceError::NotFound("User not found".to_string()));
        }

        let friendship = self
            .friend_repo
            .get_between(caller_id, other_user_id)
            .await
            .context("Failed to check friendship")?;

        let accepted = matches!(friendship, Some(f) if f.status == FriendStatus::Accepted);
        if !accepted {
            return Err(MessageServiceError::Forbidden(
                "You can only message friends".to_string(),
            ));
        }

        let conversation = self
            .message_repo
            .get_or_create_conversation(caller_id, other_user_id)
            .await
            .context("Failed to open conversation")?;

        Ok(conversation)
    }

    /// Message page, oldest first; fetched messages become read for the
    /// caller.
    pub async fn get_messages(
        &self,
        conversation_id: i64,
        caller_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, MessageServiceError> {
        self.require_participant(conversation_id, caller_id).await?;

        let mut messages = self
            .message_repo
            .list_messages(conversation_id, limit, offset)
            .await
            .context("Failed to list messages")?;

        // Only the fetched page becomes read; earlier pages keep their state
        let unread_ids: Vec<i64> = messages
            .iter()
            .filter(|m| m.is_unread_for(caller_id))
            .map(|m| m.id)
            .collect();
        if !unread_ids.is_empty() {
            self.message_repo
                .mark_read(caller_id, &unread_ids)
                .await
                .context("Failed to mark messages read")?;
            for message in &mut messages {
                if message.is_unread_for(caller_id) {
                    message.read_by.push(caller_id);
                }
            }
        }

        Ok(messages)
    }

    /// Send a message and notify the other participant.
    pub async fn send_message(
        &self,
        conversation_id: i64,
        sender_id: i64,
        body: &str,
    ) -> Result<Message, MessageServiceError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(MessageServiceError::ValidationError(
                "Message cannot be empty".to_string(),
            ));
        }
        if body.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(MessageServiceError::ValidationError(format!(
                "Message must be at most {} characters",
                MAX_MESSAGE_LENGTH
            )));
        }

        let conversation = self.require_participant(conversation_id, sender_id).await?;

        let message = Message {
            id: 0,
            conversation_id,
            sender_id,
            body: body.to_string(),
            read_by: vec![sender_id],
            created_at: Utc::now(),
        };

        let created = self
            .message_repo
            .create_message(&message)
            .await
            .context("Failed to send message")?;

        let sender_name = self
            .user_repo
            .get_by_id(sender_id)
            .await
            .context("Failed to get sender")?
            .map(|u| u.public_name().to_string())
            .unwrap_or_else(|| "Someone".to_string());

        self.notification_repo
            .create(&Notification {
                id: 0,
                user_id: conversation.other_user(sender_id),
                kind: NotificationKind::Message,
                actor_id: Some(sender_id),
                subject_id: Some(conversation_id),
                body: format!("New message from {}", sender_name),
                read: false,
                created_at: Utc::now(),
            })
            .await
            .context("Failed to create message notification")?;

        Ok(created)
    }

    /// Total unread messages across all conversations, for the badge
    pub async fn unread_count(&self, user_id: i64) -> Result<i64, MessageServiceError> {
        let count = self
            .message_repo
            .unread_count(user_id)
            .await
            .context("Failed to count unread messages")?;

        Ok(count)
    }

    async fn require_participant(
        &self,
        conversation_id: i64,
        user_id: i64,
    ) -> Result<Conversation, MessageServiceError> {
        let conversation = self
            .message_repo
            .get_conversation(conversation_id)
            .await
            .context("Failed to get conversation")?
            .ok_or_else(|| {
                MessageServiceError::NotFound("Conversation not found".to_string())
            })?;

        if !conversation.involves(user_id) {
            return Err(MessageServiceError::Forbidden(
                "You are not part of this conversation".to_string(),
            ));
        }

        Ok(conversation)
    }
}
