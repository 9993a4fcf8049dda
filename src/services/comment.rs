//! Comment service

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;

use crate::db::repositories::{CommentRepository, NotificationRepository, PostRepository, UserRepository};
use crate::models::{
    Comment, CommentWithMeta, CreateCommentInput, Notification, NotificationKind,
};

/// Maximum comment length
const MAX_COMMENT_LENGTH: usize = 1000;

/// Error types for comment operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    comment_repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
    user_repo: Arc<dyn UserRepository>,
    notification_repo: Arc<dyn NotificationRepository>,
}

impl CommentService {
    pub fn new(
        comment_repo: Arc<dyn CommentRepository>,
        post_repo: Arc<dyn PostRepository>,
        user_repo: Arc<dyn UserRepository>,
        notification_repo: Arc<dyn NotificationRepository>,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            user_repo,
            notification_repo,
        }
    }

    /// Create a comment.
    ///
    /// A reply's `parent_id` must reference a comment on the same post.
    /// The post owner is notified unless they are the commenter.
    pub async fn create(
        &self,
        user_id: i64,
        input: CreateCommentInput,
    ) -> Result<Comment, CommentServiceError> {
        let content = input.content.trim();
        if content.is_empty() {
            return Err(CommentServiceError::ValidationError(
                "Comment cannot be empty".to_string(),
            ));
        }
        if content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(CommentServiceError::ValidationError(format!(
                "Comment must be at most {} characters",
                MAX_COMMENT_LENGTH
            )));
        }

        let post = self
            .post_repo
            .get_by_id(input.post_id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| CommentServiceError::NotFound("Post not found".to_string()))?;

        if let Some(parent_id) = input.parent_id {
            let parent = self
                .comment_repo
                .get_by_id(parent_id)
                .await
                .context("Failed to get parent comment")?
                .ok_or_else(|| {
                    CommentServiceError::NotFound("Parent comment not found".to_string())
                })?;

            if parent.post_id != input.post_id {
                return Err(CommentServiceError::ValidationError(
                    "Parent comment belongs to a different post".to_string(),
                ));
            }
        }

        let comment = Comment {
            id: 0,
            post_id: input.post_id,
            user_id,
            parent_id: input.parent_id,
            content: content.to_string(),
            created_at: Utc::now(),
        };

        let created = self
            .comment_repo
            .create(&comment)
            .await
            .context("Failed to create comment")?;

        if post.user_id != user_id {
            let commenter = self
                .user_repo
                .get_by_id(user_id)
                .await
                .context("Failed to get commenter")?
                .map(|u| u.public_name().to_string())
                .unwrap_or_else(|| "Someone".to_string());

            self.notification_repo
                .create(&Notification {
                    id: 0,
                    user_id: post.user_id,
                    kind: NotificationKind::Comment,
                    actor_id: Some(user_id),
                    subject_id: Some(post.id),
                    body: format!("{} commented on your look", commenter),
                    read: false,
                    created_at: Utc::now(),
                })
                .await
                .context("Failed to create comment notification")?;
        }

        Ok(created)
    }

    /// Threaded comments for a post
    pub async fn get_by_post(
        &self,
        post_id: i64,
    ) -> Result<Vec<CommentWithMeta>, CommentServiceError> {
        let comments = self
            .comment_repo
            .get_by_post(post_id)
            .await
            .context("Failed to list comments")?;

        Ok(comments)
    }

    /// Delete a comment; allowed for its author and the post owner.
    pub async fn delete(&self, id: i64, caller_id: i64) -> Result<(), CommentServiceError> {
        let comment = self
            .comment_repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")?
            .ok_or_else(|| CommentServiceError::NotFound("Comment not found".to_string()))?;

        let post = self
            .post_repo
            .get_by_id(comment.post_id)
            .await
            .context("Failed to get post")?;

        let is_post_owner = post.map(|p| p.user_id == caller_id).unwrap_or(false);
        if comment.user_id != caller_id && !is_post_owner {
            return Err(CommentServiceError::Forbidden(
                "Only the author or post owner can delete a comment".to_string(),
            ));
        }

        self.comment_repo
            .delete(id)
            .await
            .context("Failed to delete comment")?;

        Ok(())
    }
}
