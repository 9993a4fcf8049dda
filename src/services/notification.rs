//! Notification service
//!
//! Thin wrapper over the repository; creation happens inside the services
//! whose actions produce notifications.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::db::repositories::NotificationRepository;
use crate::models::Notification;

/// Notification service
pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>) -> Self {
        Self { repo }
    }

    /// A user's notifications, newest first
    pub async fn list(
        &self,
        user_id: i64,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>> {
        self.repo
            .list_for_user(user_id, unread_only, limit, offset)
            .await
            .context("Failed to list notifications")
    }

    /// Unread count for the badge
    pub async fn unread_count(&self, user_id: i64) -> Result<i64> {
        self.repo
            .unread_count(user_id)
            .await
            .context("Failed to count notifications")
    }

    /// Mark one as read; false when it isn't the caller's
    pub async fn mark_read(&self, id: i64, user_id: i64) -> Result<bool> {
        self.repo
            .mark_read(id, user_id)
            .await
            .context("Failed to mark notification read")
    }

    /// Mark all of the caller's notifications read
    pub async fn mark_all_read(&self, user_id: i64) -> Result<i64> {
        self.repo
            .mark_all_read(user_id)
            .await
            .context("Failed to mark notifications read")
    }
}
