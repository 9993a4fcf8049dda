//! Saved item service

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::db::repositories::{PostRepository, SavedItemRepository, StyleComboRepository};
use crate::models::{SavedItem, SavedTargetType};

/// Error types for saved item operations
#[derive(Debug, thiserror::Error)]
pub enum SavedItemServiceError {
    #[error("Target not found")]
    TargetNotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Saved item service
pub struct SavedItemService {
    saved_repo: Arc<dyn SavedItemRepository>,
    post_repo: Arc<dyn PostRepository>,
    combo_repo: Arc<dyn StyleComboRepository>,
}

impl SavedItemService {
    pub fn new(
        saved_repo: Arc<dyn SavedItemRepository>,
        post_repo: Arc<dyn PostRepository>,
        combo_repo: Arc<dyn StyleComboRepository>,
    ) -> Self {
        Self {
            saved_repo,
            post_repo,
            combo_repo,
        }
    }

    /// Save a post or combo for later; idempotent.
    pub async fn save(
        &self,
        user_id: i64,
        target_type: SavedTargetType,
        target_id: i64,
    ) -> Result<SavedItem, SavedItemServiceError> {
        if !self.target_exists(target_type, target_id).await? {
            return Err(SavedItemServiceError::TargetNotFound);
        }

        let saved = self
            .saved_repo
            .save(user_id, target_type, target_id)
            .await
            .context("Failed to save item")?;

        Ok(saved)
    }

    /// Remove a bookmark; false when nothing was saved.
    pub async fn unsave(
        &self,
        user_id: i64,
        target_type: SavedTargetType,
        target_id: i64,
    ) -> Result<bool, SavedItemServiceError> {
        let removed = self
            .saved_repo
            .unsave(user_id, target_type, target_id)
            .await
            .context("Failed to unsave item")?;

        Ok(removed)
    }

    /// The caller's bookmarks, optionally filtered by type
    pub async fn list(
        &self,
        user_id: i64,
        target_type: Option<SavedTargetType>,
    ) -> Result<Vec<SavedItem>, SavedItemServiceError> {
        let items = self
            .saved_repo
            .list_for_user(user_id, target_type)
            .await
            .context("Failed to list saved items")?;

        Ok(items)
    }

    async fn target_exists(
        &self,
        target_type: SavedTargetType,
        target_id: i64,
    ) -> Result<bool, SavedItemServiceError> {
        let exists = match target_type {
            SavedTargetType::Post => self
                .post_repo
                .get_by_id(target_id)
                .await
                .context("Failed to check post")?
                .is_some(),
            SavedTargetType::StyleCombo => self
                .combo_repo
                .get_with_items(target_id)
                .await
                .context("Failed to check style combo")?
                .is_some(),
        };

        Ok(exists)
    }
}
