use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

use crate::models::{SavedItem, SavedTargetType};

/// Saved item repository trait
#[async_trait]
pub trait SavedItemRepository: Send + Sync {
    /// Save a target for a user; saving twice is a no-op and returns
    /// the existing row
    async fn save(
        &self,
        user_id: i64,
        target_type: SavedTargetType,
        target_id: i64,
    ) -> Result<SavedItem>;

    /// Remove a save; false when it wasn't saved
    async fn unsave(
        &self,
        user_id: i64,
        target_type: SavedTargetType,
        target_id: i64,
    ) -> Result<bool>;

    /// A user's saves, newest first, optionally filtered by type
    async fn list_for_user(
        &self,
        user_id: i64,
        target_type: Option<SavedTargetType>,
    ) -> Result<Vec<SavedItem>>;

    /// Whether a user has saved a target
    async fn is_saved(
        &self,
        user_id: i64,
        target_type: SavedTargetType,
        target_id: i64,
    ) -> Result<bool>;
}

/// SQLx-based saved item repository
pub struct SqlxSavedItemRepository {
    pool: SqlitePool,
}

impl SqlxSavedItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn SavedItemRepository> {
        Arc::new(Self::new(pool))
    }

    async fn get(
        &self,
        user_id: i64,
        target_type: SavedTargetType,
        target_id: i64,
    ) -> Result<Option<SavedItem>> {
        let row = sqlx::query(
            "SELECT * FROM saved_items WHERE user_id = ? AND target_type = ? AND target_id = ?",
        )
        .bind(user_id)
        .bind(target_type.to_string())
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up saved item")?;

        row.map(|r| row_to_saved_item(&r)).transpose()
    }
}

#[async_trait]
impl SavedItemRepository for SqlxSavedItemRepository {
    async fn save(
        &self,
        user_id: i64,
        target_type: SavedTargetType,
        target_id: i64,
    ) -> Result<SavedItem> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO saved_items (user_id, target_type, target_id, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, target_type, target_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(target_type.to_string())
        .bind(target_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to save item")?;

        self.get(user_id, target_type, target_id)
            .await?
            .context("Saved item missing after insert")
    }

    async fn unsave(
        &self,
        user_id: i64,
        target_type: SavedTargetType,
        target_id: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM saved_items WHERE user_id = ? AND target_type = ? AND target_id = ?",
        )
        .bind(user_id)
        .bind(target_type.to_string())
        .bind(target_id)
        .execute(&self.pool)
        .await
        .context("Failed to unsave item")?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        target_type: Option<SavedTargetType>,
    ) -> Result<Vec<SavedItem>> {
        let rows = match target_type {
            Some(t) => sqlx::query(
                r#"
                SELECT * FROM saved_items
                WHERE user_id = ? AND target_type = ?
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .bind(user_id)
            .bind(t.to_string())
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query(
                "SELECT * FROM saved_items WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await,
        }
        .context("Failed to list saved items")?;

        rows.iter().map(row_to_saved_item).collect()
    }

    async fn is_saved(
        &self,
        user_id: i64,
        target_type: SavedTargetType,
        target_id: i64,
    ) -> Result<bool> {
        Ok(self.get(user_id, target_type, target_id).await?.is_some())
    }
}

fn row_to_saved_item(row: &sqlx::sqlite::SqliteRow) -> Result<SavedItem> {
    let target_type: String = row.get("target_type");
    Ok(SavedItem {
        id: row.get("id"),
        user_id: row.get("user_id"),
        target_type: SavedTargetType::from_str(&target_type)?,
        target_id: row.get("target_id"),
        created_at: row.get("created_at"),
    })
}
