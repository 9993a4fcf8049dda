//! Comment repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use crate::models::{Comment, CommentWithMeta};

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a comment
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    /// Get a comment by id
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Threaded comments for a post: top-level comments with nested
    /// replies, both oldest first
    async fn get_by_post(&self, post_id: i64) -> Result<Vec<CommentWithMeta>>;

    /// Delete a comment (replies cascade)
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based comment repository
pub struct SqlxCommentRepository {
    pool: SqlitePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        let result = sqlx::query(
            r#"
            INSERT INTO comments (post_id, user_id, parent_id, content, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(comment.post_id)
        .bind(comment.user_id)
        .bind(comment.parent_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to create comment")?;

        let mut created = comment.clone();
        created.id = result.last_insert_rowid();
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let row = sqlx::query("SELECT * FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get comment by id")?;

        match row {
            Some(row) => Ok(Some(row_to_comment(&row))),
            None => Ok(None),
        }
    }

    async fn get_by_post(&self, post_id: i64) -> Result<Vec<CommentWithMeta>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.post_id, c.user_id, c.parent_id, c.content, c.created_at,
                   u.username, u.display_name, u.avatar_url, u.email
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.post_id = ?
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to get comments for post")?;

        let flat: Vec<CommentWithMeta> = rows.iter().map(row_to_comment_with_meta).collect();
        Ok(build_thread(flat))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete comment")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_comment(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        user_id: row.get("user_id"),
        parent_id: row.get("parent_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

fn row_to_comment_with_meta(row: &sqlx::sqlite::SqliteRow) -> CommentWithMeta {
    let username: String = row.get("username");
    let display_name: Option<String> = row.get("display_name");
    let avatar_url: Option<String> = row.get("avatar_url");
    let email: String = row.get("email");

    let avatar = match avatar_url {
        Some(url) if !url.trim().is_empty() => url,
        _ => {
            let hash = format!("{:x}", md5::compute(email.trim().to_lowercase()));
            format!("https://www.gravatar.com/avatar/{}?d=mp&s=80", hash)
        }
    };

    CommentWithMeta {
        id: row.get("id"),
        post_id: row.get("post_id"),
        user_id: row.get("user_id"),
        parent_id: row.get("parent_id"),
        author_name: display_name
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(username),
        avatar_url: avatar,
        content: row.get("content"),
        created_at: row.get("created_at"),
        replies: Vec::new(),
    }
}

/// Nest replies under their parents. Replies to replies attach to the
/// top-level ancestor's thread since only one level is displayed.
fn build_thread(flat: Vec<CommentWithMeta>) -> Vec<CommentWithMeta> {
    let mut top_level: Vec<CommentWithMeta> = Vec::new();
    let mut replies: Vec<CommentWithMeta> = Vec::new();

    for comment in flat {
        if comment.parent_id.is_none() {
            top_level.push(comment);
        } else {
            replies.push(comment);
        }
    }

    for reply in replies {
        let parent_id = reply.parent_id.unwrap_or_default();
        if let Some(parent) = top_level.iter_mut().find(|c| {
            c.id == parent_id || c.replies.iter().any(|r| r.id == parent_id)
        }) {
            parent.replies.push(reply);
        } else {
            // Orphaned reply (parent deleted mid-query): show at top level
            top_level.push(reply);
        }
    }

    top_level
}
