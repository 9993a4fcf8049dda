//! Conversation and message repository
//!
//! Read receipts are a JSON int-array column (`read_by`); the unread
//! predicate ("not sender, not in read_by") is computed in Rust after
//! decoding, matching the app-layer membership-check design.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{Conversation, ConversationSummary, Message};

/// Message repository trait
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Get or create the conversation between two users
    async fn get_or_create_conversation(&self, user_a: i64, user_b: i64) -> Result<Conversation>;

    /// Get a conversation by id
    async fn get_conversation(&self, id: i64) -> Result<Option<Conversation>>;

    /// Conversation list for a user with last-message preview and unread count
    async fn list_conversations(&self, user_id: i64) -> Result<Vec<ConversationSummary>>;

    /// Append a message
    async fn create_message(&self, message: &Message) -> Result<Message>;

    /// Message page, oldest first
    async fn list_messages(
        &self,
        conversation_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>>;

    /// Add `user_id` to the read-by set of the given messages where it is
    /// missing; returns how many messages were marked
    async fn mark_read(&self, user_id: i64, message_ids: &[i64]) -> Result<i64>;

    /// Total unread messages for a user across all conversations
    async fn unread_count(&self, user_id: i64) -> Result<i64>;
}

/// SQLx-based message repository
pub struct SqlxMessageRepository {
    pool: SqlitePool,
}

impl SqlxMessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn MessageRepository> {
        Arc::new(Self::new(pool))
    }

    async fn messages_for_user_conversations(&self, user_id: i64) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            r#"
            SELECT m.* FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            WHERE c.user_a_id = ? OR c.user_b_id = ?
            ORDER BY m.created_at ASC, m.id ASC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query user messages")?;

        rows.iter().map(row_to_message).collect()
    }
}

#[async_trait]
impl MessageRepository for SqlxMessageRepository {
    async fn get_or_create_conversation(&self, user_a: i64, user_b: i64) -> Result<Conversation> {
        let (a, b) = Conversation::ordered_pair(user_a, user_b);

        // Two concurrent first messages can both reach the insert; the
        // UNIQUE pair turns the loser into a no-op and both callers read
        // the same row back.
        sqlx::query(
            r#"
            INSERT INTO conversations (user_a_id, user_b_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_a_id, user_b_id) DO NOTHING
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to create conversation")?;

        let row = sqlx::query("SELECT * FROM conversations WHERE user_a_id = ? AND user_b_id = ?")
            .bind(a)
            .bind(b)
            .fetch_one(&self.pool)
            .await
            .context("Failed to look up conversation")?;

        row_to_conversation(&row)
    }

    async fn get_conversation(&self, id: i64) -> Result<Option<Conversation>> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get conversation")?;

        row.map(|r| row_to_conversation(&r)).transpose()
    }

    async fn list_conversations(&self, user_id: i64) -> Result<Vec<ConversationSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.user_a_id, c.user_b_id,
                   u.id AS other_id, u.username, u.display_name, u.avatar_url, u.email
            FROM conversations c
            JOIN users u ON u.id = CASE
                WHEN c.user_a_id = ? THEN c.user_b_id
                ELSE c.user_a_id
            END
            WHERE c.user_a_id = ? OR c.user_b_id = ?
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list conversations")?;

        // One pass over the user's messages instead of a query per
        // conversation; rows come back oldest first so the last entry per
        // conversation wins the preview slot.
        let messages = self.messages_for_user_conversations(user_id).await?;
        let mut rollup: HashMap<i64, (i64, Option<(String, DateTime<Utc>)>)> = HashMap::new();
        for message in &messages {
            let entry = rollup.entry(message.conversation_id).or_insert((0, None));
            if message.is_unread_for(user_id) {
                entry.0 += 1;
            }
            entry.1 = Some((message.body.clone(), message.created_at));
        }

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            let conversation_id: i64 = row.get("id");
            let (unread, last) = rollup.remove(&conversation_id).unwrap_or((0, None));

            let avatar_url: Option<String> = row.get("avatar_url");
            let email: String = row.get("email");
            let display_name: Option<String> = row.get("display_name");
            let username: String = row.get("username");

            summaries.push(ConversationSummary {
                id: conversation_id,
                other_user_id: row.get("other_id"),
                other_user_name: display_name
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or(username),
                other_user_avatar: match avatar_url {
                    Some(url) if !url.trim().is_empty() => url,
                    _ => {
                        let hash = format!("{:x}", md5::compute(email.trim().to_lowercase()));
                        format!("https://www.gravatar.com/avatar/{}?d=mp&s=80", hash)
                    }
                },
                last_message: last.as_ref().map(|(body, _)| body.clone()),
                last_message_at: last.map(|(_, at)| at),
                unread_count: unread,
            });
        }

        // Most recently active first
        summaries.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(summaries)
    }

    async fn create_message(&self, message: &Message) -> Result<Message> {
        let read_by =
            serde_json::to_string(&message.read_by).context("Failed to encode read_by")?;

        let result = sqlx::query(
            r#"
            INSERT INTO messages (conversation_id, sender_id, body, read_by, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(&message.body)
        .bind(read_by)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to create message")?;

        let mut created = message.clone();
        created.id = result.last_insert_rowid();
        Ok(created)
    }

    async fn list_messages(
        &self,
        conversation_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM messages
            WHERE conversation_id = ?
            ORDER BY created_at ASC, id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list messages")?;

        rows.iter().map(row_to_message).collect()
    }

    async fn mark_read(&self, user_id: i64, message_ids: &[i64]) -> Result<i64> {
        let mut marked = 0;
        for id in message_ids {
            let row = sqlx::query("SELECT * FROM messages WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to load message for read receipt")?;

            let message = match row {
                Some(r) => row_to_message(&r)?,
                None => continue,
            };
            if !message.is_unread_for(user_id) {
                continue;
            }

            let mut read_by = message.read_by;
            read_by.push(user_id);
            let json = serde_json::to_string(&read_by).context("Failed to encode read_by")?;

            sqlx::query("UPDATE messages SET read_by = ? WHERE id = ?")
                .bind(json)
                .bind(message.id)
                .execute(&self.pool)
                .await
                .context("Failed to mark message read")?;
            marked += 1;
        }

        Ok(marked)
    }

    async fn unread_count(&self, user_id: i64) -> Result<i64> {
        let messages = self.messages_for_user_conversations(user_id).await?;
        Ok(messages
            .iter()
            .filter(|m| m.is_unread_for(user_id))
            .count() as i64)
    }
}

fn row_to_conversation(row: &sqlx::sqlite::SqliteRow) -> Result<Conversation> {
    Ok(Conversation {
        id: row.get("id"),
        user_a_id: row.get("user_a_id"),
        user_b_id: row.get("user_b_id"),
        created_at: row.get("created_at"),
    })
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<Message> {
    let read_by: String = row.get("read_by");
    Ok(Message {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        sender_id: row.get("sender_id"),
        body: row.get("body"),
        read_by: serde_json::from_str(&read_by).unwrap_or_default(),
        created_at: row.get("created_at"),
    })
}
