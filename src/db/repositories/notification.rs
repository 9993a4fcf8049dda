use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

use crate::models::{Notification, NotificationKind};

/// Notification repository trait
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Insert a notification
    async fn create(&self, notification: &Notification) -> Result<Notification>;

    /// Notifications for a user, newest first
    async fn list_for_user(
        &self,
        user_id: i64,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>>;

    /// Unread count
    async fn unread_count(&self, user_id: i64) -> Result<i64>;

    /// Mark one notification read; false when it doesn't belong to the user
    async fn mark_read(&self, id: i64, user_id: i64) -> Result<bool>;

    /// Mark all of a user's notifications read, returning the count
    async fn mark_all_read(&self, user_id: i64) -> Result<i64>;
}

/// SQLx-based notification repository
pub struct SqlxNotificationRepository {
    pool: SqlitePool,
}

impl SqlxNotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn NotificationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NotificationRepository for SqlxNotificationRepository {
    async fn create(&self, notification: &Notification) -> Result<Notification> {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, kind, actor_id, subject_id, body, read, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(notification.user_id)
        .bind(notification.kind.to_string())
        .bind(notification.actor_id)
        .bind(notification.subject_id)
        .bind(&notification.body)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to create notification")?;

        let mut created = notification.clone();
        created.id = result.last_insert_rowid();
        Ok(created)
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>> {
        let sql = if unread_only {
            "SELECT * FROM notifications WHERE user_id = ? AND read = 0 ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        } else {
            "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        };

        let rows = sqlx::query(sql)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list notifications")?;

        rows.iter().map(row_to_notification).collect()
    }

    async fn unread_count(&self, user_id: i64) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM notifications WHERE user_id = ? AND read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count unread notifications")?;

        Ok(row.get("count"))
    }

    async fn mark_read(&self, id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to mark notification read")?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user_id: i64) -> Result<i64> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE user_id = ? AND read = 0")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to mark notifications read")?;

        Ok(result.rows_affected() as i64)
    }
}

fn row_to_notification(row: &sqlx::sqlite::SqliteRow) -> Result<Notification> {
    let kind: String = row.get("kind");
    Ok(Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        kind: NotificationKind::from_str(&kind)
            .with_context(|| format!("Unknown notification kind: {}", kind))?,
        actor_id: row.get("actor_id"),
        subject_id: row.get("subject_id"),
        body: row.get("body"),
        read: row.get("read"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::user::SqlxUserRepository;
    use crate::db::repositories::UserRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;
    use chrono::Utc;

    async fn setup() -> (SqlxNotificationRepository, i64, i64) {
        let pool = create_test_pool().await.expect("pool");
        migrations::run_migrations(&pool).await.expect("migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let mut ids = Vec::new();
        for name in ["ana", "ben"] {
            ids.push(
                users
                    .create(&User::new(
                        name.to_string(),
                        format!("{}@example.com", name),
                        "hash".to_string(),
                    ))
                    .await
                    .expect("user")
                    .id,
            );
        }

        (SqlxNotificationRepository::new(pool), ids[0], ids[1])
    }

    fn notification(user_id: i64, actor_id: i64, kind: NotificationKind) -> Notification {
        Notification {
            id: 0,
            user_id,
            kind,
            actor_id: Some(actor_id),
            subject_id: None,
            body: "something happened".to_string(),
            read: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (repo, ana, ben) = setup().await;

        repo.create(&notification(ana, ben, NotificationKind::Vote))
            .await
            .expect("create");
        repo.create(&notification(ana, ben, NotificationKind::Comment))
            .await
            .expect("create");

        let all = repo.list_for_user(ana, false, 50, 0).await.expect("list");
        assert_eq!(all.len(), 2);
        // Newest first
        assert_eq!(all[0].kind, NotificationKind::Comment);

        let for_ben = repo.list_for_user(ben, false, 50, 0).await.expect("list");
        assert!(for_ben.is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_scoped_to_owner() {
        let (repo, ana, ben) = setup().await;

        let n = repo
            .create(&notification(ana, ben, NotificationKind::Message))
            .await
            .expect("create");

        // Wrong owner is a no-op
        assert!(!repo.mark_read(n.id, ben).await.expect("mark"));
        assert_eq!(repo.unread_count(ana).await.expect("count"), 1);

        assert!(repo.mark_read(n.id, ana).await.expect("mark"));
        assert_eq!(repo.unread_count(ana).await.expect("count"), 0);

        let unread = repo.list_for_user(ana, true, 50, 0).await.expect("list");
        assert!(unread.is_empty());
    }

    #[tokio::test]
    async fn test_mark_all_read() {
        let (repo, ana, ben) = setup().await;

        for _ in 0..3 {
            repo.create(&notification(ana, ben, NotificationKind::FriendRequest))
                .await
                .expect("create");
        }

        assert_eq!(repo.mark_all_read(ana).await.expect("mark"), 3);
        assert_eq!(repo.unread_count(ana).await.expect("count"), 0);
        // Already-read rows aren't touched again
        assert_eq!(repo.mark_all_read(ana).await.expect("mark"), 0);
    }
}
