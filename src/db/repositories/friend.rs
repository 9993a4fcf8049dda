//! Friend repository
//!
//! Responding to a request updates the row and inserts the acceptance
//! notification in one transaction.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

use crate::models::{Friend, FriendRequestView, FriendStatus, FriendView, NotificationKind};

/// Friend repository trait
#[async_trait]
pub trait FriendRepository: Send + Sync {
    /// Create a pending request
    async fn create_request(&self, requester_id: i64, addressee_id: i64) -> Result<Friend>;

    /// Get a friend row by id
    async fn get_by_id(&self, id: i64) -> Result<Option<Friend>>;

    /// Get the row between two users, regardless of direction
    async fn get_between(&self, user_a: i64, user_b: i64) -> Result<Option<Friend>>;

    /// Accepted friends of a user, joined with their public profiles
    async fn list_friends(&self, user_id: i64) -> Result<Vec<FriendView>>;

    /// Incoming pending requests for a user
    async fn list_incoming_requests(&self, user_id: i64) -> Result<Vec<FriendRequestView>>;

    /// Update status and insert the acceptance notification atomically.
    /// `notify_body` is only used when `status` is `Accepted`.
    async fn respond(&self, id: i64, status: FriendStatus, notify_body: &str) -> Result<Friend>;

    /// Delete a friendship or request
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based friend repository
pub struct SqlxFriendRepository {
    pool: SqlitePool,
}

impl SqlxFriendRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn FriendRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FriendRepository for SqlxFriendRepository {
    async fn create_request(&self, requester_id: i64, addressee_id: i64) -> Result<Friend> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO friends (requester_id, addressee_id, status, created_at, updated_at)
            VALUES (?, ?, 'pending', ?, ?)
            "#,
        )
        .bind(requester_id)
        .bind(addressee_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create friend request")?;

        Ok(Friend {
            id: result.last_insert_rowid(),
            requester_id,
            addressee_id,
            status: FriendStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Friend>> {
        let row = sqlx::query("SELECT * FROM friends WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get friend row")?;

        row.map(|r| row_to_friend(&r)).transpose()
    }

    async fn get_between(&self, user_a: i64, user_b: i64) -> Result<Option<Friend>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM friends
            WHERE (requester_id = ? AND addressee_id = ?)
               OR (requester_id = ? AND addressee_id = ?)
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .bind(user_b)
        .bind(user_a)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get friend row between users")?;

        row.map(|r| row_to_friend(&r)).transpose()
    }

    async fn list_friends(&self, user_id: i64) -> Result<Vec<FriendView>> {
        let rows = sqlx::query(
            r#"
            SELECT f.id AS friendship_id, f.updated_at,
                   u.id AS user_id, u.username, u.display_name, u.avatar_url, u.email
            FROM friends f
            JOIN users u ON u.id = CASE
                WHEN f.requester_id = ? THEN f.addressee_id
                ELSE f.requester_id
            END
            WHERE (f.requester_id = ? OR f.addressee_id = ?)
              AND f.status = 'accepted'
            ORDER BY u.username ASC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list friends")?;

        Ok(rows
            .iter()
            .map(|row| FriendView {
                friendship_id: row.get("friendship_id"),
                user_id: row.get("user_id"),
                username: row.get("username"),
                display_name: row.get("display_name"),
                avatar_url: avatar_from_row(row),
                since: row.get("updated_at"),
            })
            .collect())
    }

    async fn list_incoming_requests(&self, user_id: i64) -> Result<Vec<FriendRequestView>> {
        let rows = sqlx::query(
            r#"
            SELECT f.id AS request_id, f.created_at,
                   u.id AS requester_id, u.username, u.display_name, u.avatar_url, u.email
            FROM friends f
            JOIN users u ON u.id = f.requester_id
            WHERE f.addressee_id = ? AND f.status = 'pending'
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list incoming requests")?;

        Ok(rows
            .iter()
            .map(|row| FriendRequestView {
                request_id: row.get("request_id"),
                requester_id: row.get("requester_id"),
                username: row.get("username"),
                display_name: row.get("display_name"),
                avatar_url: avatar_from_row(row),
                sent_at: row.get("created_at"),
            })
            .collect())
    }

    async fn respond(&self, id: i64, status: FriendStatus, notify_body: &str) -> Result<Friend> {
        let friend = self
            .get_by_id(id)
            .await?
            .context("Friend request not found")?;

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let now = Utc::now();
        sqlx::query("UPDATE friends SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to update friend status")?;

        if status == FriendStatus::Accepted {
            sqlx::query(
                r#"
                INSERT INTO notifications (user_id, kind, actor_id, subject_id, body, read, created_at)
                VALUES (?, ?, ?, ?, ?, 0, ?)
                "#,
            )
            .bind(friend.requester_id)
            .bind(NotificationKind::FriendAccept.to_string())
            .bind(friend.addressee_id)
            .bind(id)
            .bind(notify_body)
            .bind(now)
            .execute(&mut *tx)
            .await
            .context("Failed to insert acceptance notification")?;
        }

        tx.commit().await.context("Failed to commit response")?;

        Ok(Friend {
            status,
            updated_at: now,
            ..friend
        })
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM friends WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete friend row")?;

        Ok(result.rows_affected() > 0)
    }
}

fn avatar_from_row(row: &sqlx::sqlite::SqliteRow) -> String {
    let avatar_url: Option<String> = row.get("avatar_url");
    match avatar_url {
        Some(url) if !url.trim().is_empty() => url,
        _ => {
            let email: String = row.get("email");
            let hash = format!("{:x}", md5::compute(email.trim().to_lowercase()));
            format!("https://www.gravatar.com/avatar/{}?d=mp&s=80", hash)
        }
    }
}

fn row_to_friend(row: &sqlx::sqlite::SqliteRow) -> Result<Friend> {
    let status: String = row.get("status");
    Ok(Friend {
        id: row.get("id"),
        requester_id: row.get("requester_id"),
        addressee_id: row.get("addressee_id"),
        status: FriendStatus::from_str(&status)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::user::SqlxUserRepository;
    use crate::db::repositories::UserRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;

    async fn setup() -> (SqlitePool, SqlxFriendRepository, i64, i64) {
        let pool = create_test_pool().await.expect("pool");
        migrations::run_migrations(&pool).await.expect("migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let mut ids = Vec::new();
        for name in ["ava", "ben"] {
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

        (
            pool.clone(),
            SqlxFriendRepository::new(pool),
            ids[0],
            ids[1],
        )
    }

    #[tokio::test]
    async fn test_create_request_pending() {
        let (_pool, repo, ava, ben) = setup().await;

        let request = repo.create_request(ava, ben).await.expect("request");
        assert_eq!(request.status, FriendStatus::Pending);

        let incoming = repo.list_incoming_requests(ben).await.expect("incoming");
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].requester_id, ava);
    }

    #[tokio::test]
    async fn test_duplicate_request_rejected() {
        let (_pool, repo, ava, ben) = setup().await;
        repo.create_request(ava, ben).await.expect("request");
        assert!(repo.create_request(ava, ben).await.is_err());
    }

    #[tokio::test]
    async fn test_get_between_is_direction_agnostic() {
        let (_pool, repo, ava, ben) = setup().await;
        repo.create_request(ava, ben).await.expect("request");

        assert!(repo.get_between(ava, ben).await.unwrap().is_some());
        assert!(repo.get_between(ben, ava).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_accept_inserts_notification_atomically() {
        let (pool, repo, ava, ben) = setup().await;
        let request = repo.create_request(ava, ben).await.expect("request");

        let accepted = repo
            .respond(request.id, FriendStatus::Accepted, "ben accepted your friend request")
            .await
            .expect("respond");
        assert_eq!(accepted.status, FriendStatus::Accepted);

        // Requester got the notification
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND kind = 'friend_accept'",
        )
        .bind(ava)
        .fetch_one(&pool)
        .await
        .expect("count");
        assert_eq!(count, 1);

        let friends = repo.list_friends(ava).await.expect("friends");
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].user_id, ben);
    }

    #[tokio::test]
    async fn test_decline_skips_notification() {
        let (pool, repo, ava, ben) = setup().await;
        let request = repo.create_request(ava, ben).await.expect("request");

        repo.respond(request.id, FriendStatus::Declined, "")
            .await
            .expect("respond");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 0);

        assert!(repo.list_friends(ava).await.expect("friends").is_empty());
    }

    #[tokio::test]
    async fn test_unfriend() {
        let (_pool, repo, ava, ben) = setup().await;
        let request = repo.create_request(ava, ben).await.expect("request");
        repo.respond(request.id, FriendStatus::Accepted, "hi")
            .await
            .expect("respond");

        assert!(repo.delete(request.id).await.expect("delete"));
        assert!(repo.get_between(ava, ben).await.unwrap().is_none());
    }
}
