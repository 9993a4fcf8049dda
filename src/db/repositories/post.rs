//! Post and vote repository
//!
//! Votes live here with posts: the feed query, vote totals, and the
//! one-row-per-(post, user) upsert are all post concerns.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use crate::models::{Post, PostWithVotes, ProductTag, Vote};

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a post
    async fn create(&self, post: &Post) -> Result<Post>;

    /// Get a post by id
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get a post with vote totals (and `viewer_id`'s own vote)
    async fn get_with_votes(&self, id: i64, viewer_id: Option<i64>)
        -> Result<Option<PostWithVotes>>;

    /// Hot-or-not feed for `viewer_id`: newest first, excluding the
    /// viewer's own posts and posts they have already voted on
    async fn feed(&self, viewer_id: i64, limit: i64, offset: i64) -> Result<Vec<PostWithVotes>>;

    /// Posts by a given user, newest first
    async fn list_by_user(&self, user_id: i64, limit: i64, offset: i64)
        -> Result<Vec<PostWithVotes>>;

    /// Delete a post (cascades votes, comments, and saved references)
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Upsert a vote; returns the previous value if the row existed
    async fn upsert_vote(&self, post_id: i64, user_id: i64, value: i32) -> Result<Option<i32>>;

    /// Get a user's vote on a post
    async fn get_vote(&self, post_id: i64, user_id: i64) -> Result<Option<Vote>>;

    /// Remove a user's vote; returns whether a row was deleted
    async fn delete_vote(&self, post_id: i64, user_id: i64) -> Result<bool>;
}

/// SQLx-based post repository
pub struct SqlxPostRepository {
    pool: SqlitePool,
}

impl SqlxPostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

// Shared SELECT for feed/detail queries: joins author and aggregates votes.
const POST_WITH_VOTES_SELECT: &str = r#"
    SELECT p.id, p.user_id, p.image_url, p.caption, p.product_tags, p.created_at,
           u.username, u.display_name, u.avatar_url, u.email,
           COALESCE(SUM(CASE WHEN v.value = 1 THEN 1 ELSE 0 END), 0) AS upvotes,
           COALESCE(SUM(CASE WHEN v.value = -1 THEN 1 ELSE 0 END), 0) AS downvotes,
           mv.value AS my_vote
    FROM posts p
    JOIN users u ON u.id = p.user_id
    LEFT JOIN votes v ON v.post_id = p.id
    LEFT JOIN votes mv ON mv.post_id = p.id AND mv.user_id = ?
"#;

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        let tags_json =
            serde_json::to_string(&post.product_tags).context("Failed to encode product tags")?;

        let result = sqlx::query(
            r#"
            INSERT INTO posts (user_id, image_url, caption, product_tags, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(post.user_id)
        .bind(&post.image_url)
        .bind(&post.caption)
        .bind(tags_json)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to create post")?;

        let mut created = post.clone();
        created.id = result.last_insert_rowid();
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get post by id")?;

        row.map(|r| row_to_post(&r)).transpose()
    }

    async fn get_with_votes(
        &self,
        id: i64,
        viewer_id: Option<i64>,
    ) -> Result<Option<PostWithVotes>> {
        let sql = format!("{} WHERE p.id = ? GROUP BY p.id", POST_WITH_VOTES_SELECT);
        let row = sqlx::query(&sql)
            .bind(viewer_id.unwrap_or(-1))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get post with votes")?;

        row.map(|r| row_to_post_with_votes(&r)).transpose()
    }

    async fn feed(&self, viewer_id: i64, limit: i64, offset: i64) -> Result<Vec<PostWithVotes>> {
        let sql = format!(
            r#"{}
            WHERE p.user_id != ?
              AND NOT EXISTS (
                  SELECT 1 FROM votes pv WHERE pv.post_id = p.id AND pv.user_id = ?
              )
            GROUP BY p.id
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT ? OFFSET ?
            "#,
            POST_WITH_VOTES_SELECT
        );

        let rows = sqlx::query(&sql)
            .bind(viewer_id)
            .bind(viewer_id)
            .bind(viewer_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("Failed to query feed")?;

        rows.iter().map(row_to_post_with_votes).collect()
    }

    async fn list_by_user(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostWithVotes>> {
        let sql = format!(
            r#"{}
            WHERE p.user_id = ?
            GROUP BY p.id
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT ? OFFSET ?
            "#,
            POST_WITH_VOTES_SELECT
        );

        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list posts by user")?;

        rows.iter().map(row_to_post_with_votes).collect()
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete post")?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_vote(&self, post_id: i64, user_id: i64, value: i32) -> Result<Option<i32>> {
        let previous: Option<i32> =
            sqlx::query_scalar("SELECT value FROM votes WHERE post_id = ? AND user_id = ?")
                .bind(post_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to read existing vote")?;

        sqlx::query(
            r#"
            INSERT INTO votes (post_id, user_id, value, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(post_id, user_id)
            DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(value)
        .bind(Utc::now())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to upsert vote")?;

        Ok(previous)
    }

    async fn get_vote(&self, post_id: i64, user_id: i64) -> Result<Option<Vote>> {
        let row = sqlx::query("SELECT * FROM votes WHERE post_id = ? AND user_id = ?")
            .bind(post_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get vote")?;

        match row {
            Some(row) => Ok(Some(Vote {
                id: row.get("id"),
                post_id: row.get("post_id"),
                user_id: row.get("user_id"),
                value: row.get("value"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            })),
            None => Ok(None),
        }
    }

    async fn delete_vote(&self, post_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM votes WHERE post_id = ? AND user_id = ?")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete vote")?;

        Ok(result.rows_affected() > 0)
    }
}

fn parse_product_tags(json: &str) -> Vec<ProductTag> {
    serde_json::from_str(json).unwrap_or_default()
}

fn row_to_post(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    let tags: String = row.get("product_tags");
    Ok(Post {
        id: row.get("id"),
        user_id: row.get("user_id"),
        image_url: row.get("image_url"),
        caption: row.get("caption"),
        product_tags: parse_product_tags(&tags),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_post_with_votes(row: &sqlx::sqlite::SqliteRow) -> Result<PostWithVotes> {
    let tags: String = row.get("product_tags");
    let display_name: Option<String> = row.get("display_name");
    let username: String = row.get("username");
    let avatar_url: Option<String> = row.get("avatar_url");
    let email: String = row.get("email");

    let author_avatar = match avatar_url {
        Some(url) if !url.trim().is_empty() => url,
        _ => {
            let hash = format!("{:x}", md5::compute(email.trim().to_lowercase()));
            format!("https://www.gravatar.com/avatar/{}?d=mp&s=160", hash)
        }
    };

    Ok(PostWithVotes {
        id: row.get("id"),
        user_id: row.get("user_id"),
        author_name: display_name
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(username),
        author_avatar,
        image_url: row.get("image_url"),
        caption: row.get("caption"),
        product_tags: parse_product_tags(&tags),
        upvotes: row.get("upvotes"),
        downvotes: row.get("downvotes"),
        my_vote: row.get("my_vote"),
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

    async fn setup() -> (SqlitePool, SqlxPostRepository) {
        let pool = create_test_pool().await.expect("pool");
        migrations::run_migrations(&pool).await.expect("migrations");
        let repo = SqlxPostRepository::new(pool.clone());
        (pool, repo)
    }

    async fn create_user(pool: &SqlitePool, name: &str) -> i64 {
        let users = SqlxUserRepository::new(pool.clone());
        users
            .create(&User::new(
                name.to_string(),
                format!("{}@example.com", name),
                "hash".to_string(),
            ))
            .await
            .expect("create user")
            .id
    }

    fn test_post(user_id: i64) -> Post {
        let now = Utc::now();
        Post {
            id: 0,
            user_id,
            image_url: "https://cdn.glamscan.app/p/1.jpg".to_string(),
            caption: Some("Rooftop look".to_string()),
            product_tags: vec![ProductTag {
                label: "straw hat".to_string(),
                url: "https://www.amazon.com/dp/B0HAT".to_string(),
            }],
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_post() {
        let (pool, repo) = setup().await;
        let user_id = create_user(&pool, "zoe").await;

        let created = repo.create(&test_post(user_id)).await.expect("create");
        assert!(created.id > 0);

        let found = repo
            .get_by_id(created.id)
            .await
            .expect("get")
            .expect("post exists");
        assert_eq!(found.caption.as_deref(), Some("Rooftop look"));
        assert_eq!(found.product_tags.len(), 1);
        assert_eq!(found.product_tags[0].label, "straw hat");
    }

    #[tokio::test]
    async fn test_vote_twice_updates_not_duplicates() {
        let (pool, repo) = setup().await;
        let author = create_user(&pool, "zoe").await;
        let voter = create_user(&pool, "kay").await;
        let post = repo.create(&test_post(author)).await.expect("create");

        let previous = repo.upsert_vote(post.id, voter, 1).await.expect("vote");
        assert_eq!(previous, None);

        let previous = repo.upsert_vote(post.id, voter, -1).await.expect("revote");
        assert_eq!(previous, Some(1));

        // Exactly one row, holding the latest value
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE post_id = ? AND user_id = ?")
                .bind(post.id)
                .bind(voter)
                .fetch_one(&pool)
                .await
                .expect("count");
        assert_eq!(count, 1);

        let vote = repo
            .get_vote(post.id, voter)
            .await
            .expect("get vote")
            .expect("vote exists");
        assert_eq!(vote.value, -1);
    }

    #[tokio::test]
    async fn test_vote_totals() {
        let (pool, repo) = setup().await;
        let author = create_user(&pool, "zoe").await;
        let up1 = create_user(&pool, "kay").await;
        let up2 = create_user(&pool, "lee").await;
        let down = create_user(&pool, "sam").await;
        let post = repo.create(&test_post(author)).await.expect("create");

        repo.upsert_vote(post.id, up1, 1).await.expect("vote");
        repo.upsert_vote(post.id, up2, 1).await.expect("vote");
        repo.upsert_vote(post.id, down, -1).await.expect("vote");

        let view = repo
            .get_with_votes(post.id, Some(up1))
            .await
            .expect("get")
            .expect("post exists");
        assert_eq!(view.upvotes, 2);
        assert_eq!(view.downvotes, 1);
        assert_eq!(view.my_vote, Some(1));
    }

    #[tokio::test]
    async fn test_feed_excludes_own_and_voted_posts() {
        let (pool, repo) = setup().await;
        let zoe = create_user(&pool, "zoe").await;
        let kay = create_user(&pool, "kay").await;

        let own = repo.create(&test_post(zoe)).await.expect("create");
        let other = repo.create(&test_post(kay)).await.expect("create");
        let voted = repo.create(&test_post(kay)).await.expect("create");
        repo.upsert_vote(voted.id, zoe, 1).await.expect("vote");

        let feed = repo.feed(zoe, 50, 0).await.expect("feed");
        let ids: Vec<i64> = feed.iter().map(|p| p.id).collect();
        assert!(ids.contains(&other.id));
        assert!(!ids.contains(&own.id));
        assert!(!ids.contains(&voted.id));
    }

    #[tokio::test]
    async fn test_delete_post_cascades_votes() {
        let (pool, repo) = setup().await;
        let author = create_user(&pool, "zoe").await;
        let voter = create_user(&pool, "kay").await;
        let post = repo.create(&test_post(author)).await.expect("create");
        repo.upsert_vote(post.id, voter, 1).await.expect("vote");

        assert!(repo.delete(post.id).await.expect("delete"));
        assert!(repo.get_by_id(post.id).await.unwrap().is_none());

        let votes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE post_id = ?")
            .bind(post.id)
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(votes, 0);
    }

    #[tokio::test]
    async fn test_delete_vote() {
        let (pool, repo) = setup().await;
        let author = create_user(&pool, "zoe").await;
        let voter = create_user(&pool, "kay").await;
        let post = repo.create(&test_post(author)).await.expect("create");

        repo.upsert_vote(post.id, voter, 1).await.expect("vote");
        assert!(repo.delete_vote(post.id, voter).await.expect("retract"));
        assert!(!repo.delete_vote(post.id, voter).await.expect("retract again"));
        assert!(repo.get_vote(post.id, voter).await.unwrap().is_none());
    }
}
