//! Post service
//!
//! Hot-or-not posts and votes. Voting is an upsert per (post, user); a
//! `vote` notification goes to the post owner only on a first-time upvote
//! so vote-flipping never spams them.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;

use crate::db::repositories::{NotificationRepository, PostRepository, UserRepository};
use crate::models::{
    CreatePostInput, Notification, NotificationKind, Post, PostWithVotes, VoteValue,
};

/// Maximum caption length
const MAX_CAPTION_LENGTH: usize = 2000;

/// Error types for post operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Post not found")]
    NotFound,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Post service
pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    user_repo: Arc<dyn UserRepository>,
    notification_repo: Arc<dyn NotificationRepository>,
}

impl PostService {
    pub fn new(
        post_repo: Arc<dyn PostRepository>,
        user_repo: Arc<dyn UserRepository>,
        notification_repo: Arc<dyn NotificationRepository>,
    ) -> Self {
        Self {
            post_repo,
            user_repo,
            notification_repo,
        }
    }

    /// Create a post
    pub async fn create(
        &self,
        user_id: i64,
        input: CreatePostInput,
    ) -> Result<Post, PostServiceError> {
        if !is_http_url(&input.image_url) {
            return Err(PostServiceError::ValidationError(
                "Image URL must be an http(s) URL".to_string(),
            ));
        }

        if let Some(caption) = &input.caption {
            if caption.chars().count() > MAX_CAPTION_LENGTH {
                return Err(PostServiceError::ValidationError(format!(
                    "Caption must be at most {} characters",
                    MAX_CAPTION_LENGTH
                )));
            }
        }

        for tag in &input.product_tags {
            if tag.label.trim().is_empty() {
                return Err(PostServiceError::ValidationError(
                    "Product tag label cannot be empty".to_string(),
                ));
            }
            if !is_http_url(&tag.url) {
                return Err(PostServiceError::ValidationError(
                    "Product tag URL must be an http(s) URL".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let post = Post {
            id: 0,
            user_id,
            image_url: input.image_url,
            caption: input.caption.filter(|c| !c.trim().is_empty()),
            product_tags: input.product_tags,
            created_at: now,
            updated_at: now,
        };

        let created = self
            .post_repo
            .create(&post)
            .await
            .context("Failed to create post")?;

        Ok(created)
    }

    /// Voting feed for a user: newest first, excluding their own posts and
    /// posts they already voted on
    pub async fn feed(
        &self,
        viewer_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostWithVotes>, PostServiceError> {
        let posts = self
            .post_repo
            .feed(viewer_id, limit, offset)
            .await
            .context("Failed to load feed")?;

        Ok(posts)
    }

    /// Single post with totals and the viewer's vote
    pub async fn get(
        &self,
        id: i64,
        viewer_id: Option<i64>,
    ) -> Result<PostWithVotes, PostServiceError> {
        self.post_repo
            .get_with_votes(id, viewer_id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound)
    }

    /// A user's posts, newest first
    pub async fn list_by_user(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostWithVotes>, PostServiceError> {
        let posts = self
            .post_repo
            .list_by_user(user_id, limit, offset)
            .await
            .context("Failed to list user posts")?;

        Ok(posts)
    }

    /// Delete a post, owner only
    pub async fn delete(&self, id: i64, caller_id: i64) -> Result<(), PostServiceError> {
        let post = self
            .post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound)?;

        if post.user_id != caller_id {
            return Err(PostServiceError::Forbidden(
                "Only the post owner can delete it".to_string(),
            ));
        }

        self.post_repo
            .delete(id)
            .await
            .context("Failed to delete post")?;

        Ok(())
    }

    /// Cast or change a vote. Returns the post with refreshed totals.
    pub async fn vote(
        &self,
        post_id: i64,
        voter_id: i64,
        value: VoteValue,
    ) -> Result<PostWithVotes, PostServiceError> {
        let post = self
            .post_repo
            .get_by_id(post_id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound)?;

        if post.user_id == voter_id {
            return Err(PostServiceError::ValidationError(
                "You cannot vote on your own post".to_string(),
            ));
        }

        let previous = self
            .post_repo
            .upsert_vote(post_id, voter_id, value.as_i32())
            .await
            .context("Failed to record vote")?;

        // First-time upvote notifies the owner; changes and downvotes don't
        if previous.is_none() && value == VoteValue::Up {
            let voter_name = self
                .user_repo
                .get_by_id(voter_id)
                .await
                .context("Failed to get voter")?
                .map(|u| u.public_name().to_string())
                .unwrap_or_else(|| "Someone".to_string());

            self.notification_repo
                .create(&Notification {
                    id: 0,
                    user_id: post.user_id,
                    kind: NotificationKind::Vote,
                    actor_id: Some(voter_id),
                    subject_id: Some(post_id),
                    body: format!("{} liked your look", voter_name),
                    read: false,
                    created_at: Utc::now(),
                })
                .await
                .context("Failed to create vote notification")?;
        }

        self.get(post_id, Some(voter_id)).await
    }

    /// Retract a vote
    pub async fn retract_vote(
        &self,
        post_id: i64,
        voter_id: i64,
    ) -> Result<PostWithVotes, PostServiceError> {
        if self
            .post_repo
            .get_by_id(post_id)
            .await
            .context("Failed to get post")?
            .is_none()
        {
            return Err(PostServiceError::NotFound);
        }

        self.post_repo
            .delete_vote(post_id, voter_id)
            .await
            .context("Failed to retract vote")?;

        self.get(post_id, Some(voter_id)).await
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        NotificationRepository, SqlxNotificationRepository, SqlxPostRepository,
        SqlxSessionRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::ProductTag;
    use crate::services::user::{RegisterInput, UserService};
    use sqlx::SqlitePool;

    async fn setup() -> (SqlitePool, PostService, i64, i64) {
        let pool = create_test_pool().await.expect("pool");
        migrations::run_migrations(&pool).await.expect("migrations");

        let users = UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
        );
        let mut ids = Vec::new();
        for name in ["ana", "ben"] {
            let (user, _) = users
                .register(RegisterInput::new(
                    name,
                    format!("{}@example.com", name),
                    "password123",
                ))
                .await
                .expect("register");
            ids.push(user.id);
        }

        let service = PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
            SqlxNotificationRepository::boxed(pool.clone()),
        );
        (pool, service, ids[0], ids[1])
    }

    fn post_input() -> CreatePostInput {
        CreatePostInput {
            image_url: "https://cdn.glamscan.app/p/1.jpg".to_string(),
            caption: Some("Thrifted this today".to_string()),
            product_tags: vec![ProductTag {
                label: "denim jacket".to_string(),
                url: "https://www.amazon.com/dp/B0EXAMPLE".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_create_validates_urls() {
        let (_pool, service, ana, _) = setup().await;

        let mut bad_image = post_input();
        bad_image.image_url = "ftp://not-http".to_string();
        assert!(matches!(
            service.create(ana, bad_image).await,
            Err(PostServiceError::ValidationError(_))
        ));

        let mut bad_tag = post_input();
        bad_tag.product_tags[0].url = "javascript:alert(1)".to_string();
        assert!(matches!(
            service.create(ana, bad_tag).await,
            Err(PostServiceError::ValidationError(_))
        ));

        let created = service.create(ana, post_input()).await.expect("create");
        assert_eq!(created.user_id, ana);
        assert_eq!(created.product_tags.len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_long_caption() {
        let (_pool, service, ana, _) = setup().await;

        let mut input = post_input();
        input.caption = Some("x".repeat(MAX_CAPTION_LENGTH + 1));
        assert!(matches!(
            service.create(ana, input).await,
            Err(PostServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_cannot_vote_own_post() {
        let (_pool, service, ana, _) = setup().await;
        let post = service.create(ana, post_input()).await.expect("create");

        assert!(matches!(
            service.vote(post.id, ana, VoteValue::Up).await,
            Err(PostServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_first_upvote_notifies_owner_once() {
        let (pool, service, ana, ben) = setup().await;
        let post = service.create(ana, post_input()).await.expect("create");

        let notifications = SqlxNotificationRepository::new(pool.clone());

        let voted = service
            .vote(post.id, ben, VoteValue::Up)
            .await
            .expect("vote");
        assert_eq!(voted.upvotes, 1);
        assert_eq!(voted.my_vote, Some(1));
        assert_eq!(notifications.unread_count(ana).await.expect("count"), 1);

        // Flipping and re-upvoting doesn't notify again
        service
            .vote(post.id, ben, VoteValue::Down)
            .await
            .expect("vote");
        let flipped = service
            .vote(post.id, ben, VoteValue::Up)
            .await
            .expect("vote");
        assert_eq!(flipped.upvotes, 1);
        assert_eq!(flipped.downvotes, 0);
        assert_eq!(notifications.unread_count(ana).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn test_first_downvote_does_not_notify() {
        let (pool, service, ana, ben) = setup().await;
        let post = service.create(ana, post_input()).await.expect("create");

        service
            .vote(post.id, ben, VoteValue::Down)
            .await
            .expect("vote");

        let notifications = SqlxNotificationRepository::new(pool);
        assert_eq!(notifications.unread_count(ana).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn test_retract_vote() {
        let (_pool, service, ana, ben) = setup().await;
        let post = service.create(ana, post_input()).await.expect("create");

        service
            .vote(post.id, ben, VoteValue::Up)
            .await
            .expect("vote");
        let retracted = service.retract_vote(post.id, ben).await.expect("retract");
        assert_eq!(retracted.upvotes, 0);
        assert_eq!(retracted.my_vote, None);
    }

    #[tokio::test]
    async fn test_delete_owner_only() {
        let (_pool, service, ana, ben) = setup().await;
        let post = service.create(ana, post_input()).await.expect("create");

        assert!(matches!(
            service.delete(post.id, ben).await,
            Err(PostServiceError::Forbidden(_))
        ));

        service.delete(post.id, ana).await.expect("delete");
        assert!(matches!(
            service.get(post.id, None).await,
            Err(PostServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_feed_excludes_voted_posts() {
        let (_pool, service, ana, ben) = setup().await;

        let first = service.create(ana, post_input()).await.expect("create");
        service.create(ana, post_input()).await.expect("create");

        assert_eq!(service.feed(ben, 10, 0).await.expect("feed").len(), 2);

        service
            .vote(first.id, ben, VoteValue::Up)
            .await
            .expect("vote");
        let feed = service.feed(ben, 10, 0).await.expect("feed");
        assert_eq!(feed.len(), 1);
        assert_ne!(feed[0].id, first.id);

        // Own posts never appear
        assert!(service.feed(ana, 10, 0).await.expect("feed").is_empty());
    }
}
