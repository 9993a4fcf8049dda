//! Style combo service
//!
//! Curated shoppable outfit bundles. Outbound URLs are affiliate-tagged on
//! the way out; the stored rows keep the curator's original links.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;

use crate::db::repositories::StyleComboRepository;
use crate::models::{CreateStyleComboInput, StyleCombo, StyleComboWithItems};
use crate::services::affiliate::AffiliateTagger;

/// Maximum title length
const MAX_TITLE_LENGTH: usize = 200;

/// Error types for style combo operations
#[derive(Debug, thiserror::Error)]
pub enum StyleComboServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Style combo not found")]
    NotFound,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Style combo service
pub struct StyleComboService {
    repo: Arc<dyn StyleComboRepository>,
    tagger: AffiliateTagger,
}

impl StyleComboService {
    pub fn new(repo: Arc<dyn StyleComboRepository>, tagger: AffiliateTagger) -> Self {
        Self { repo, tagger }
    }

    /// Create a combo with its items; one transaction, input order kept.
    pub async fn create(
        &self,
        user_id: i64,
        input: CreateStyleComboInput,
    ) -> Result<StyleComboWithItems, StyleComboServiceError> {
        self.validate(&input)?;

        let now = Utc::now();
        let combo = StyleCombo {
            id: 0,
            user_id,
            title: input.title.trim().to_string(),
            description: input
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            cover_image_url: input.cover_image_url,
            shop_url: input.shop_url,
            created_at: now,
            updated_at: now,
        };

        let created = self
            .repo
            .create_with_items(&combo, &input.items)
            .await
            .context("Failed to create style combo")?;

        Ok(self.tag(created))
    }

    /// Paginated list, newest first, affiliate-tagged
    pub async fn list(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StyleComboWithItems>, StyleComboServiceError> {
        let combos = self
            .repo
            .list(limit, offset)
            .await
            .context("Failed to list style combos")?;

        Ok(combos.into_iter().map(|c| self.tag(c)).collect())
    }

    /// One combo with ordered items, affiliate-tagged
    pub async fn get(&self, id: i64) -> Result<StyleComboWithItems, StyleComboServiceError> {
        let combo = self
            .repo
            .get_with_items(id)
            .await
            .context("Failed to get style combo")?
            .ok_or(StyleComboServiceError::NotFound)?;

        Ok(self.tag(combo))
    }

    /// Replace a combo and its items; curator only.
    pub async fn update(
        &self,
        id: i64,
        caller_id: i64,
        input: CreateStyleComboInput,
    ) -> Result<StyleComboWithItems, StyleComboServiceError> {
        self.validate(&input)?;

        let existing = self
            .repo
            .get_with_items(id)
            .await
            .context("Failed to get style combo")?
            .ok_or(StyleComboServiceError::NotFound)?;

        if existing.combo.user_id != caller_id {
            return Err(StyleComboServiceError::Forbidden(
                "Only the curator can edit a combo".to_string(),
            ));
        }

        let combo = StyleCombo {
            title: input.title.trim().to_string(),
            description: input
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            cover_image_url: input.cover_image_url,
            shop_url: input.shop_url,
            ..existing.combo
        };

        let updated = self
            .repo
            .update_with_items(id, &combo, &input.items)
            .await
            .context("Failed to update style combo")?;

        Ok(self.tag(updated))
    }

    /// Delete a combo; curator only.
    pub async fn delete(&self, id: i64, caller_id: i64) -> Result<(), StyleComboServiceError> {
        let existing = self
            .repo
            .get_with_items(id)
            .await
            .context("Failed to get style combo")?
            .ok_or(StyleComboServiceError::NotFound)?;

        if existing.combo.user_id != caller_id {
            return Err(StyleComboServiceError::Forbidden(
                "Only the curator can delete a combo".to_string(),
            ));
        }

        self.repo
            .delete(id)
            .await
            .context("Failed to delete style combo")?;

        Ok(())
    }

    /// Every combo with items, untagged, for the embedding matcher
    pub async fn list_all_for_matching(
        &self,
    ) -> Result<Vec<StyleComboWithItems>, StyleComboServiceError> {
        let combos = self
            .repo
            .list_all_with_items()
            .await
            .context("Failed to list style combos")?;

        Ok(combos)
    }

    /// Apply affiliate tagging to a combo for responses
    pub fn tag(&self, mut combo: StyleComboWithItems) -> StyleComboWithItems {
        combo.combo.shop_url = self.tagger.tag_url(&combo.combo.shop_url);
        for item in &mut combo.items {
            item.url = self.tagger.tag_url(&item.url);
        }
        combo
    }

    fn validate(&self, input: &CreateStyleComboInput) -> Result<(), StyleComboServiceError> {
        if input.title.trim().is_empty() {
            return Err(StyleComboServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }
        if input.title.chars().count() > MAX_TITLE_LENGTH {
            return Err(StyleComboServiceError::ValidationError(format!(
                "Title must be at most {} characters",
                MAX_TITLE_LENGTH
            )));
        }
        if !is_http_url(&input.cover_image_url) {
            return Err(StyleComboServiceError::ValidationError(
                "Cover image must be an http(s) URL".to_string(),
            ));
        }
        if !is_http_url(&input.shop_url) {
            return Err(StyleComboServiceError::ValidationError(
                "Shop URL must be an http(s) URL".to_string(),
            ));
        }
        for item in &input.items {
            if item.label.trim().is_empty() {
                return Err(StyleComboServiceError::ValidationError(
                    "Item label cannot be empty".to_string(),
                ));
            }
            if !is_http_url(&item.url) {
                return Err(StyleComboServiceError::ValidationError(
                    "Item URL must be an http(s) URL".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxSessionRepository, SqlxStyleComboRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::StyleComboItemInput;
    use crate::services::user::{RegisterInput, UserService};

    async fn setup() -> (StyleComboService, i64, i64) {
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

        let service = StyleComboService::new(
            SqlxStyleComboRepository::boxed(pool),
            AffiliateTagger::new("glamscan-20"),
        );
        (service, ids[0], ids[1])
    }

    fn input() -> CreateStyleComboInput {
        CreateStyleComboInput {
            title: "Autumn layers".to_string(),
            description: Some("Warm tones".to_string()),
            cover_image_url: "https://cdn.glamscan.app/c/1.jpg".to_string(),
            shop_url: "https://www.amazon.com/shop/list".to_string(),
            items: vec![
                StyleComboItemInput {
                    label: "wool coat".to_string(),
                    image_url: None,
                    url: "https://www.amazon.com/dp/B0COAT".to_string(),
                },
                StyleComboItemInput {
                    label: "plaid scarf".to_string(),
                    image_url: None,
                    url: "https://shop.example.com/scarf".to_string(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_create_tags_amazon_urls_only() {
        let (service, ana, _) = setup().await;

        let created = service.create(ana, input()).await.expect("create");
        assert!(created.combo.shop_url.contains("tag=glamscan-20"));
        assert!(created.items[0].url.contains("tag=glamscan-20"));
        // Non-Amazon retailer untouched
        assert_eq!(created.items[1].url, "https://shop.example.com/scarf");
    }

    #[tokio::test]
    async fn test_stored_urls_stay_clean() {
        let (service, ana, _) = setup().await;
        let created = service.create(ana, input()).await.expect("create");

        let raw = service
            .list_all_for_matching()
            .await
            .expect("list")
            .into_iter()
            .find(|c| c.combo.id == created.combo.id)
            .expect("combo");
        assert_eq!(raw.combo.shop_url, "https://www.amazon.com/shop/list");
    }

    #[tokio::test]
    async fn test_validation() {
        let (service, ana, _) = setup().await;

        let mut no_title = input();
        no_title.title = "  ".to_string();
        assert!(matches!(
            service.create(ana, no_title).await,
            Err(StyleComboServiceError::ValidationError(_))
        ));

        let mut bad_item = input();
        bad_item.items[0].url = "not-a-url".to_string();
        assert!(matches!(
            service.create(ana, bad_item).await,
            Err(StyleComboServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete_curator_only() {
        let (service, ana, ben) = setup().await;
        let created = service.create(ana, input()).await.expect("create");

        assert!(matches!(
            service.update(created.combo.id, ben, input()).await,
            Err(StyleComboServiceError::Forbidden(_))
        ));
        assert!(matches!(
            service.delete(created.combo.id, ben).await,
            Err(StyleComboServiceError::Forbidden(_))
        ));

        let mut edited = input();
        edited.title = "Winter layers".to_string();
        edited.items.truncate(1);
        let updated = service
            .update(created.combo.id, ana, edited)
            .await
            .expect("update");
        assert_eq!(updated.combo.title, "Winter layers");
        assert_eq!(updated.items.len(), 1);

        service.delete(created.combo.id, ana).await.expect("delete");
        assert!(matches!(
            service.get(created.combo.id).await,
            Err(StyleComboServiceError::NotFound)
        ));
    }
}
