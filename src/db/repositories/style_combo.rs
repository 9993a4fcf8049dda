use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use crate::models::{StyleCombo, StyleComboItem, StyleComboItemInput, StyleComboWithItems};

/// Style combo repository trait
#[async_trait]
pub trait StyleComboRepository: Send + Sync {
    /// Create a combo with its items in one transaction, preserving
    /// the input order as item positions
    async fn create_with_items(
        &self,
        combo: &StyleCombo,
        items: &[StyleComboItemInput],
    ) -> Result<StyleComboWithItems>;

    /// Get a combo with its ordered items
    async fn get_with_items(&self, id: i64) -> Result<Option<StyleComboWithItems>>;

    /// Combos newest first
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<StyleComboWithItems>>;

    /// Combos curated by one user, newest first
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<StyleComboWithItems>>;

    /// Every combo with items, for embedding-based matching
    async fn list_all_with_items(&self) -> Result<Vec<StyleComboWithItems>>;

    /// Replace a combo's fields and its item set in one transaction
    async fn update_with_items(
        &self,
        id: i64,
        combo: &StyleCombo,
        items: &[StyleComboItemInput],
    ) -> Result<StyleComboWithItems>;

    /// Delete a combo; items cascade
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based style combo repository
pub struct SqlxStyleComboRepository {
    pool: SqlitePool,
}

impl SqlxStyleComboRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn StyleComboRepository> {
        Arc::new(Self::new(pool))
    }

    async fn items_for(&self, combo_id: i64) -> Result<Vec<StyleComboItem>> {
        let rows = sqlx::query(
            "SELECT * FROM style_combo_items WHERE combo_id = ? ORDER BY position ASC",
        )
        .bind(combo_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list combo items")?;

        Ok(rows.iter().map(row_to_item).collect())
    }

    async fn with_items(&self, combos: Vec<StyleCombo>) -> Result<Vec<StyleComboWithItems>> {
        let mut out = Vec::with_capacity(combos.len());
        for combo in combos {
            let items = self.items_for(combo.id).await?;
            out.push(StyleComboWithItems { combo, items });
        }
        Ok(out)
    }
}

#[async_trait]
impl StyleComboRepository for SqlxStyleComboRepository {
    async fn create_with_items(
        &self,
        combo: &StyleCombo,
        items: &[StyleComboItemInput],
    ) -> Result<StyleComboWithItems> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO style_combos (user_id, title, description, cover_image_url, shop_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(combo.user_id)
        .bind(&combo.title)
        .bind(&combo.description)
        .bind(&combo.cover_image_url)
        .bind(&combo.shop_url)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create style combo")?;

        let combo_id = result.last_insert_rowid();
        let created_items = insert_items(&mut tx, combo_id, items).await?;

        tx.commit().await.context("Failed to commit style combo")?;

        let mut created = combo.clone();
        created.id = combo_id;
        created.created_at = now;
        created.updated_at = now;

        Ok(StyleComboWithItems {
            combo: created,
            items: created_items,
        })
    }

    async fn get_with_items(&self, id: i64) -> Result<Option<StyleComboWithItems>> {
        let row = sqlx::query("SELECT * FROM style_combos WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get style combo")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let combo = row_to_combo(&row);
        let items = self.items_for(combo.id).await?;
        Ok(Some(StyleComboWithItems { combo, items }))
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<StyleComboWithItems>> {
        let rows = sqlx::query(
            "SELECT * FROM style_combos ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list style combos")?;

        self.with_items(rows.iter().map(row_to_combo).collect()).await
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<StyleComboWithItems>> {
        let rows = sqlx::query(
            "SELECT * FROM style_combos WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list user style combos")?;

        self.with_items(rows.iter().map(row_to_combo).collect()).await
    }

    async fn list_all_with_items(&self) -> Result<Vec<StyleComboWithItems>> {
        let rows = sqlx::query("SELECT * FROM style_combos ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list style combos")?;

        self.with_items(rows.iter().map(row_to_combo).collect()).await
    }

    async fn update_with_items(
        &self,
        id: i64,
        combo: &StyleCombo,
        items: &[StyleComboItemInput],
    ) -> Result<StyleComboWithItems> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE style_combos
            SET title = ?, description = ?, cover_image_url = ?, shop_url = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&combo.title)
        .bind(&combo.description)
        .bind(&combo.cover_image_url)
        .bind(&combo.shop_url)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to update style combo")?;

        // Full item-set replacement keeps positions dense
        sqlx::query("DELETE FROM style_combo_items WHERE combo_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear combo items")?;

        let updated_items = insert_items(&mut tx, id, items).await?;

        tx.commit().await.context("Failed to commit style combo update")?;

        let mut updated = combo.clone();
        updated.id = id;
        updated.updated_at = now;

        Ok(StyleComboWithItems {
            combo: updated,
            items: updated_items,
        })
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM style_combos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete style combo")?;

        Ok(result.rows_affected() > 0)
    }
}

async fn insert_items(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    combo_id: i64,
    items: &[StyleComboItemInput],
) -> Result<Vec<StyleComboItem>> {
    let mut created = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        let result = sqlx::query(
            r#"
            INSERT INTO style_combo_items (combo_id, position, label, image_url, url)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(combo_id)
        .bind(position as i64)
        .bind(&item.label)
        .bind(&item.image_url)
        .bind(&item.url)
        .execute(&mut **tx)
        .await
        .context("Failed to insert combo item")?;

        created.push(StyleComboItem {
            id: result.last_insert_rowid(),
            combo_id,
            position: position as i64,
            label: item.label.clone(),
            image_url: item.image_url.clone(),
            url: item.url.clone(),
        });
    }
    Ok(created)
}

fn row_to_combo(row: &sqlx::sqlite::SqliteRow) -> StyleCombo {
    StyleCombo {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        description: row.get("description"),
        cover_image_url: row.get("cover_image_url"),
        shop_url: row.get("shop_url"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> StyleComboItem {
    StyleComboItem {
        id: row.get("id"),
        combo_id: row.get("combo_id"),
        position: row.get("position"),
        label: row.get("label"),
        image_url: row.get("image_url"),
        url: row.get("url"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::user::SqlxUserRepository;
    use crate::db::repositories::UserRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;

    async fn setup() -> (SqlxStyleComboRepository, i64) {
        let pool = create_test_pool().await.expect("pool");
        migrations::run_migrations(&pool).await.expect("migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let user = users
            .create(&User::new(
                "ana".to_string(),
                "ana@example.com".to_string(),
                "hash".to_string(),
            ))
            .await
            .expect("user");

        (SqlxStyleComboRepository::new(pool), user.id)
    }

    fn combo(user_id: i64, title: &str) -> StyleCombo {
        let now = Utc::now();
        StyleCombo {
            id: 0,
            user_id,
            title: title.to_string(),
            description: Some("layered looks".to_string()),
            cover_image_url: "https://cdn.glamscan.app/c/1.jpg".to_string(),
            shop_url: "https://www.amazon.com/shop/list".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn item(label: &str) -> StyleComboItemInput {
        StyleComboItemInput {
            label: label.to_string(),
            image_url: None,
            url: format!("https://www.amazon.com/dp/{}", label.replace(' ', "")),
        }
    }

    #[tokio::test]
    async fn test_create_preserves_item_order() {
        let (repo, user_id) = setup().await;

        let created = repo
            .create_with_items(
                &combo(user_id, "Autumn layers"),
                &[item("wool coat"), item("plaid scarf"), item("boots")],
            )
            .await
            .expect("create");

        assert_eq!(created.items.len(), 3);
        let labels: Vec<&str> = created.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["wool coat", "plaid scarf", "boots"]);
        assert_eq!(created.items[2].position, 2);

        let fetched = repo
            .get_with_items(created.combo.id)
            .await
            .expect("get")
            .expect("some");
        let labels: Vec<&str> = fetched.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["wool coat", "plaid scarf", "boots"]);
    }

    #[tokio::test]
    async fn test_update_replaces_item_set() {
        let (repo, user_id) = setup().await;

        let created = repo
            .create_with_items(&combo(user_id, "Autumn layers"), &[item("wool coat")])
            .await
            .expect("create");

        let mut edited = created.combo.clone();
        edited.title = "Winter layers".to_string();

        let updated = repo
            .update_with_items(
                created.combo.id,
                &edited,
                &[item("parka"), item("beanie")],
            )
            .await
            .expect("update");

        assert_eq!(updated.combo.title, "Winter layers");
        assert_eq!(updated.items.len(), 2);
        assert_eq!(updated.items[0].position, 0);

        // Old item rows are gone
        let fetched = repo
            .get_with_items(created.combo.id)
            .await
            .expect("get")
            .expect("some");
        assert!(fetched.items.iter().all(|i| i.label != "wool coat"));
    }

    #[tokio::test]
    async fn test_delete_cascades_items() {
        let (repo, user_id) = setup().await;

        let created = repo
            .create_with_items(&combo(user_id, "Autumn layers"), &[item("wool coat")])
            .await
            .expect("create");

        assert!(repo.delete(created.combo.id).await.expect("delete"));
        assert!(repo
            .get_with_items(created.combo.id)
            .await
            .expect("get")
            .is_none());

        let orphans: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM style_combo_items WHERE combo_id = ?")
                .bind(created.combo.id)
                .fetch_one(&repo.pool)
                .await
                .expect("count");
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (repo, user_id) = setup().await;

        for title in ["first", "second"] {
            repo.create_with_items(&combo(user_id, title), &[item("thing")])
                .await
                .expect("create");
        }

        let all = repo.list(10, 0).await.expect("list");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].combo.title, "second");

        let by_user = repo.list_by_user(user_id).await.expect("list");
        assert_eq!(by_user.len(), 2);
    }
}
