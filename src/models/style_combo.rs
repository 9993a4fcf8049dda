//! Style combo models
//!
//! A style combo is a curated bundle of shoppable items with a cover image
//! and an outbound shop link. Items keep their input order via `position`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Style combo entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleCombo {
    pub id: i64,
    /// Curator
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub cover_image_url: String,
    /// Outbound shopping link; affiliate-tagged when served
    pub shop_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One item in a combo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleComboItem {
    pub id: i64,
    pub combo_id: i64,
    /// Zero-based ordering within the combo
    pub position: i64,
    pub label: String,
    pub image_url: Option<String>,
    pub url: String,
}

/// Combo with its ordered items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleComboWithItems {
    #[serde(flatten)]
    pub combo: StyleCombo,
    pub items: Vec<StyleComboItem>,
}

impl StyleComboWithItems {
    /// Text used for embedding-based matching: title, description, and
    /// item labels concatenated.
    pub fn embedding_text(&self) -> String {
        let mut text = self.combo.title.clone();
        if let Some(desc) = &self.combo.description {
            if !desc.trim().is_empty() {
                text.push_str(". ");
                text.push_str(desc.trim());
            }
        }
        for item in &self.items {
            text.push_str(". ");
            text.push_str(&item.label);
        }
        text
    }
}

/// Input item for create/update
#[derive(Debug, Clone, Deserialize)]
pub struct StyleComboItemInput {
    pub label: String,
    pub image_url: Option<String>,
    pub url: String,
}

/// Input for creating a combo
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStyleComboInput {
    pub title: String,
    pub description: Option<String>,
    pub cover_image_url: String,
    pub shop_url: String,
    pub items: Vec<StyleComboItemInput>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combo_with_items(items: Vec<&str>) -> StyleComboWithItems {
        let now = Utc::now();
        StyleComboWithItems {
            combo: StyleCombo {
                id: 1,
                user_id: 1,
                title: "Autumn layers".to_string(),
                description: Some("Warm tones for October".to_string()),
                cover_image_url: "https://cdn.glamscan.app/c/1.jpg".to_string(),
                shop_url: "https://www.amazon.com/shop/list".to_string(),
                created_at: now,
                updated_at: now,
            },
            items: items
                .into_iter()
                .enumerate()
                .map(|(i, label)| StyleComboItem {
                    id: i as i64 + 1,
                    combo_id: 1,
                    position: i as i64,
                    label: label.to_string(),
                    image_url: None,
                    url: "https://shop.example.com".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_embedding_text_includes_title_description_items() {
        let combo = combo_with_items(vec!["wool coat", "plaid scarf"]);
        let text = combo.embedding_text();
        assert!(text.contains("Autumn layers"));
        assert!(text.contains("Warm tones for October"));
        assert!(text.contains("wool coat"));
        assert!(text.contains("plaid scarf"));
    }

    #[test]
    fn test_embedding_text_skips_blank_description() {
        let mut combo = combo_with_items(vec!["wool coat"]);
        combo.combo.description = Some("   ".to_string());
        let text = combo.embedding_text();
        assert_eq!(text, "Autumn layers. wool coat");
    }
}
