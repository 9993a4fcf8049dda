//! Saved item model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a saved item points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavedTargetType {
    Post,
    StyleCombo,
}

impl std::fmt::Display for SavedTargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Post => write!(f, "post"),
            Self::StyleCombo => write!(f, "style_combo"),
        }
    }
}

impl std::str::FromStr for SavedTargetType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "post" => Ok(Self::Post),
            "style_combo" => Ok(Self::StyleCombo),
            _ => Err(anyhow::anyhow!("Invalid saved item target type: {}", s)),
        }
    }
}

/// A user's bookmark of a post or style combo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedItem {
    pub id: i64,
    pub user_id: i64,
    pub target_type: SavedTargetType,
    pub target_id: i64,
    pub created_at: DateTime<Utc>,
}
