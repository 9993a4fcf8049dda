//! AI stylist
//!
//! Talks to an OpenAI-compatible provider for two things: a vision chat
//! completion that turns a selfie into a structured style profile, and an
//! embeddings endpoint used to match profiles against style combos.
//!
//! The provider sits behind the `StylistClient` trait so the service and
//! its tests run against a stub; `HttpStylistClient` is the `reqwest`
//! implementation. Provider errors surface as `ProviderError` and are
//! sanitized before reaching clients.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::config::StylistConfig;
use crate::services::recommend::{rank_by_similarity, RankedCombo};
use crate::services::style_combo::StyleComboService;

/// Default number of combos returned by the matcher
const DEFAULT_MATCH_LIMIT: usize = 5;

/// System prompt for the style profile chat completion. The reply must be
/// a bare JSON object matching `StyleProfile`.
const STYLE_PROFILE_PROMPT: &str = "You are a professional fashion stylist. \
Analyze the person's photo and reply with ONLY a JSON object, no markdown, \
with these fields: \"season\" (color season, e.g. \"warm autumn\"), \
\"palette\" (array of hex colors that flatter them), \
\"outfit_suggestions\" (array of strings), \
\"makeup_suggestions\" (array of strings), \
\"search_terms\" (array of short shoppable search phrases).";

/// Error types for stylist operations
#[derive(Debug, thiserror::Error)]
pub enum StylistServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Upstream AI provider failed; message is already safe to show
    #[error("Stylist provider error: {0}")]
    ProviderError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Structured style profile parsed from the model's reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleProfile {
    pub season: String,
    #[serde(default)]
    pub palette: Vec<String>,
    #[serde(default)]
    pub outfit_suggestions: Vec<String>,
    #[serde(default)]
    pub makeup_suggestions: Vec<String>,
    #[serde(default)]
    pub search_terms: Vec<String>,
}

impl StyleProfile {
    /// Text handed to the embeddings endpoint when matching combos
    pub fn embedding_text(&self) -> String {
        let mut parts = vec![self.season.clone()];
        parts.extend(self.outfit_suggestions.iter().cloned());
        parts.extend(self.search_terms.iter().cloned());
        parts.join(". ")
    }
}

/// Input for a recommendation request
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationInput {
    pub image_url: String,
    pub occasion: Option<String>,
    pub budget: Option<String>,
}

/// Abstraction over the AI provider: vision chat plus embeddings
#[async_trait]
pub trait StylistClient: Send + Sync {
    /// Chat completion; `image_url` attaches a vision part when present
    async fn chat(&self, system: &str, user_text: &str, image_url: Option<&str>)
        -> Result<String>;

    /// Embedding vector for a text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// `reqwest` client for an OpenAI-compatible API
pub struct HttpStylistClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
}

impl HttpStylistClient {
    pub fn new(config: &StylistConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }

    pub fn boxed(config: &StylistConfig) -> Result<Arc<dyn StylistClient>> {
        Ok(Arc::new(Self::new(config)?))
    }
}

#[async_trait]
impl StylistClient for HttpStylistClient {
    async fn chat(
        &self,
        system: &str,
        user_text: &str,
        image_url: Option<&str>,
    ) -> Result<String> {
        let user_content = match image_url {
            Some(url) => json!([
                { "type": "text", "text": user_text },
                { "type": "image_url", "image_url": { "url": url } },
            ]),
            None => json!(user_text),
        };

        let body = json!({
            "model": self.chat_model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user_content },
            ],
        });

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Chat completion returned status {}", status);
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .context("Failed to decode chat completion response")?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .context("Chat completion response had no content")
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({
            "model": self.embedding_model,
            "input": text,
        });

        let response = self
            .http
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Embedding request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Embeddings endpoint returned status {}", status);
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .context("Failed to decode embedding response")?;

        let embedding = payload["data"][0]["embedding"]
            .as_array()
            .context("Embedding response had no vector")?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        Ok(embedding)
    }
}

/// Stylist service: recommendations and combo matching
pub struct StylistService {
    client: Arc<dyn StylistClient>,
    combos: Arc<StyleComboService>,
}

impl StylistService {
    pub fn new(client: Arc<dyn StylistClient>, combos: Arc<StyleComboService>) -> Self {
        Self { client, combos }
    }

    /// Analyze a selfie into a style profile.
    pub async fn recommend(
        &self,
        input: RecommendationInput,
    ) -> Result<StyleProfile, StylistServiceError> {
        if !input.image_url.starts_with("http://") && !input.image_url.starts_with("https://") {
            return Err(StylistServiceError::ValidationError(
                "Image URL must be an http(s) URL".to_string(),
            ));
        }

        let mut user_text = String::from("Analyze this look.");
        if let Some(occasion) = input.occasion.as_deref().filter(|s| !s.trim().is_empty()) {
            user_text.push_str(&format!(" Occasion: {}.", occasion.trim()));
        }
        if let Some(budget) = input.budget.as_deref().filter(|s| !s.trim().is_empty()) {
            user_text.push_str(&format!(" Budget: {}.", budget.trim()));
        }

        let reply = self
            .client
            .chat(STYLE_PROFILE_PROMPT, &user_text, Some(&input.image_url))
            .await
            .map_err(|e| {
                tracing::warn!("Stylist chat call failed: {:#}", e);
                StylistServiceError::ProviderError(
                    "The stylist is unavailable right now, try again shortly".to_string(),
                )
            })?;

        parse_style_profile(&reply).ok_or_else(|| {
            tracing::warn!("Unparseable stylist reply: {}", reply);
            StylistServiceError::ProviderError(
                "The stylist returned an unexpected answer, try again".to_string(),
            )
        })
    }

    /// Rank every style combo against a profile by embedding similarity.
    ///
    /// Brute force by design: one embedding call per combo plus one for the
    /// query, then an O(n) cosine scan.
    pub async fn match_combos(
        &self,
        profile: &StyleProfile,
        limit: Option<usize>,
    ) -> Result<Vec<RankedCombo>, StylistServiceError> {
        let query_text = profile.embedding_text();
        if query_text.trim().is_empty() {
            return Err(StylistServiceError::ValidationError(
                "Style profile is empty".to_string(),
            ));
        }

        let query = self.client.embed(&query_text).await.map_err(|e| {
            tracing::warn!("Query embedding failed: {:#}", e);
            StylistServiceError::ProviderError(
                "The stylist is unavailable right now, try again shortly".to_string(),
            )
        })?;

        let combos = self
            .combos
            .list_all_for_matching()
            .await
            .context("Failed to load combos for matching")?;

        let mut embedded = Vec::with_capacity(combos.len());
        for combo in combos {
            let vector = self
                .client
                .embed(&combo.embedding_text())
                .await
                .map_err(|e| {
                    tracing::warn!("Combo embedding failed: {:#}", e);
                    StylistServiceError::ProviderError(
                        "The stylist is unavailable right now, try again shortly".to_string(),
                    )
                })?;
            embedded.push((self.combos.tag(combo), vector));
        }

        Ok(rank_by_similarity(
            &query,
            embedded,
            limit.unwrap_or(DEFAULT_MATCH_LIMIT),
        ))
    }
}

/// Parse the model reply into a profile, tolerating markdown code fences
/// and leading prose around the JSON object.
fn parse_style_profile(reply: &str) -> Option<StyleProfile> {
    let trimmed = reply.trim();

    if let Ok(profile) = serde_json::from_str(trimmed) {
        return Some(profile);
    }

    // ```json ... ``` fences
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim);
    if let Some(inner) = unfenced {
        if let Ok(profile) = serde_json::from_str(inner) {
            return Some(profile);
        }
    }

    // Last resort: the outermost brace span
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    serde_json::from_str(&trimmed[start..=end]).ok()
}
