//! Configuration management
//!
//! This module handles loading and parsing configuration for the GlamScan
//! backend. Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Session configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// AI stylist provider configuration
    #[serde(default)]
    pub stylist: StylistConfig,
    /// Affiliate link tagging configuration
    #[serde(default)]
    pub affiliate: AffiliateConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration (SQLite, single-binary deployment)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file path or ":memory:"
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/glamscan.db".to_string()
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in days
    #[serde(default = "default_session_days")]
    pub lifetime_days: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime_days: default_session_days(),
        }
    }
}

fn default_session_days() -> i64 {
    30
}

/// AI stylist provider configuration (OpenAI-compatible API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylistConfig {
    /// Base URL of the provider, without trailing slash
    #[serde(default = "default_stylist_base_url")]
    pub base_url: String,
    /// API key; empty disables the stylist endpoints
    #[serde(default)]
    pub api_key: String,
    /// Chat-completion model used for vision analysis
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    /// Embedding model used for combo matching
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Request timeout in seconds
    #[serde(default = "default_stylist_timeout")]
    pub timeout_seconds: u64,
}

impl Default for StylistConfig {
    fn default() -> Self {
        Self {
            base_url: default_stylist_base_url(),
            api_key: String::new(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            timeout_seconds: default_stylist_timeout(),
        }
    }
}

fn default_stylist_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_stylist_timeout() -> u64 {
    30
}

/// Affiliate link tagging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateConfig {
    /// Value appended as the `tag` query parameter on allow-listed shop URLs
    #[serde(default = "default_affiliate_tag")]
    pub tag: String,
}

impl Default for AffiliateConfig {
    fn default() -> Self {
        Self {
            tag: default_affiliate_tag(),
        }
    }
}

fn default_affiliate_tag() -> String {
    "glamscan-20".to_string()
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file.
    ///
    /// If the file doesn't exist or is empty, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides.
    ///
    /// Environment variables follow the pattern:
    /// - GLAMSCAN_SERVER_HOST
    /// - GLAMSCAN_SERVER_PORT
    /// - GLAMSCAN_SERVER_CORS_ORIGIN
    /// - GLAMSCAN_DATABASE_URL
    /// - GLAMSCAN_SESSION_LIFETIME_DAYS
    /// - GLAMSCAN_STYLIST_BASE_URL
    /// - GLAMSCAN_STYLIST_API_KEY
    /// - GLAMSCAN_STYLIST_CHAT_MODEL
    /// - GLAMSCAN_STYLIST_EMBEDDING_MODEL
    /// - GLAMSCAN_AFFILIATE_TAG
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("GLAMSCAN_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("GLAMSCAN_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("GLAMSCAN_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }
        if let Ok(url) = std::env::var("GLAMSCAN_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(days) = std::env::var("GLAMSCAN_SESSION_LIFETIME_DAYS") {
            if let Ok(days) = days.parse::<i64>() {
                if days > 0 {
                    self.session.lifetime_days = days;
                }
            }
        }
        if let Ok(base_url) = std::env::var("GLAMSCAN_STYLIST_BASE_URL") {
            self.stylist.base_url = base_url;
        }
        if let Ok(api_key) = std::env::var("GLAMSCAN_STYLIST_API_KEY") {
            self.stylist.api_key = api_key;
        }
        if let Ok(model) = std::env::var("GLAMSCAN_STYLIST_CHAT_MODEL") {
            self.stylist.chat_model = model;
        }
        if let Ok(model) = std::env::var("GLAMSCAN_STYLIST_EMBEDDING_MODEL") {
            self.stylist.embedding_model = model;
        }
        if let Ok(tag) = std::env::var("GLAMSCAN_AFFILIATE_TAG") {
            self.affiliate.tag = tag;
        }
    }

    /// Validate the configuration, returning an error for unusable values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be non-zero".to_string(),
            ));
        }
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "database.url must not be empty".to_string(),
            ));
        }
        if self.session.lifetime_days <= 0 {
            return Err(ConfigError::ValidationError(
                "session.lifetime_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
