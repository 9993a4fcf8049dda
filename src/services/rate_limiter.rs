//! Login rate limiter
//!
//! In-process fixed-window limiter guarding the login endpoint:
//! - per username: 5 failed attempts per 15 minutes
//! - per IP: 10 requests per minute
//!
//! State is a pair of in-memory maps swept by a periodic cleanup task.
//! Counts reset on restart and are not shared across instances.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

const USERNAME_MAX_ATTEMPTS: usize = 5;
const USERNAME_WINDOW_MINUTES: i64 = 15;
const IP_MAX_REQUESTS: usize = 10;
const IP_WINDOW_MINUTES: i64 = 1;

/// Login rate limiter
pub struct LoginRateLimiter {
    /// Failed login attempts by username (lowercased)
    username_attempts: Arc<RwLock<HashMap<String, Vec<DateTime<Utc>>>>>,
    /// Login requests by IP address
    ip_attempts: Arc<RwLock<HashMap<IpAddr, Vec<DateTime<Utc>>>>>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            username_attempts: Arc::new(RwLock::new(HashMap::new())),
            ip_attempts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Whether this username has exhausted its failure budget
    pub async fn is_username_limited(&self, username: &str) -> bool {
        let mut attempts = self.username_attempts.write().await;
        let cutoff = Utc::now() - Duration::minutes(USERNAME_WINDOW_MINUTES);

        let entries = attempts.entry(username.to_lowercase()).or_default();
        entries.retain(|time| *time > cutoff);

        entries.len() >= USERNAME_MAX_ATTEMPTS
    }

    /// Seconds until the username window opens again, for the Retry-After
    /// header; zero when not limited
    pub async fn username_retry_after(&self, username: &str) -> i64 {
        let attempts = self.username_attempts.read().await;
        let cutoff = Utc::now() - Duration::minutes(USERNAME_WINDOW_MINUTES);

        let Some(entries) = attempts.get(&username.to_lowercase()) else {
            return 0;
        };
        let recent: Vec<_> = entries.iter().filter(|t| **t > cutoff).collect();
        if recent.len() < USERNAME_MAX_ATTEMPTS {
            return 0;
        }

        // Window opens when the oldest counted attempt ages out
        recent
            .iter()
            .min()
            .map(|oldest| {
                let reopens = **oldest + Duration::minutes(USERNAME_WINDOW_MINUTES);
                (reopens - Utc::now()).num_seconds().max(1)
            })
            .unwrap_or(0)
    }

    /// Record a failed login attempt for a username
    pub async fn record_failed_attempt(&self, username: &str) {
        let mut attempts = self.username_attempts.write().await;
        attempts
            .entry(username.to_lowercase())
            .or_default()
            .push(Utc::now());
    }

    /// Clear a username's failure history (on successful login)
    pub async fn clear_username_attempts(&self, username: &str) {
        let mut attempts = self.username_attempts.write().await;
        attempts.remove(&username.to_lowercase());
    }

    /// Whether this IP has exhausted its request budget
    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        let mut attempts = self.ip_attempts.write().await;
        let cutoff = Utc::now() - Duration::minutes(IP_WINDOW_MINUTES);

        let entries = attempts.entry(ip).or_default();
        entries.retain(|time| *time > cutoff);

        entries.len() >= IP_MAX_REQUESTS
    }

    /// Record a login request from an IP
    pub async fn record_ip_request(&self, ip: IpAddr) {
        let mut attempts = self.ip_attempts.write().await;
        attempts.entry(ip).or_default().push(Utc::now());
    }

    /// Drop aged-out entries; called periodically from a background task
    pub async fn cleanup(&self) {
        let now = Utc::now();
        let username_cutoff = now - Duration::minutes(USERNAME_WINDOW_MINUTES);
        let ip_cutoff = now - Duration::minutes(IP_WINDOW_MINUTES);

        {
            let mut attempts = self.username_attempts.write().await;
            attempts.retain(|_, times| {
                times.retain(|time| *time > username_cutoff);
                !times.is_empty()
            });
        }

        {
            let mut attempts = self.ip_attempts.write().await;
            attempts.retain(|_, times| {
                times.retain(|time| *time > ip_cutoff);
                !times.is_empty()
            });
        }
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
