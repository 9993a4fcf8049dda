//! GlamScan - social fashion backend
//!
//! This library provides the core functionality for the GlamScan service:
//! hot-or-not post voting, style combos, friends and messaging, and
//! AI-assisted outfit recommendations.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
