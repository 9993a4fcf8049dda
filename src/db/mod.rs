//! Database layer
//!
//! SQLite-backed persistence for the GlamScan backend. The pool is plain
//! `sqlx::SqlitePool`; repositories are trait objects so services can be
//! tested against fakes.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool};
