//! Persistence layer for the complaint portal.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - Query timing metrics

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;

pub use db::{create_lazy_pool, create_pool, run_migrations, DatabaseConfig};
