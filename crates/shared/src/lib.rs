//! Shared utilities and common types for the complaint portal backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Hashing helpers for the admin API key
//! - Field validation shared by the submission flow and the HTTP layer
//! - Page-based pagination arithmetic

pub mod crypto;
pub mod pagination;
pub mod validation;
