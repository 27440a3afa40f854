//! Domain layer for the complaint portal.
//!
//! This crate contains:
//! - Domain models (Problem, settings taxonomy, statistics, change events)
//! - The submission and engagement flows, expressed as I/O-free state
//!   machines over backend traits

pub mod models;
pub mod services;
