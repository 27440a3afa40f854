//! HTTP route handlers.

pub mod admin;
pub mod assets;
pub mod engagement;
pub mod events;
pub mod health;
pub mod problems;
pub mod settings;
pub mod stats;
