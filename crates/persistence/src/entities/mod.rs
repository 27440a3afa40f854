//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod problem;
pub mod setting;

pub use problem::{ProblemCategoryDb, ProblemEntity, ProblemStatusDb, UpazilaStatusEntity};
pub use setting::{AppSettingEntity, SiteSettingEntity};
