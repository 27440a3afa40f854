//! Repository implementations.
//!
//! Repositories provide data access methods for entities.

pub mod problem;
pub mod setting;

pub use problem::ProblemRepository;
pub use setting::SettingRepository;
