//! Domain models.

pub mod event;
pub mod problem;
pub mod setting;
pub mod stats;

pub use event::{ProblemEvent, ProblemEventKind};
pub use problem::{
    AdminListProblemsQuery, CreateProblemRequest, DeleteProblemQuery, ListProblemsQuery,
    NewProblem, Pagination, ParseEnumError, Problem, ProblemCategory, ProblemCounts,
    ProblemFilter, ProblemPage, ProblemStatus, RecentProblemsQuery, SearchScope,
    UpdateStatusRequest,
};
pub use setting::{
    CandidateInfo, SettingKey, SettingsOption, SiteAssetFolder, SiteInfo, SiteSettingType,
    SiteSettings, SocialLinks, Taxonomy,
};
pub use stats::{BucketCount, ProblemStats, StatusCounts, UpazilaStats};
