//! Client-side flows of the portal.
//!
//! Services hold UI-agnostic state and talk to the portal through backend
//! traits, so they can run against the HTTP client or an in-memory fake.

pub mod engagement;
pub mod submission;

use thiserror::Error;

pub use engagement::{
    view_marker, vote_marker, EngagementBackend, EngagementError, EngagementTracker,
    LiveCounters, MarkerStore, MemoryMarkerStore, ViewOutcome, VoteOutcome,
};
pub use submission::{
    submit_draft, DraftField, FieldError, FieldErrors, FormState, ImageAttachment,
    SubmissionBackend, SubmissionDraft, SubmissionError, SubmissionForm, SubmissionStep,
    SubmissionSummary,
};

/// Failure reported by a backend implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The portal could not be reached or answered unexpectedly.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    /// The portal refused the request.
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    /// The target row does not exist.
    #[error("not found")]
    NotFound,
}
