//! Realtime change events for problem rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::problem::{Problem, ProblemCounts, ProblemStatus};

/// What happened to the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemEventKind {
    Inserted,
    Updated,
    Deleted,
}

impl std::fmt::Display for ProblemEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProblemEventKind::Inserted => write!(f, "inserted"),
            ProblemEventKind::Updated => write!(f, "updated"),
            ProblemEventKind::Deleted => write!(f, "deleted"),
        }
    }
}

/// A change notification carrying the row's state after the change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemEvent {
    pub problem_id: i64,
    pub kind: ProblemEventKind,
    pub status: ProblemStatus,
    pub votes_count: i64,
    pub views_count: i64,
    pub occurred_at: DateTime<Utc>,
}

impl ProblemEvent {
    pub fn from_problem(kind: ProblemEventKind, problem: &Problem) -> Self {
        Self {
            problem_id: problem.id,
            kind,
            status: problem.status,
            votes_count: problem.votes_count,
            views_count: problem.views_count,
            occurred_at: Utc::now(),
        }
    }

    pub fn counts(&self) -> ProblemCounts {
        ProblemCounts {
            votes_count: self.votes_count,
            views_count: self.views_count,
        }
    }

    /// SSE event name.
    pub fn event_name(&self) -> &'static str {
        match self.kind {
            ProblemEventKind::Inserted => "problem.inserted",
            ProblemEventKind::Updated => "problem.updated",
            ProblemEventKind::Deleted => "problem.deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = ProblemEvent {
            problem_id: 7,
            kind: ProblemEventKind::Updated,
            status: ProblemStatus::InProgress,
            votes_count: 3,
            views_count: 10,
            occurred_at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["problemId"], 7);
        assert_eq!(json["kind"], "updated");
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["votesCount"], 3);
        assert_eq!(event.event_name(), "problem.updated");
    }
}
