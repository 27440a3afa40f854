//! Vote and view counters.
//!
//! Votes are limited to one per device and problem through a persistent
//! marker; views to one per session and problem through a session marker.
//! Neither is a durable per-user constraint. Local vote increments are
//! predictions: confirmed counts from a write response or a change event
//! always overwrite them.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, warn};

use super::BackendError;
use crate::models::event::{ProblemEvent, ProblemEventKind};
use crate::models::problem::{Problem, ProblemCounts};

/// Marker key recorded after voting on a problem.
pub fn vote_marker(problem_id: i64) -> String {
    format!("voted_{}", problem_id)
}

/// Marker key recorded before counting a view of a problem.
pub fn view_marker(problem_id: i64) -> String {
    format!("viewed_{}", problem_id)
}

/// Key/flag storage backing the vote and view markers.
///
/// The device store outlives sessions; the session store does not.
pub trait MarkerStore: Send + Sync {
    fn is_set(&self, key: &str) -> bool;
    fn set(&self, key: &str);
    fn clear(&self, key: &str);
}

/// In-memory marker store.
#[derive(Debug, Default)]
pub struct MemoryMarkerStore {
    markers: Mutex<HashSet<String>>,
}

impl MemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MarkerStore for MemoryMarkerStore {
    fn is_set(&self, key: &str) -> bool {
        self.markers
            .lock()
            .map(|markers| markers.contains(key))
            .unwrap_or(false)
    }

    fn set(&self, key: &str) {
        if let Ok(mut markers) = self.markers.lock() {
            markers.insert(key.to_string());
        }
    }

    fn clear(&self, key: &str) {
        if let Ok(mut markers) = self.markers.lock() {
            markers.remove(key);
        }
    }
}

/// Counter writes the engagement flow needs from the portal.
#[async_trait::async_trait]
pub trait EngagementBackend: Send + Sync {
    /// Adds one vote and returns the stored counts.
    async fn record_vote(&self, problem_id: i64) -> Result<ProblemCounts, BackendError>;

    /// Adds one view and returns the stored counts.
    async fn record_view(&self, problem_id: i64) -> Result<ProblemCounts, BackendError>;
}

/// Errors from counter writes.
#[derive(Debug, Error)]
pub enum EngagementError {
    #[error("recording the vote failed: {0}")]
    Vote(#[source] BackendError),

    #[error("recording the view failed: {0}")]
    View(#[source] BackendError),
}

/// Outcome of a vote attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded(ProblemCounts),
    AlreadyVoted,
}

/// Outcome of a view attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOutcome {
    Recorded(ProblemCounts),
    AlreadyViewed,
}

/// Live counts for one displayed problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveCounters {
    problem_id: i64,
    votes_count: i64,
    views_count: i64,
    deleted: bool,
}

impl LiveCounters {
    pub fn new(problem_id: i64, counts: ProblemCounts) -> Self {
        Self {
            problem_id,
            votes_count: counts.votes_count,
            views_count: counts.views_count,
            deleted: false,
        }
    }

    pub fn from_problem(problem: &Problem) -> Self {
        Self::new(problem.id, problem.counts())
    }

    pub fn problem_id(&self) -> i64 {
        self.problem_id
    }

    pub fn votes_count(&self) -> i64 {
        self.votes_count
    }

    pub fn views_count(&self) -> i64 {
        self.views_count
    }

    pub fn counts(&self) -> ProblemCounts {
        ProblemCounts {
            votes_count: self.votes_count,
            views_count: self.views_count,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Applies a change event. Returns whether anything changed.
    ///
    /// Events for other problems are ignored and applying the same event
    /// twice has no further effect.
    pub fn apply(&mut self, event: &ProblemEvent) -> bool {
        if event.problem_id != self.problem_id {
            return false;
        }
        if event.kind == ProblemEventKind::Deleted {
            let changed = !self.deleted;
            self.deleted = true;
            return changed;
        }
        self.confirm(event.counts())
    }

    /// Overwrites local counts with confirmed ones.
    pub fn confirm(&mut self, counts: ProblemCounts) -> bool {
        let changed = counts != self.counts();
        if changed {
            self.votes_count = counts.votes_count;
            self.views_count = counts.views_count;
        }
        changed
    }

    fn predict_vote(&mut self) {
        self.votes_count += 1;
    }

    fn revert_vote(&mut self) {
        self.votes_count = (self.votes_count - 1).max(0);
    }
}

/// Gates vote and view writes with device and session markers.
#[derive(Clone)]
pub struct EngagementTracker {
    device: Arc<dyn MarkerStore>,
    session: Arc<dyn MarkerStore>,
}

impl EngagementTracker {
    pub fn new(device: Arc<dyn MarkerStore>, session: Arc<dyn MarkerStore>) -> Self {
        Self { device, session }
    }

    /// Tracker backed by fresh in-memory stores.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryMarkerStore::new()),
            Arc::new(MemoryMarkerStore::new()),
        )
    }

    pub fn has_voted(&self, problem_id: i64) -> bool {
        self.device.is_set(&vote_marker(problem_id))
    }

    pub fn has_viewed(&self, problem_id: i64) -> bool {
        self.session.is_set(&view_marker(problem_id))
    }

    /// Votes once per device.
    ///
    /// The count is incremented and the marker set before the write; a failed
    /// write restores the previous count and clears the marker.
    pub async fn vote<B>(
        &self,
        backend: &B,
        counters: &mut LiveCounters,
    ) -> Result<VoteOutcome, EngagementError>
    where
        B: EngagementBackend + ?Sized,
    {
        let problem_id = counters.problem_id();
        let marker = vote_marker(problem_id);
        if self.device.is_set(&marker) {
            return Ok(VoteOutcome::AlreadyVoted);
        }

        counters.predict_vote();
        self.device.set(&marker);

        match backend.record_vote(problem_id).await {
            Ok(counts) => {
                counters.confirm(counts);
                debug!(problem_id, votes_count = counts.votes_count, "Vote recorded");
                Ok(VoteOutcome::Recorded(counts))
            }
            Err(err) => {
                warn!(problem_id, error = %err, "Vote failed, rolling back");
                counters.revert_vote();
                self.device.clear(&marker);
                Err(EngagementError::Vote(err))
            }
        }
    }

    /// Counts a view once per session.
    ///
    /// The session marker is set before the write and stays set on failure.
    pub async fn view<B>(
        &self,
        backend: &B,
        counters: &mut LiveCounters,
    ) -> Result<ViewOutcome, EngagementError>
    where
        B: EngagementBackend + ?Sized,
    {
        let problem_id = counters.problem_id();
        let marker = view_marker(problem_id);
        if self.session.is_set(&marker) {
            return Ok(ViewOutcome::AlreadyViewed);
        }
        self.session.set(&marker);

        let counts = backend
            .record_view(problem_id)
            .await
            .map_err(EngagementError::View)?;
        counters.confirm(counts);
        debug!(problem_id, views_count = counts.views_count, "View recorded");
        Ok(ViewOutcome::Recorded(counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::problem::ProblemStatus;
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Keeps server-side counts and applies the same read-then-write update.
    #[derive(Default)]
    struct FakeBackend {
        counts: Mutex<ProblemCounts>,
        fail: AtomicBool,
    }

    #[async_trait::async_trait]
    impl EngagementBackend for FakeBackend {
        async fn record_vote(&self, _problem_id: i64) -> Result<ProblemCounts, BackendError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(BackendError::Unavailable("offline".to_string()));
            }
            let mut counts = self.counts.lock().unwrap();
            counts.votes_count += 1;
            Ok(*counts)
        }

        async fn record_view(&self, _problem_id: i64) -> Result<ProblemCounts, BackendError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(BackendError::Unavailable("offline".to_string()));
            }
            let mut counts = self.counts.lock().unwrap();
            counts.views_count += 1;
            Ok(*counts)
        }
    }

    fn event(problem_id: i64, kind: ProblemEventKind, votes: i64, views: i64) -> ProblemEvent {
        ProblemEvent {
            problem_id,
            kind,
            status: ProblemStatus::Pending,
            votes_count: votes,
            views_count: views,
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn test_markers() {
        assert_eq!(vote_marker(42), "voted_42");
        assert_eq!(view_marker(42), "viewed_42");
    }

    #[test]
    fn test_memory_marker_store() {
        let store = MemoryMarkerStore::new();
        assert!(!store.is_set("voted_1"));
        store.set("voted_1");
        assert!(store.is_set("voted_1"));
        store.clear("voted_1");
        assert!(!store.is_set("voted_1"));
    }

    #[tokio::test]
    async fn test_vote_twice_counts_once() {
        let backend = FakeBackend::default();
        let tracker = EngagementTracker::in_memory();
        let mut counters = LiveCounters::new(1, ProblemCounts::default());

        let first = tracker.vote(&backend, &mut counters).await.unwrap();
        assert!(matches!(first, VoteOutcome::Recorded(c) if c.votes_count == 1));
        let second = tracker.vote(&backend, &mut counters).await.unwrap();
        assert_eq!(second, VoteOutcome::AlreadyVoted);

        assert_eq!(backend.counts.lock().unwrap().votes_count, 1);
        assert_eq!(counters.votes_count(), 1);
        assert!(tracker.has_voted(1));
    }

    #[tokio::test]
    async fn test_failed_vote_rolls_back() {
        let backend = FakeBackend::default();
        backend.fail.store(true, Ordering::SeqCst);
        let tracker = EngagementTracker::in_memory();
        let mut counters = LiveCounters::new(
            5,
            ProblemCounts {
                votes_count: 3,
                views_count: 9,
            },
        );

        let err = tracker.vote(&backend, &mut counters).await.unwrap_err();
        assert!(matches!(err, EngagementError::Vote(_)));
        assert_eq!(counters.votes_count(), 3);
        assert!(!tracker.has_voted(5));

        backend.fail.store(false, Ordering::SeqCst);
        let outcome = tracker.vote(&backend, &mut counters).await.unwrap();
        assert!(matches!(outcome, VoteOutcome::Recorded(_)));
    }

    #[tokio::test]
    async fn test_vote_confirmation_overwrites_prediction() {
        let backend = FakeBackend::default();
        *backend.counts.lock().unwrap() = ProblemCounts {
            votes_count: 10,
            views_count: 20,
        };
        let tracker = EngagementTracker::in_memory();
        let mut counters = LiveCounters::new(1, ProblemCounts::default());

        tracker.vote(&backend, &mut counters).await.unwrap();
        assert_eq!(counters.votes_count(), 11);
        assert_eq!(counters.views_count(), 20);
    }

    #[tokio::test]
    async fn test_view_counted_once_per_session() {
        let backend = FakeBackend::default();
        let tracker = EngagementTracker::in_memory();
        let mut counters = LiveCounters::new(2, ProblemCounts::default());

        assert!(matches!(
            tracker.view(&backend, &mut counters).await.unwrap(),
            ViewOutcome::Recorded(_)
        ));
        assert_eq!(
            tracker.view(&backend, &mut counters).await.unwrap(),
            ViewOutcome::AlreadyViewed
        );
        assert_eq!(backend.counts.lock().unwrap().views_count, 1);
        assert_eq!(counters.views_count(), 1);
    }

    #[tokio::test]
    async fn test_view_marker_kept_after_failure() {
        let backend = FakeBackend::default();
        backend.fail.store(true, Ordering::SeqCst);
        let tracker = EngagementTracker::in_memory();
        let mut counters = LiveCounters::new(3, ProblemCounts::default());

        assert!(tracker.view(&backend, &mut counters).await.is_err());
        assert!(tracker.has_viewed(3));
        assert_eq!(counters.views_count(), 0);
    }

    #[tokio::test]
    async fn test_new_session_counts_again() {
        let backend = FakeBackend::default();
        let device: Arc<dyn MarkerStore> = Arc::new(MemoryMarkerStore::new());
        let first = EngagementTracker::new(device.clone(), Arc::new(MemoryMarkerStore::new()));
        let second = EngagementTracker::new(device, Arc::new(MemoryMarkerStore::new()));
        let mut counters = LiveCounters::new(4, ProblemCounts::default());

        first.view(&backend, &mut counters).await.unwrap();
        first.vote(&backend, &mut counters).await.unwrap();
        second.view(&backend, &mut counters).await.unwrap();
        let again = second.vote(&backend, &mut counters).await.unwrap();

        assert_eq!(again, VoteOutcome::AlreadyVoted);
        assert_eq!(counters.views_count(), 2);
        assert_eq!(counters.votes_count(), 1);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut counters = LiveCounters::new(1, ProblemCounts::default());
        let update = event(1, ProblemEventKind::Updated, 4, 7);
        assert!(counters.apply(&update));
        assert!(!counters.apply(&update));
        assert_eq!(counters.votes_count(), 4);
        assert_eq!(counters.views_count(), 7);
    }

    #[test]
    fn test_apply_ignores_other_problems() {
        let mut counters = LiveCounters::new(1, ProblemCounts::default());
        assert!(!counters.apply(&event(2, ProblemEventKind::Updated, 9, 9)));
        assert_eq!(counters.counts(), ProblemCounts::default());
    }

    #[test]
    fn test_apply_delete() {
        let mut counters = LiveCounters::new(1, ProblemCounts::default());
        assert!(counters.apply(&event(1, ProblemEventKind::Deleted, 0, 0)));
        assert!(counters.is_deleted());
        assert!(!counters.apply(&event(1, ProblemEventKind::Deleted, 0, 0)));
    }
}
