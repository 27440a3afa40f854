//! In-process fan-out of problem change events.
//!
//! Handlers publish after every successful write; SSE routes subscribe.
//! Slow subscribers lag and skip events instead of blocking publishers.

use domain::models::ProblemEvent;
use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, warn};

/// Broadcast bus for [`ProblemEvent`]s.
#[derive(Debug, Clone)]
pub struct ProblemEventBus {
    sender: broadcast::Sender<ProblemEvent>,
}

impl ProblemEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Sends to current subscribers. Events with no subscribers are dropped.
    pub fn publish(&self, event: ProblemEvent) {
        debug!(
            problem_id = event.problem_id,
            kind = %event.kind,
            "Publishing problem event"
        );
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProblemEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Stream of events, optionally limited to one problem.
    pub fn stream(&self, problem_id: Option<i64>) -> impl Stream<Item = ProblemEvent> + Send {
        BroadcastStream::new(self.subscribe()).filter_map(move |item| async move {
            match item {
                Ok(event) if problem_id.map_or(true, |id| id == event.problem_id) => Some(event),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Realtime subscriber lagged");
                    metrics::counter!("realtime_events_skipped_total").increment(skipped);
                    None
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::models::{ProblemEventKind, ProblemStatus};

    fn event(problem_id: i64, votes: i64) -> ProblemEvent {
        ProblemEvent {
            problem_id,
            kind: ProblemEventKind::Updated,
            status: ProblemStatus::Pending,
            votes_count: votes,
            views_count: 0,
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = ProblemEventBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(event(1, 3));

        let received = rx.recv().await.expect("event");
        assert_eq!(received.problem_id, 1);
        assert_eq!(received.votes_count, 3);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let bus = ProblemEventBus::new(8);
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(event(1, 1));
    }

    #[tokio::test]
    async fn test_stream_filters_by_problem() {
        let bus = ProblemEventBus::new(8);
        let stream = bus.stream(Some(2));
        tokio::pin!(stream);

        bus.publish(event(1, 1));
        bus.publish(event(2, 5));

        let received = stream.next().await.expect("event");
        assert_eq!(received.problem_id, 2);
        assert_eq!(received.votes_count, 5);
    }

    #[tokio::test]
    async fn test_lagged_stream_skips_to_newest() {
        let bus = ProblemEventBus::new(2);
        let stream = bus.stream(None);
        tokio::pin!(stream);

        for votes in 0..5 {
            bus.publish(event(1, votes));
        }

        let received = stream.next().await.expect("event");
        assert_eq!(received.votes_count, 3);
    }
}
