//! Server-sent event streams of problem changes.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use domain::models::ProblemEvent;
use futures::{Stream, StreamExt};

use crate::app::AppState;
use crate::error::ApiError;
use crate::routes::problems::{parse_problem_id, problem_not_found};

/// Encodes a change as an SSE event named after its kind.
pub fn to_sse_event(event: &ProblemEvent) -> Event {
    let encoded = Event::default()
        .event(event.event_name())
        .id(event.problem_id.to_string())
        .json_data(event);
    match encoded {
        Ok(encoded) => encoded,
        Err(err) => {
            tracing::warn!(problem_id = event.problem_id, error = %err, "Failed to encode problem event");
            Event::default().comment("encode error")
        }
    }
}

fn keep_alive(state: &AppState) -> KeepAlive {
    KeepAlive::new().interval(Duration::from_secs(state.config.realtime.keep_alive_secs.max(1)))
}

/// GET /api/v1/events
pub async fn all_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = state
        .events
        .stream(None)
        .map(|event| Ok::<_, Infallible>(to_sse_event(&event)));
    tracing::debug!(subscribers = state.events.subscriber_count(), "Event stream opened");
    Sse::new(stream).keep_alive(keep_alive(&state))
}

/// GET /api/v1/problems/:id/events
///
/// Only events for the given problem are delivered.
pub async fn problem_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let id = parse_problem_id(&id)?;
    // Subscribe before the existence check so no change is missed in between.
    let stream = state
        .events
        .stream(Some(id))
        .map(|event| Ok::<_, Infallible>(to_sse_event(&event)));

    if state.problems.find_by_id(id).await?.is_none() {
        return Err(problem_not_found());
    }

    Ok(Sse::new(stream).keep_alive(keep_alive(&state)))
}
