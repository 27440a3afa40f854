//! Vote and view counters.
//!
//! Both counters are read-modify-write on the server: the current value is
//! read, incremented and written back in two statements. Concurrent requests
//! may under-count.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::{ProblemCounts, ProblemEvent, ProblemEventKind};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{record_view, record_vote};
use crate::routes::problems::{parse_problem_id, problem_not_found};

/// POST /api/v1/problems/:id/vote
pub async fn vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProblemCounts>, ApiError> {
    let id = parse_problem_id(&id)?;
    let problem = state
        .problems
        .increment_votes(id)
        .await?
        .ok_or_else(problem_not_found)?;

    record_vote();
    state
        .events
        .publish(ProblemEvent::from_problem(ProblemEventKind::Updated, &problem));
    info!(
        problem_id = problem.id,
        votes_count = problem.votes_count,
        "Vote recorded"
    );

    Ok(Json(problem.counts()))
}

/// POST /api/v1/problems/:id/view
pub async fn view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProblemCounts>, ApiError> {
    let id = parse_problem_id(&id)?;
    let problem = state
        .problems
        .increment_views(id)
        .await?
        .ok_or_else(problem_not_found)?;

    record_view();
    state
        .events
        .publish(ProblemEvent::from_problem(ProblemEventKind::Updated, &problem));
    tracing::debug!(
        problem_id = problem.id,
        views_count = problem.views_count,
        "View recorded"
    );

    Ok(Json(problem.counts()))
}
