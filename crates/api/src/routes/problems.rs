//! Public problem endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::{
    CreateProblemRequest, ListProblemsQuery, Problem, ProblemEvent, ProblemEventKind, ProblemPage,
    RecentProblemsQuery,
};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_problem_submitted;

/// Parses a route id. Anything that is not a positive integer is not found.
pub(crate) fn parse_problem_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))
}

pub(crate) fn problem_not_found() -> ApiError {
    ApiError::NotFound("Problem not found".to_string())
}

/// GET /api/v1/problems
///
/// Filters: `category`, `status`, `upazila`, `search` (`all` or empty means
/// no filter). Newest first.
pub async fn list_problems(
    State(state): State<AppState>,
    Query(query): Query<ListProblemsQuery>,
) -> Result<Json<ProblemPage>, ApiError> {
    let page = query.page_request(state.config.limits.public_page_size);
    let filter = query.to_filter()?;

    let (data, total) = state.problems.list(&filter, &page).await?;
    Ok(Json(ProblemPage::new(data, &page, total)))
}

/// GET /api/v1/problems/recent
pub async fn recent_problems(
    State(state): State<AppState>,
    Query(query): Query<RecentProblemsQuery>,
) -> Result<Json<Vec<Problem>>, ApiError> {
    let limit = query.limit(state.config.limits.recent_limit);
    Ok(Json(state.problems.recent(limit).await?))
}

/// GET /api/v1/problems/:id
pub async fn get_problem(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Problem>, ApiError> {
    let id = parse_problem_id(&id)?;
    state
        .problems
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(problem_not_found)
}

/// POST /api/v1/problems
///
/// Re-runs the submission validation against the cached taxonomy. The new
/// row always starts pending with zero votes and views.
pub async fn create_problem(
    State(state): State<AppState>,
    Json(request): Json<CreateProblemRequest>,
) -> Result<(StatusCode, Json<Problem>), ApiError> {
    let max_images = state.config.limits.max_images_per_problem;
    if request.images.len() > max_images {
        return Err(ApiError::Validation(format!(
            "At most {} images can be attached",
            max_images
        )));
    }

    let taxonomy = state.settings.taxonomy().await;
    let new_problem = request.into_new_problem(&taxonomy)?;
    let problem = state.problems.insert(&new_problem).await?;

    record_problem_submitted();
    state
        .events
        .publish(ProblemEvent::from_problem(ProblemEventKind::Inserted, &problem));

    info!(
        problem_id = problem.id,
        category = %problem.category,
        upazila = %problem.upazila,
        images = problem.images.len(),
        "Problem submitted"
    );

    Ok((StatusCode::CREATED, Json(problem)))
}
