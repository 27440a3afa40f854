//! Admin triage and settings routes.
//!
//! Every handler here sits behind `require_admin`.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::models::{
    AdminListProblemsQuery, CandidateInfo, DeleteProblemQuery, Problem, ProblemEvent,
    ProblemEventKind, ProblemPage, SettingsOption, SiteInfo, SiteSettings, SocialLinks, Taxonomy,
    UpdateStatusRequest,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::app::AppState;
use crate::error::ApiError;
use crate::routes::problems::{parse_problem_id, problem_not_found};

/// Response for a deleted problem.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteProblemResponse {
    pub id: i64,
    pub deleted: bool,
}

/// GET /api/v1/admin/problems
///
/// Search also matches the submitter's name.
pub async fn list_problems(
    State(state): State<AppState>,
    Query(query): Query<AdminListProblemsQuery>,
) -> Result<Json<ProblemPage>, ApiError> {
    let page = query.page_request(state.config.limits.admin_page_size);
    let filter = query.to_filter()?;

    let (data, total) = state.problems.list(&filter, &page).await?;
    Ok(Json(ProblemPage::new(data, &page, total)))
}

/// PATCH /api/v1/admin/problems/:id/status
///
/// Any status may follow any other.
pub async fn update_problem_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Problem>, ApiError> {
    let id = parse_problem_id(&id)?;
    let problem = state
        .problems
        .update_status(id, request.status)
        .await?
        .ok_or_else(problem_not_found)?;

    state
        .events
        .publish(ProblemEvent::from_problem(ProblemEventKind::Updated, &problem));
    info!(problem_id = problem.id, status = %problem.status, "Problem status updated");

    Ok(Json(problem))
}

/// DELETE /api/v1/admin/problems/:id?confirm=true
pub async fn delete_problem(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteProblemQuery>,
) -> Result<Json<DeleteProblemResponse>, ApiError> {
    let id = parse_problem_id(&id)?;
    if !query.confirm {
        return Err(ApiError::Validation(
            "Deleting a problem requires confirm=true".to_string(),
        ));
    }

    let problem = state
        .problems
        .delete(id)
        .await?
        .ok_or_else(problem_not_found)?;

    state
        .events
        .publish(ProblemEvent::from_problem(ProblemEventKind::Deleted, &problem));
    warn!(problem_id = problem.id, "Problem deleted");

    Ok(Json(DeleteProblemResponse {
        id: problem.id,
        deleted: true,
    }))
}

/// PUT /api/v1/admin/settings/categories
pub async fn replace_categories(
    State(state): State<AppState>,
    Json(categories): Json<Vec<SettingsOption>>,
) -> Result<Json<Taxonomy>, ApiError> {
    let taxonomy = state
        .settings
        .replace_categories(&state.setting_repo, categories)
        .await?;
    info!(count = taxonomy.categories.len(), "Category labels saved");
    Ok(Json(taxonomy))
}

/// PUT /api/v1/admin/settings/upazilas
///
/// Unions keyed by a removed upazila stay stored but are no longer offered.
pub async fn replace_upazilas(
    State(state): State<AppState>,
    Json(upazilas): Json<Vec<SettingsOption>>,
) -> Result<Json<Taxonomy>, ApiError> {
    let taxonomy = state
        .settings
        .replace_upazilas(&state.setting_repo, upazilas)
        .await?;
    info!(count = taxonomy.upazilas.len(), "Upazilas saved");
    Ok(Json(taxonomy))
}

/// PUT /api/v1/admin/settings/unions
pub async fn replace_unions(
    State(state): State<AppState>,
    Json(unions): Json<BTreeMap<String, Vec<SettingsOption>>>,
) -> Result<Json<Taxonomy>, ApiError> {
    let taxonomy = state
        .settings
        .replace_unions(&state.setting_repo, unions)
        .await?;
    info!(upazilas = taxonomy.unions.len(), "Unions saved");
    Ok(Json(taxonomy))
}

/// PUT /api/v1/admin/settings/site-info
pub async fn replace_site_info(
    State(state): State<AppState>,
    Json(site_info): Json<SiteInfo>,
) -> Result<Json<SiteSettings>, ApiError> {
    let site = state
        .settings
        .replace_site_info(&state.setting_repo, site_info)
        .await?;
    info!("Site info saved");
    Ok(Json(site))
}

/// PUT /api/v1/admin/settings/candidate-info
pub async fn replace_candidate_info(
    State(state): State<AppState>,
    Json(candidate_info): Json<CandidateInfo>,
) -> Result<Json<SiteSettings>, ApiError> {
    let site = state
        .settings
        .replace_candidate_info(&state.setting_repo, candidate_info)
        .await?;
    info!("Candidate info saved");
    Ok(Json(site))
}

/// PUT /api/v1/admin/settings/social-links
pub async fn replace_social_links(
    State(state): State<AppState>,
    Json(social_links): Json<SocialLinks>,
) -> Result<Json<SiteSettings>, ApiError> {
    let site = state
        .settings
        .replace_social_links(&state.setting_repo, social_links)
        .await?;
    info!("Social links saved");
    Ok(Json(site))
}
