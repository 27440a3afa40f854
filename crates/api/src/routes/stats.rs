//! Aggregate counts for the public dashboard.

use axum::{extract::State, Json};
use domain::models::{
    BucketCount, ProblemCategory, ProblemStats, ProblemStatus, StatusCounts, UpazilaStats,
};

use crate::app::AppState;
use crate::error::ApiError;

/// GET /api/v1/stats
///
/// One count query per status, per category and per configured upazila.
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<ProblemStats>, ApiError> {
    let taxonomy = state.settings.taxonomy().await;

    let mut status = StatusCounts {
        total: state.problems.count_all().await?,
        ..Default::default()
    };
    for value in ProblemStatus::ALL {
        status.set(value, state.problems.count_by_status(value).await?);
    }

    let mut by_category = Vec::with_capacity(ProblemCategory::ALL.len());
    for category in ProblemCategory::ALL {
        by_category.push(BucketCount {
            value: category.as_str().to_string(),
            label: taxonomy.category_label(category),
            count: state.problems.count_by_category(category).await?,
        });
    }

    let mut by_upazila = Vec::with_capacity(taxonomy.upazilas.len());
    for upazila in &taxonomy.upazilas {
        by_upazila.push(BucketCount {
            value: upazila.value.clone(),
            label: upazila.label.clone(),
            count: state.problems.count_by_upazila(&upazila.value).await?,
        });
    }

    Ok(Json(ProblemStats {
        status,
        by_category,
        by_upazila,
    }))
}

/// GET /api/v1/stats/upazilas
pub async fn get_upazila_stats(
    State(state): State<AppState>,
) -> Result<Json<Vec<UpazilaStats>>, ApiError> {
    let taxonomy = state.settings.taxonomy().await;
    let pairs = state
        .problems
        .upazila_status_pairs(state.config.limits.stats_row_limit)
        .await?;
    Ok(Json(UpazilaStats::from_pairs(&taxonomy, &pairs)))
}
