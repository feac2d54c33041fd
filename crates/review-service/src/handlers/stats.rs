//! Assignment statistics handler.

use crate::errors::ReviewError;
use crate::models::api::AssignmentStatsResponse;
use crate::repositories::ReviewStore;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

/// Handler for GET /stats/assignments
#[tracing::instrument(skip_all, name = "review.stats.assignments")]
pub async fn assignment_stats<S: ReviewStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<AssignmentStatsResponse>, ReviewError> {
    let stats = state.pull_requests.assignment_stats().await?;
    Ok(Json(AssignmentStatsResponse::from(stats)))
}
