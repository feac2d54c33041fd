//! Pull request handlers.
//!
//! - `POST /pullRequest/create` - Create with automatic reviewer assignment
//! - `POST /pullRequest/merge` - Merge, idempotent
//! - `POST /pullRequest/reassign` - Replace one reviewer

use crate::errors::ReviewError;
use crate::handlers::parse_body;
use crate::models::api::{
    CreatePullRequestRequest, MergePullRequestRequest, PullRequestDto, PullRequestEnvelope,
    ReassignReviewerRequest, ReassignReviewerResponse,
};
use crate::repositories::ReviewStore;
use crate::routes::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /pullRequest/create
///
/// # Response
///
/// - 201 Created: `{"pr": {...}}` with up to two reviewers
/// - 400 Bad Request: blank field
/// - 404 Not Found: unknown author
/// - 409 Conflict: `PR_EXISTS`
#[instrument(skip_all, name = "review.pull_request.create")]
pub async fn create_pull_request<S: ReviewStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Bytes,
) -> Result<(StatusCode, Json<PullRequestEnvelope>), ReviewError> {
    let request: CreatePullRequestRequest = parse_body(&body)?;
    let pr = state
        .pull_requests
        .create_pull_request(
            &request.pull_request_id,
            &request.pull_request_name,
            &request.author_id,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(PullRequestEnvelope {
            pr: PullRequestDto::from(pr),
        }),
    ))
}

/// Handler for POST /pullRequest/merge
#[instrument(skip_all, name = "review.pull_request.merge")]
pub async fn merge_pull_request<S: ReviewStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Bytes,
) -> Result<Json<PullRequestEnvelope>, ReviewError> {
    let request: MergePullRequestRequest = parse_body(&body)?;
    let pr = state
        .pull_requests
        .merge_pull_request(&request.pull_request_id)
        .await?;
    Ok(Json(PullRequestEnvelope {
        pr: PullRequestDto::from(pr),
    }))
}

/// Handler for POST /pullRequest/reassign
///
/// # Response
///
/// - 200 OK: `{"pr": {...}, "replaced_by": "..."}`
/// - 404 Not Found: unknown pull request or user
/// - 409 Conflict: `PR_MERGED`, `NOT_ASSIGNED` or `NO_CANDIDATE`
#[instrument(skip_all, name = "review.pull_request.reassign")]
pub async fn reassign_reviewer<S: ReviewStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Bytes,
) -> Result<Json<ReassignReviewerResponse>, ReviewError> {
    let request: ReassignReviewerRequest = parse_body(&body)?;
    let outcome = state
        .pull_requests
        .reassign_reviewer(&request.pull_request_id, &request.old_user_id)
        .await?;
    Ok(Json(ReassignReviewerResponse {
        pr: PullRequestDto::from(outcome.pull_request),
        replaced_by: outcome.replaced_by,
    }))
}
