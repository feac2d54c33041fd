//! User handlers.
//!
//! - `POST /users/setIsActive` - Set a user's activity flag
//! - `GET /users/getReview?user_id=` - Pull requests a user reviews
//! - `POST /users/deactivateTeamMembers` - Bulk deactivation with reassignment

use crate::errors::ReviewError;
use crate::handlers::{parse_body, required_param};
use crate::models::api::{
    BulkDeactivateRequest, BulkDeactivateResponse, PullRequestShortDto, SetIsActiveRequest,
    UserDto, UserEnvelope, UserQuery, UserReviewsResponse,
};
use crate::repositories::ReviewStore;
use crate::routes::AppState;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /users/setIsActive
#[instrument(skip_all, name = "review.user.set_is_active")]
pub async fn set_is_active<S: ReviewStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Bytes,
) -> Result<Json<UserEnvelope>, ReviewError> {
    let request: SetIsActiveRequest = parse_body(&body)?;
    let user = state
        .users
        .set_is_active(&request.user_id, request.is_active)
        .await?;
    Ok(Json(UserEnvelope {
        user: UserDto::from(user),
    }))
}

/// Handler for GET /users/getReview
///
/// An unknown user gets an empty list, not 404.
#[instrument(skip_all, name = "review.user.get_reviews")]
pub async fn get_reviews<S: ReviewStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<UserReviewsResponse>, ReviewError> {
    let user_id = required_param("user_id", query.user_id)?;
    let pull_requests = state.users.get_reviews(&user_id).await?;
    Ok(Json(UserReviewsResponse {
        user_id: user_id.trim().to_string(),
        pull_requests: pull_requests
            .into_iter()
            .map(PullRequestShortDto::from)
            .collect(),
    }))
}

/// Handler for POST /users/deactivateTeamMembers
///
/// # Response
///
/// - 200 OK: deactivated ids, reassignments and the updated roster
/// - 400 Bad Request: blank team name or ids
/// - 404 Not Found: unknown team, or an id outside the team
/// - 409 Conflict: `NO_CANDIDATE`; nothing was changed
#[instrument(skip_all, name = "review.user.deactivate_team_members")]
pub async fn deactivate_team_members<S: ReviewStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Bytes,
) -> Result<Json<BulkDeactivateResponse>, ReviewError> {
    let request: BulkDeactivateRequest = parse_body(&body)?;
    let outcome = state
        .deactivation
        .deactivate_team_members(&request.team_name, request.user_ids)
        .await?;
    Ok(Json(BulkDeactivateResponse::from(outcome)))
}
