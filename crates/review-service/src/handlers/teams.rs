//! Team handlers.
//!
//! - `POST /team/add` - Create a team with members
//! - `GET /team/get?team_name=` - Fetch a team

use crate::errors::ReviewError;
use crate::handlers::{parse_body, required_param};
use crate::models::api::{TeamDto, TeamEnvelope, TeamQuery};
use crate::models::User;
use crate::repositories::ReviewStore;
use crate::routes::AppState;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /team/add
///
/// # Response
///
/// - 201 Created: `{"team": {...}}`
/// - 400 Bad Request: invalid body, or the team already exists
#[instrument(skip_all, name = "review.team.add")]
pub async fn add_team<S: ReviewStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Bytes,
) -> Result<(StatusCode, Json<TeamEnvelope>), ReviewError> {
    let request: TeamDto = parse_body(&body)?;

    let members = request
        .members
        .into_iter()
        .map(|m| User::new(m.user_id, m.username, "", m.is_active))
        .collect();

    let team = state.teams.create_team(&request.team_name, members).await?;

    Ok((
        StatusCode::CREATED,
        Json(TeamEnvelope {
            team: TeamDto::from(&team),
        }),
    ))
}

/// Handler for GET /team/get
#[instrument(skip_all, name = "review.team.get")]
pub async fn get_team<S: ReviewStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<TeamQuery>,
) -> Result<Json<TeamDto>, ReviewError> {
    let team_name = required_param("team_name", query.team_name)?;
    let team = state.teams.get_team(&team_name).await?;
    Ok(Json(TeamDto::from(&team)))
}
