//! HTTP request and response bodies.
//!
//! Field names are snake_case except the pull request timestamps, which are
//! `createdAt` / `mergedAt`. String fields default to empty so that a missing
//! field is reported as `INVALID_ARGUMENT` by validation rather than as a
//! deserialization failure.

use super::{AssignmentStats, BulkDeactivation, PrStatus, PullRequest, Reassignment, Team, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Teams
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMemberDto {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl From<&User> for TeamMemberDto {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            is_active: user.is_active,
        }
    }
}

/// Request body for `POST /team/add` and response body for `GET /team/get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamDto {
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub members: Vec<TeamMemberDto>,
}

impl From<&Team> for TeamDto {
    fn from(team: &Team) -> Self {
        Self {
            team_name: team.team_name.clone(),
            members: team.members.iter().map(TeamMemberDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TeamEnvelope {
    pub team: TeamDto,
}

#[derive(Debug, Deserialize)]
pub struct TeamQuery {
    pub team_name: Option<String>,
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SetIsActiveRequest {
    #[serde(default)]
    pub user_id: String,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub user_id: String,
    pub username: String,
    pub team_name: String,
    pub is_active: bool,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username,
            team_name: user.team_name,
            is_active: user.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: UserDto,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

/// Pull request without reviewers or timestamps.
#[derive(Debug, Serialize)]
pub struct PullRequestShortDto {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: PrStatus,
}

impl From<PullRequest> for PullRequestShortDto {
    fn from(pr: PullRequest) -> Self {
        Self {
            pull_request_id: pr.pull_request_id,
            pull_request_name: pr.pull_request_name,
            author_id: pr.author_id,
            status: pr.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserReviewsResponse {
    pub user_id: String,
    pub pull_requests: Vec<PullRequestShortDto>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeactivateRequest {
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub user_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeactivateResponse {
    pub team_name: String,
    pub deactivated_user_ids: Vec<String>,
    pub reassignments: Vec<Reassignment>,
    pub team_members: Vec<TeamMemberDto>,
}

impl From<BulkDeactivation> for BulkDeactivateResponse {
    fn from(outcome: BulkDeactivation) -> Self {
        Self {
            team_members: outcome.team.members.iter().map(TeamMemberDto::from).collect(),
            team_name: outcome.team.team_name,
            deactivated_user_ids: outcome.deactivated_user_ids,
            reassignments: outcome.reassignments,
        }
    }
}

// ============================================================================
// Pull requests
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreatePullRequestRequest {
    #[serde(default)]
    pub pull_request_id: String,
    #[serde(default)]
    pub pull_request_name: String,
    #[serde(default)]
    pub author_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MergePullRequestRequest {
    #[serde(default)]
    pub pull_request_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReassignReviewerRequest {
    #[serde(default)]
    pub pull_request_id: String,
    #[serde(default)]
    pub old_user_id: String,
}

#[derive(Debug, Serialize)]
pub struct PullRequestDto {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub assigned_reviewers: Vec<String>,
    pub status: PrStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "mergedAt", skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<DateTime<Utc>>,
}

impl From<PullRequest> for PullRequestDto {
    fn from(pr: PullRequest) -> Self {
        Self {
            pull_request_id: pr.pull_request_id,
            pull_request_name: pr.pull_request_name,
            author_id: pr.author_id,
            assigned_reviewers: pr.assigned_reviewers,
            status: pr.status,
            created_at: pr.created_at,
            merged_at: pr.merged_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PullRequestEnvelope {
    pub pr: PullRequestDto,
}

#[derive(Debug, Serialize)]
pub struct ReassignReviewerResponse {
    pub pr: PullRequestDto,
    pub replaced_by: String,
}

// ============================================================================
// Stats and health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AssignmentStatsResponse {
    pub by_user: BTreeMap<String, i64>,
    pub by_pr: BTreeMap<String, i64>,
}

impl From<AssignmentStats> for AssignmentStatsResponse {
    fn from(stats: AssignmentStats) -> Self {
        Self {
            by_user: stats.by_user,
            by_pr: stats.by_pr,
        }
    }
}

/// Readiness check response.
///
/// Returned by the `/ready` endpoint (readiness probe).
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// Service readiness status ("ready" or "not_ready").
    pub status: &'static str,

    /// Database connectivity status.
    pub database: &'static str,

    /// Error message (generic, no infrastructure details).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_team_request_missing_fields_default_to_empty() {
        let dto: TeamDto = serde_json::from_str(r#"{"members":[{"user_id":"u1"}]}"#).unwrap();
        assert_eq!(dto.team_name, "");
        assert_eq!(dto.members.len(), 1);
        assert_eq!(dto.members[0].username, "");
        assert!(dto.members[0].is_active);
    }

    #[test]
    fn test_pull_request_dto_uses_camel_case_timestamps() {
        let mut pr = PullRequest::new("pr-1", "Add search", "u1");
        pr.assigned_reviewers = vec!["u2".to_string()];

        let json = serde_json::to_value(PullRequestDto::from(pr)).unwrap();

        assert_eq!(json["status"], "OPEN");
        assert_eq!(json["assigned_reviewers"], serde_json::json!(["u2"]));
        assert!(json.get("createdAt").is_some());
        assert!(json.get("mergedAt").is_none());
    }

    #[test]
    fn test_bulk_response_shape() {
        let outcome = BulkDeactivation {
            team: Team {
                team_name: "backend".to_string(),
                members: vec![User::new("u2", "Bob", "backend", false)],
            },
            deactivated_user_ids: vec!["u2".to_string()],
            reassignments: vec![Reassignment {
                pull_request_id: "pr-1".to_string(),
                old_user_id: "u2".to_string(),
                new_user_id: "u3".to_string(),
            }],
        };

        let json = serde_json::to_value(BulkDeactivateResponse::from(outcome)).unwrap();

        assert_eq!(json["team_name"], "backend");
        assert_eq!(json["deactivated_user_ids"], serde_json::json!(["u2"]));
        assert_eq!(json["reassignments"][0]["new_user_id"], "u3");
        assert_eq!(json["team_members"][0]["is_active"], false);
        assert!(json["team_members"][0].get("team_name").is_none());
    }
}
