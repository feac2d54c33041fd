//! Review service error types.
//!
//! `ReviewError` is the single taxonomy used by repositories, services and
//! handlers. Only the `IntoResponse` impl knows about HTTP: it maps each kind
//! to a status code and a machine-readable code. Storage and internal errors
//! are logged server-side and returned to clients with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Review service error type.
///
/// Maps to HTTP status codes:
/// - InvalidArgument, TeamExists: 400 Bad Request
/// - NotFound: 404 Not Found
/// - PrExists, PrMerged, NotAssigned, NoCandidate: 409 Conflict
/// - Database, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Team already exists: {0}")]
    TeamExists(String),

    #[error("Pull request already exists: {0}")]
    PrExists(String),

    #[error("Cannot modify merged pull request: {0}")]
    PrMerged(String),

    #[error("User {user_id} is not assigned as reviewer on {pull_request_id}")]
    NotAssigned {
        pull_request_id: String,
        user_id: String,
    },

    #[error("No active candidate available for assignment in team {0}")]
    NoCandidate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReviewError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            ReviewError::InvalidArgument(_) | ReviewError::TeamExists(_) => 400,
            ReviewError::NotFound(_) => 404,
            ReviewError::PrExists(_)
            | ReviewError::PrMerged(_)
            | ReviewError::NotAssigned { .. }
            | ReviewError::NoCandidate(_) => 409,
            ReviewError::Database(_) | ReviewError::Internal(_) => 500,
        }
    }

    /// Machine-readable error code returned in response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ReviewError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ReviewError::NotFound(_) => "NOT_FOUND",
            ReviewError::TeamExists(_) => "TEAM_EXISTS",
            ReviewError::PrExists(_) => "PR_EXISTS",
            ReviewError::PrMerged(_) => "PR_MERGED",
            ReviewError::NotAssigned { .. } => "NOT_ASSIGNED",
            ReviewError::NoCandidate(_) => "NO_CANDIDATE",
            ReviewError::Database(_) => "DATABASE_ERROR",
            ReviewError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for ReviewError {
    fn into_response(self) -> Response {
        let message = match &self {
            ReviewError::Database(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(
                    target: "review.database",
                    error = %err,
                    "Database operation failed"
                );
                "An internal database error occurred".to_string()
            }
            ReviewError::Internal(err) => {
                tracing::error!(target: "review.internal", error = %err, "Internal error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// Convert sqlx errors to ReviewError
impl From<sqlx::Error> for ReviewError {
    fn from(err: sqlx::Error) -> Self {
        ReviewError::Database(err.to_string())
    }
}
