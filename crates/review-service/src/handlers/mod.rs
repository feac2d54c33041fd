//! HTTP request handlers for the review service.
//!
//! Handlers are generic over the store so the same router serves PostgreSQL
//! in production and the in-memory store in tests.

pub mod health;
pub mod metrics;
pub mod pull_requests;
pub mod stats;
pub mod teams;
pub mod users;

pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
pub use pull_requests::{create_pull_request, merge_pull_request, reassign_reviewer};
pub use stats::assignment_stats;
pub use teams::{add_team, get_team};
pub use users::{deactivate_team_members, get_reviews, set_is_active};

use crate::errors::ReviewError;
use axum::body::Bytes;
use serde::de::DeserializeOwned;

/// Deserialize a JSON request body.
///
/// Bodies are parsed by hand so that malformed JSON is reported as
/// `INVALID_ARGUMENT` (400) instead of axum's 422 rejection.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ReviewError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(target: "review.handlers", error = %e, "Invalid request body");
        ReviewError::InvalidArgument("invalid request body".to_string())
    })
}

/// Unwrap a required query parameter.
pub(crate) fn required_param(name: &str, value: Option<String>) -> Result<String, ReviewError> {
    value.ok_or_else(|| ReviewError::InvalidArgument(format!("{} is required", name)))
}
