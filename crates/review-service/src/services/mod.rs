//! Service layer for the review service.
//!
//! Services own the business rules and the transaction boundaries. Each
//! public operation validates its input, begins one transaction, runs the
//! workflow with the handle, and commits or rolls back in [`finish`].
//!
//! # Components
//!
//! - `assignment` - Randomized reviewer selection
//! - `reassignment` - Reviewer replacement shared by single and bulk paths
//! - `team_service` - Team creation and lookup
//! - `user_service` - Activity flag and review lookup
//! - `pull_request_service` - Pull request lifecycle and single reassignment
//! - `deactivation` - Bulk deactivation with review reassignment

pub mod assignment;
pub mod deactivation;
pub mod pull_request_service;
mod reassignment;
pub mod team_service;
pub mod user_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use assignment::AssignmentStrategy;
pub use deactivation::DeactivationService;
pub use pull_request_service::PullRequestService;
pub use team_service::TeamService;
pub use user_service::UserService;

use crate::errors::ReviewError;
use crate::repositories::Transactor;

/// Trim `value` and reject it if nothing is left.
pub(crate) fn require_id(field: &str, value: &str) -> Result<String, ReviewError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ReviewError::InvalidArgument(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Commit `tx` if `result` is Ok, otherwise roll it back and return the
/// original error.
pub(crate) async fn finish<S, T>(
    store: &S,
    tx: S::Tx,
    result: Result<T, ReviewError>,
) -> Result<T, ReviewError>
where
    S: Transactor,
{
    match result {
        Ok(value) => {
            store.commit(tx).await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = store.rollback(tx).await {
                tracing::warn!(
                    target: "review.service",
                    error = %rollback_err,
                    original_error = %err,
                    "Rollback failed"
                );
            }
            Err(err)
        }
    }
}
