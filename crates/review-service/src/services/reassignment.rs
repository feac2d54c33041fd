//! Reviewer replacement inside an open transaction.
//!
//! Both the single reassignment endpoint and bulk deactivation go through
//! [`replace_reviewer`], so they share exclusion and failure behaviour.

use crate::errors::ReviewError;
use crate::models::{PullRequest, Reassignment, Team};
use crate::repositories::PullRequestRepository;
use crate::services::AssignmentStrategy;

/// Replace `old_user_id` on `pr` with an active member of `roster`.
///
/// The replacement is never a current reviewer or the author. The old
/// reviewer is removed only after a replacement is known, so a
/// `NoCandidate` failure leaves storage untouched. On success `pr` reflects
/// the new reviewer list.
///
/// # Errors
///
/// - `ReviewError::PrMerged` - `pr` is merged
/// - `ReviewError::NotAssigned` - `old_user_id` is not a reviewer of `pr`
/// - `ReviewError::NoCandidate` - no eligible replacement in `roster`
/// - `ReviewError::Database` - storage failure
pub(crate) async fn replace_reviewer<S>(
    store: &S,
    tx: &mut S::Tx,
    strategy: &AssignmentStrategy,
    roster: &Team,
    pr: &mut PullRequest,
    old_user_id: &str,
) -> Result<Reassignment, ReviewError>
where
    S: PullRequestRepository,
{
    pr.ensure_reassignable(old_user_id)?;

    let new_user_id = strategy.select_replacement_reviewer(roster, &pr.exclusion_set())?;

    store
        .remove_reviewer(tx, &pr.pull_request_id, old_user_id)
        .await?;
    store
        .add_reviewer(tx, &pr.pull_request_id, &new_user_id)
        .await?;
    pr.replace_reviewer(old_user_id, &new_user_id)?;

    tracing::debug!(
        target: "review.service.reassignment",
        pull_request_id = %pr.pull_request_id,
        old_user_id = %old_user_id,
        new_user_id = %new_user_id,
        "Reviewer replaced"
    );

    Ok(Reassignment {
        pull_request_id: pr.pull_request_id.clone(),
        old_user_id: old_user_id.to_string(),
        new_user_id,
    })
}
