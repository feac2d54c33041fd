//! Pull request service.
//!
//! Handles creation with initial reviewer selection, merging, and replacement
//! of a single reviewer. Reviewer lists of merged pull requests never change.

use crate::errors::ReviewError;
use crate::models::{AssignmentStats, PullRequest, ReviewerReassignment, Team};
use crate::observability::metrics;
use crate::repositories::{PullRequestRepository, UserRepository};
use crate::services::reassignment::replace_reviewer;
use crate::services::{finish, require_id, AssignmentStrategy};
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

/// Service for pull request operations.
#[derive(Debug, Clone)]
pub struct PullRequestService<S> {
    store: S,
    strategy: Arc<AssignmentStrategy>,
}

impl<S> PullRequestService<S>
where
    S: UserRepository + PullRequestRepository,
{
    pub fn new(store: S, strategy: Arc<AssignmentStrategy>) -> Self {
        Self { store, strategy }
    }

    /// Create an open pull request and assign up to two reviewers from the
    /// author's team.
    ///
    /// A team with no eligible reviewer yields a pull request with none.
    ///
    /// # Errors
    ///
    /// - `ReviewError::InvalidArgument` - blank field
    /// - `ReviewError::PrExists` - the id is taken
    /// - `ReviewError::NotFound` - unknown author, or the author's team has
    ///   no members
    #[instrument(skip_all, fields(pull_request_id = %pull_request_id, author_id = %author_id))]
    pub async fn create_pull_request(
        &self,
        pull_request_id: &str,
        pull_request_name: &str,
        author_id: &str,
    ) -> Result<PullRequest, ReviewError> {
        let pull_request_id = require_id("pull_request_id", pull_request_id)?;
        let pull_request_name = require_id("pull_request_name", pull_request_name)?;
        let author_id = require_id("author_id", author_id)?;

        let mut tx = self.store.begin().await?;
        let result: Result<PullRequest, ReviewError> = async {
            if self
                .store
                .pull_request_exists(&mut tx, &pull_request_id)
                .await?
            {
                return Err(ReviewError::PrExists(pull_request_id.clone()));
            }

            // Locked so an in-flight deactivation of a teammate finishes
            // before selection reads the activity flags.
            let author = self.store.get_user(&mut tx, &author_id).await?;
            let members = self
                .store
                .lock_team_members(&mut tx, &author.team_name)
                .await?;
            if members.is_empty() {
                return Err(ReviewError::NotFound(format!(
                    "team {} has no members",
                    author.team_name
                )));
            }
            let team = Team {
                team_name: author.team_name,
                members,
            };

            let mut pr = PullRequest::new(
                pull_request_id.as_str(),
                pull_request_name.as_str(),
                author_id.as_str(),
            );
            pr.assigned_reviewers = self.strategy.select_reviewers(&team, &author_id);

            self.store.create_pull_request(&mut tx, &pr).await?;
            self.store
                .assign_reviewers(&mut tx, &pr.pull_request_id, &pr.assigned_reviewers)
                .await?;
            Ok(pr)
        }
        .await;
        let pr = finish(&self.store, tx, result).await?;

        tracing::info!(
            target: "review.service.pull_request",
            pull_request_id = %pr.pull_request_id,
            reviewers = ?pr.assigned_reviewers,
            "Pull request created"
        );

        Ok(pr)
    }

    /// Mark a pull request as merged.
    ///
    /// Merging twice returns the same state and keeps the first `merged_at`.
    ///
    /// # Errors
    ///
    /// - `ReviewError::InvalidArgument` - blank id
    /// - `ReviewError::NotFound` - no such pull request
    #[instrument(skip_all, fields(pull_request_id = %pull_request_id))]
    pub async fn merge_pull_request(
        &self,
        pull_request_id: &str,
    ) -> Result<PullRequest, ReviewError> {
        let pull_request_id = require_id("pull_request_id", pull_request_id)?;

        let mut tx = self.store.begin().await?;
        let result: Result<PullRequest, ReviewError> = async {
            let mut pr = self.store.lock_pull_request(&mut tx, &pull_request_id).await?;
            if pr.is_merged() {
                return Ok(pr);
            }
            pr.merge(Utc::now());
            self.store.update_pull_request(&mut tx, &pr).await?;
            Ok(pr)
        }
        .await;
        let pr = finish(&self.store, tx, result).await?;

        tracing::info!(
            target: "review.service.pull_request",
            pull_request_id = %pr.pull_request_id,
            "Pull request merged"
        );

        Ok(pr)
    }

    /// Replace `old_user_id` on a pull request with another active member of
    /// the old reviewer's team.
    ///
    /// # Errors
    ///
    /// - `ReviewError::InvalidArgument` - blank id
    /// - `ReviewError::NotFound` - unknown pull request or user
    /// - `ReviewError::PrMerged` - the pull request is merged
    /// - `ReviewError::NotAssigned` - `old_user_id` is not a reviewer
    /// - `ReviewError::NoCandidate` - no eligible replacement
    #[instrument(skip_all, fields(pull_request_id = %pull_request_id, old_user_id = %old_user_id))]
    pub async fn reassign_reviewer(
        &self,
        pull_request_id: &str,
        old_user_id: &str,
    ) -> Result<ReviewerReassignment, ReviewError> {
        let pull_request_id = require_id("pull_request_id", pull_request_id)?;
        let old_user_id = require_id("old_user_id", old_user_id)?;

        let mut tx = self.store.begin().await?;
        let result: Result<ReviewerReassignment, ReviewError> = async {
            // Roster before pull request, the same order bulk deactivation
            // takes its locks in.
            self.store
                .get_pull_request(&mut tx, &pull_request_id)
                .await?
                .ensure_reassignable(&old_user_id)?;

            let old_reviewer = self.store.get_user(&mut tx, &old_user_id).await?;
            let members = self
                .store
                .lock_team_members(&mut tx, &old_reviewer.team_name)
                .await?;
            let roster = Team {
                team_name: old_reviewer.team_name,
                members,
            };

            let mut pr = self.store.lock_pull_request(&mut tx, &pull_request_id).await?;
            pr.ensure_reassignable(&old_user_id)?;

            let reassignment = replace_reviewer(
                &self.store,
                &mut tx,
                &self.strategy,
                &roster,
                &mut pr,
                &old_user_id,
            )
            .await?;

            Ok(ReviewerReassignment {
                pull_request: pr,
                replaced_by: reassignment.new_user_id,
            })
        }
        .await;

        match finish(&self.store, tx, result).await {
            Ok(outcome) => {
                metrics::record_reassignments("single", "success", 1);
                tracing::info!(
                    target: "review.service.pull_request",
                    pull_request_id = %outcome.pull_request.pull_request_id,
                    old_user_id = %old_user_id,
                    new_user_id = %outcome.replaced_by,
                    "Reviewer reassigned"
                );
                Ok(outcome)
            }
            Err(err) => {
                metrics::record_reassignments("single", "error", 1);
                Err(err)
            }
        }
    }

    /// Reviewer assignment counts across all pull requests.
    #[instrument(skip_all)]
    pub async fn assignment_stats(&self) -> Result<AssignmentStats, ReviewError> {
        let mut tx = self.store.begin().await?;
        let result = self.store.assignment_stats(&mut tx).await;
        finish(&self.store, tx, result).await
    }
}
