//! Bulk deactivation with review reassignment.
//!
//! Deactivates a set of team members and moves every open review they hold
//! to another active member of the same team, in one transaction.
//!
//! # Roster snapshot
//!
//! Replacement candidates are drawn from a future roster: the locked roster
//! with every requested id already marked inactive. Targets deactivated in
//! the same call are therefore never chosen to replace each other.
//!
//! # Isolation
//!
//! The roster rows and each affected pull request row are read with row
//! locks inside the transaction. A concurrent reassignment, deactivation or
//! pull request creation touching the same rows waits for this call to
//! finish and then sees its result, so no update is lost.
//!
//! Every workflow locks the roster before any pull request, and pull
//! requests in id order.
//!
//! # Failure
//!
//! Any error, including `NoCandidate` on the last affected pull request,
//! rolls back every deactivation and reassignment made by the call.

use crate::errors::ReviewError;
use crate::models::{BulkDeactivation, PullRequest, Reassignment, Team};
use crate::observability::metrics;
use crate::repositories::{PullRequestRepository, UserRepository};
use crate::services::reassignment::replace_reviewer;
use crate::services::{finish, require_id, AssignmentStrategy};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Service for bulk deactivation.
#[derive(Debug, Clone)]
pub struct DeactivationService<S> {
    store: S,
    strategy: Arc<AssignmentStrategy>,
}

impl<S> DeactivationService<S>
where
    S: UserRepository + PullRequestRepository,
{
    pub fn new(store: S, strategy: Arc<AssignmentStrategy>) -> Self {
        Self { store, strategy }
    }

    /// Deactivate `user_ids` in `team_name` and reassign their open reviews.
    ///
    /// Ids are trimmed and deduplicated, keeping first occurrence order.
    /// Members that are already inactive are accepted but produce no output.
    /// Merged pull requests are left alone.
    ///
    /// # Errors
    ///
    /// - `ReviewError::InvalidArgument` - blank team name, empty id list or
    ///   a blank id
    /// - `ReviewError::NotFound` - the team has no members, or an id is not a
    ///   member of the team
    /// - `ReviewError::NoCandidate` - an affected pull request has no eligible
    ///   replacement
    /// - `ReviewError::Database` - storage failure
    #[instrument(skip_all, fields(team_name = %team_name, requested = user_ids.len()))]
    pub async fn deactivate_team_members(
        &self,
        team_name: &str,
        user_ids: Vec<String>,
    ) -> Result<BulkDeactivation, ReviewError> {
        let start = Instant::now();
        let team_name = require_id("team_name", team_name)?;
        let requested = normalize_user_ids(&user_ids)?;

        let mut tx = self.store.begin().await?;
        let result = self.run(&mut tx, &team_name, &requested).await;
        let result = finish(&self.store, tx, result).await;

        match &result {
            Ok(outcome) => {
                metrics::record_bulk_deactivation(
                    "success",
                    outcome.deactivated_user_ids.len(),
                    start.elapsed(),
                );
                metrics::record_reassignments(
                    "bulk",
                    "success",
                    outcome.reassignments.len() as u64,
                );
                tracing::info!(
                    target: "review.service.deactivation",
                    team_name = %team_name,
                    deactivated = outcome.deactivated_user_ids.len(),
                    reassignments = outcome.reassignments.len(),
                    "Team members deactivated"
                );
            }
            Err(err) => {
                metrics::record_bulk_deactivation("error", 0, start.elapsed());
                tracing::warn!(
                    target: "review.service.deactivation",
                    team_name = %team_name,
                    error = %err,
                    "Bulk deactivation rolled back"
                );
            }
        }

        result
    }

    async fn run(
        &self,
        tx: &mut S::Tx,
        team_name: &str,
        requested: &[String],
    ) -> Result<BulkDeactivation, ReviewError> {
        let members = self.store.lock_team_members(tx, team_name).await?;
        if members.is_empty() {
            return Err(ReviewError::NotFound(format!("team {} not found", team_name)));
        }
        let team = Team {
            team_name: team_name.to_string(),
            members,
        };

        let mut targets = Vec::with_capacity(requested.len());
        for user_id in requested {
            let member = team.member(user_id).ok_or_else(|| {
                ReviewError::NotFound(format!(
                    "user {} is not a member of team {}",
                    user_id, team_name
                ))
            })?;
            if member.is_active {
                targets.push(user_id.clone());
            }
        }

        if targets.is_empty() {
            tracing::debug!(
                target: "review.service.deactivation",
                team_name = %team_name,
                "All requested members already inactive"
            );
            return Ok(BulkDeactivation {
                team,
                deactivated_user_ids: Vec::new(),
                reassignments: Vec::new(),
            });
        }

        let future_roster = team.with_deactivated(requested);

        self.store.deactivate_users(tx, team_name, &targets).await?;

        let mut affected = Vec::with_capacity(targets.len());
        for user_id in &targets {
            let pull_request_ids = self
                .store
                .open_pull_request_ids_by_reviewer(tx, user_id)
                .await?;
            affected.push((user_id, pull_request_ids));
        }

        // Pull requests are locked in id order so two calls sharing a pull
        // request cannot deadlock.
        let lock_order: BTreeSet<&String> =
            affected.iter().flat_map(|(_, ids)| ids.iter()).collect();
        let mut locked: HashMap<String, PullRequest> = HashMap::with_capacity(lock_order.len());
        for pull_request_id in lock_order {
            let pr = self.store.lock_pull_request(tx, pull_request_id).await?;
            locked.insert(pull_request_id.clone(), pr);
        }

        let mut reassignments: Vec<Reassignment> = Vec::new();
        for (user_id, pull_request_ids) in &affected {
            for pull_request_id in pull_request_ids {
                let Some(pr) = locked.get_mut(pull_request_id) else {
                    continue;
                };
                if pr.is_merged() || !pr.is_reviewer_assigned(user_id) {
                    tracing::debug!(
                        target: "review.service.deactivation",
                        pull_request_id = %pull_request_id,
                        user_id = %user_id,
                        "Skipping pull request"
                    );
                    continue;
                }

                let reassignment = replace_reviewer(
                    &self.store,
                    tx,
                    &self.strategy,
                    &future_roster,
                    pr,
                    user_id,
                )
                .await?;
                reassignments.push(reassignment);
            }
        }

        Ok(BulkDeactivation {
            team: future_roster,
            deactivated_user_ids: targets,
            reassignments,
        })
    }
}

/// Trim, reject blanks and drop repeats, keeping first occurrence order.
fn normalize_user_ids(user_ids: &[String]) -> Result<Vec<String>, ReviewError> {
    if user_ids.is_empty() {
        return Err(ReviewError::InvalidArgument(
            "user_ids must not be empty".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(user_ids.len());
    let mut unique = Vec::with_capacity(user_ids.len());
    for raw in user_ids {
        let user_id = require_id("user_id", raw)?;
        if seen.insert(user_id.clone()) {
            unique.push(user_id);
        }
    }
    Ok(unique)
}
