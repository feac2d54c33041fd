//! Review service domain models.
//!
//! Users, teams, pull requests and the records produced by reviewer
//! reassignment. HTTP request/response shapes live in [`api`].

pub mod api;

use crate::errors::ReviewError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Maximum number of reviewers assigned to a pull request at creation.
pub const MAX_REVIEWERS: usize = 2;

/// A team member.
///
/// Only active users may be selected as reviewers.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub team_name: String,
    pub is_active: bool,
}

impl User {
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        team_name: impl Into<String>,
        is_active: bool,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            team_name: team_name.into(),
            is_active,
        }
    }
}

/// A team roster snapshot.
///
/// Membership is derived from `User::team_name`; every member's team name
/// equals `team_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub team_name: String,
    pub members: Vec<User>,
}

impl Team {
    /// Look up a member by id.
    pub fn member(&self, user_id: &str) -> Option<&User> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    /// Active members whose ids are not in `exclude`, in roster order.
    pub fn active_members_excluding<'a>(&'a self, exclude: &HashSet<&str>) -> Vec<&'a User> {
        self.members
            .iter()
            .filter(|m| m.is_active && !exclude.contains(m.user_id.as_str()))
            .collect()
    }

    /// Copy of this roster with every id in `user_ids` marked inactive.
    pub fn with_deactivated(&self, user_ids: &[String]) -> Team {
        let targets: HashSet<&str> = user_ids.iter().map(String::as_str).collect();
        Team {
            team_name: self.team_name.clone(),
            members: self
                .members
                .iter()
                .map(|m| User {
                    is_active: m.is_active && !targets.contains(m.user_id.as_str()),
                    ..m.clone()
                })
                .collect(),
        }
    }
}

/// Pull request lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrStatus {
    Open,
    Merged,
}

impl PrStatus {
    /// Returns the string stored in the database.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            PrStatus::Open => "OPEN",
            PrStatus::Merged => "MERGED",
        }
    }

    /// Parse from database string.
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(PrStatus::Open),
            "MERGED" => Some(PrStatus::Merged),
            _ => None,
        }
    }
}

/// A pull request and its ordered reviewer list.
///
/// The reviewer list is frozen once the pull request is merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: PrStatus,
    pub assigned_reviewers: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    /// New open pull request with no reviewers.
    pub fn new(
        pull_request_id: impl Into<String>,
        pull_request_name: impl Into<String>,
        author_id: impl Into<String>,
    ) -> Self {
        Self {
            pull_request_id: pull_request_id.into(),
            pull_request_name: pull_request_name.into(),
            author_id: author_id.into(),
            status: PrStatus::Open,
            assigned_reviewers: Vec::new(),
            created_at: Utc::now(),
            merged_at: None,
        }
    }

    pub fn is_merged(&self) -> bool {
        self.status == PrStatus::Merged
    }

    pub fn is_reviewer_assigned(&self, user_id: &str) -> bool {
        self.assigned_reviewers.iter().any(|r| r == user_id)
    }

    /// Mark as merged. Merging an already-merged pull request is a no-op and
    /// keeps the original `merged_at`.
    pub fn merge(&mut self, now: DateTime<Utc>) {
        if self.is_merged() {
            return;
        }
        self.status = PrStatus::Merged;
        self.merged_at = Some(now);
    }

    /// Check that `old_user_id` may be replaced on this pull request.
    ///
    /// # Errors
    ///
    /// - `ReviewError::PrMerged` - the reviewer list is frozen
    /// - `ReviewError::NotAssigned` - `old_user_id` is not a reviewer
    pub fn ensure_reassignable(&self, old_user_id: &str) -> Result<(), ReviewError> {
        if self.is_merged() {
            return Err(ReviewError::PrMerged(self.pull_request_id.clone()));
        }
        if !self.is_reviewer_assigned(old_user_id) {
            return Err(ReviewError::NotAssigned {
                pull_request_id: self.pull_request_id.clone(),
                user_id: old_user_id.to_string(),
            });
        }
        Ok(())
    }

    /// Replace `old_user_id` with `new_user_id`.
    ///
    /// Mirrors storage: the old reviewer is removed and the new one appended.
    pub fn replace_reviewer(
        &mut self,
        old_user_id: &str,
        new_user_id: &str,
    ) -> Result<(), ReviewError> {
        self.ensure_reassignable(old_user_id)?;
        self.assigned_reviewers.retain(|r| r != old_user_id);
        if !self.is_reviewer_assigned(new_user_id) {
            self.assigned_reviewers.push(new_user_id.to_string());
        }
        Ok(())
    }

    /// Ids that a replacement reviewer must not be drawn from.
    pub fn exclusion_set(&self) -> HashSet<&str> {
        self.assigned_reviewers
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.author_id.as_str()))
            .collect()
    }
}

/// One reviewer replacement on one pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reassignment {
    pub pull_request_id: String,
    pub old_user_id: String,
    pub new_user_id: String,
}

/// Result of a bulk deactivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkDeactivation {
    /// Roster with every requested id marked inactive.
    pub team: Team,
    /// Ids that were active before the call, in request order.
    pub deactivated_user_ids: Vec<String>,
    pub reassignments: Vec<Reassignment>,
}

/// Result of replacing a single reviewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewerReassignment {
    pub pull_request: PullRequest,
    pub replaced_by: String,
}

/// Reviewer assignment counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentStats {
    /// Review assignments per user.
    pub by_user: BTreeMap<String, i64>,
    /// Reviewers per pull request.
    pub by_pr: BTreeMap<String, i64>,
}
