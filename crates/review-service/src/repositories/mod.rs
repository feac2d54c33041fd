//! Repository layer for the review service.
//!
//! Storage is reached through capability traits, each method taking an
//! explicit transaction handle (`&mut Self::Tx`). A service begins one
//! transaction per workflow and passes the handle down; helpers never begin
//! their own, so nesting reuses the caller's unit of work.
//!
//! Dropping a handle without committing rolls it back. A cancelled or
//! timed-out request therefore never commits partial work.
//!
//! # Components
//!
//! - `postgres` - `PgStore`, backed by sqlx and PostgreSQL
//! - `memory` - `MemoryStore`, an in-process store with failure injection

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::errors::ReviewError;
use crate::models::{AssignmentStats, PullRequest, Team, User};
use async_trait::async_trait;

/// Unit-of-work boundary.
#[async_trait]
pub trait Transactor: Send + Sync {
    /// Transaction handle passed to every repository call in the unit.
    type Tx: Send;

    /// Start a unit of work.
    async fn begin(&self) -> Result<Self::Tx, ReviewError>;

    /// Make every mutation in `tx` visible.
    async fn commit(&self, tx: Self::Tx) -> Result<(), ReviewError>;

    /// Discard every mutation in `tx`.
    async fn rollback(&self, tx: Self::Tx) -> Result<(), ReviewError>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), ReviewError>;
}

#[async_trait]
pub trait TeamRepository: Transactor {
    /// # Errors
    ///
    /// - `ReviewError::TeamExists` - a team with this name exists
    async fn create_team(&self, tx: &mut Self::Tx, team_name: &str) -> Result<(), ReviewError>;

    async fn team_exists(&self, tx: &mut Self::Tx, team_name: &str) -> Result<bool, ReviewError>;

    /// Team with members ordered by username.
    ///
    /// # Errors
    ///
    /// - `ReviewError::NotFound` - no such team
    async fn get_team(&self, tx: &mut Self::Tx, team_name: &str) -> Result<Team, ReviewError>;
}

#[async_trait]
pub trait UserRepository: Transactor {
    /// # Errors
    ///
    /// - `ReviewError::NotFound` - no such user
    async fn get_user(&self, tx: &mut Self::Tx, user_id: &str) -> Result<User, ReviewError>;

    /// Insert a user, or update name, team and activity of an existing one.
    async fn upsert_user(&self, tx: &mut Self::Tx, user: &User) -> Result<(), ReviewError>;

    /// # Errors
    ///
    /// - `ReviewError::NotFound` - no such user
    async fn update_user(&self, tx: &mut Self::Tx, user: &User) -> Result<(), ReviewError>;

    /// Members of a team ordered by username. Empty if the team has none.
    async fn get_team_members(
        &self,
        tx: &mut Self::Tx,
        team_name: &str,
    ) -> Result<Vec<User>, ReviewError>;

    /// Like `get_team_members`, but the rows stay locked until `tx` ends.
    async fn lock_team_members(
        &self,
        tx: &mut Self::Tx,
        team_name: &str,
    ) -> Result<Vec<User>, ReviewError>;

    /// Set `is_active = false` for every id, scoped to `team_name`.
    ///
    /// # Errors
    ///
    /// - `ReviewError::NotFound` - any id is not a member of the team; nothing
    ///   is changed
    async fn deactivate_users(
        &self,
        tx: &mut Self::Tx,
        team_name: &str,
        user_ids: &[String],
    ) -> Result<(), ReviewError>;
}

#[async_trait]
pub trait PullRequestRepository: Transactor {
    /// Insert a pull request without reviewers.
    ///
    /// # Errors
    ///
    /// - `ReviewError::PrExists` - the id is taken
    async fn create_pull_request(
        &self,
        tx: &mut Self::Tx,
        pr: &PullRequest,
    ) -> Result<(), ReviewError>;

    async fn pull_request_exists(
        &self,
        tx: &mut Self::Tx,
        pull_request_id: &str,
    ) -> Result<bool, ReviewError>;

    /// Pull request with reviewers in assignment order.
    ///
    /// # Errors
    ///
    /// - `ReviewError::NotFound` - no such pull request
    async fn get_pull_request(
        &self,
        tx: &mut Self::Tx,
        pull_request_id: &str,
    ) -> Result<PullRequest, ReviewError>;

    /// Like `get_pull_request`, but the row stays locked until `tx` ends.
    async fn lock_pull_request(
        &self,
        tx: &mut Self::Tx,
        pull_request_id: &str,
    ) -> Result<PullRequest, ReviewError>;

    /// Persist status, merge time and the full reviewer list.
    ///
    /// # Errors
    ///
    /// - `ReviewError::NotFound` - the pull request no longer exists
    async fn update_pull_request(
        &self,
        tx: &mut Self::Tx,
        pr: &PullRequest,
    ) -> Result<(), ReviewError>;

    /// Attach reviewers. Ids already attached are skipped.
    async fn assign_reviewers(
        &self,
        tx: &mut Self::Tx,
        pull_request_id: &str,
        user_ids: &[String],
    ) -> Result<(), ReviewError>;

    /// # Errors
    ///
    /// - `ReviewError::NotFound` - the user is not a reviewer of the pull request
    async fn remove_reviewer(
        &self,
        tx: &mut Self::Tx,
        pull_request_id: &str,
        user_id: &str,
    ) -> Result<(), ReviewError>;

    /// Attach one reviewer. A no-op if already attached.
    async fn add_reviewer(
        &self,
        tx: &mut Self::Tx,
        pull_request_id: &str,
        user_id: &str,
    ) -> Result<(), ReviewError>;

    /// Ids of open pull requests on which `user_id` is a reviewer, oldest first.
    async fn open_pull_request_ids_by_reviewer(
        &self,
        tx: &mut Self::Tx,
        user_id: &str,
    ) -> Result<Vec<String>, ReviewError>;

    /// Every pull request on which `user_id` is a reviewer, oldest first.
    async fn pull_requests_by_reviewer(
        &self,
        tx: &mut Self::Tx,
        user_id: &str,
    ) -> Result<Vec<PullRequest>, ReviewError>;

    async fn assignment_stats(&self, tx: &mut Self::Tx) -> Result<AssignmentStats, ReviewError>;
}

/// Every capability the HTTP layer needs, in one bound.
pub trait ReviewStore:
    TeamRepository + UserRepository + PullRequestRepository + Clone + 'static
{
}

impl<T> ReviewStore for T where
    T: TeamRepository + UserRepository + PullRequestRepository + Clone + 'static
{
}
