//! In-memory store.
//!
//! Implements every repository capability over process-local state. A
//! transaction holds the state lock for its whole lifetime and works on a
//! private copy: `commit` publishes the copy, dropping the handle discards it.
//! Transactions are therefore fully serialized.
//!
//! Operations can be made to fail by name with [`MemoryStore::fail_on`],
//! which is how tests exercise rollback paths.

use super::{PullRequestRepository, TeamRepository, Transactor, UserRepository};
use crate::errors::ReviewError;
use crate::models::{AssignmentStats, PrStatus, PullRequest, Team, User};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    teams: BTreeSet<String>,
    users: HashMap<String, User>,
    // Creation order.
    pull_requests: Vec<PullRequest>,
}

impl MemoryState {
    fn pull_request(&self, pull_request_id: &str) -> Result<&PullRequest, ReviewError> {
        self.pull_requests
            .iter()
            .find(|pr| pr.pull_request_id == pull_request_id)
            .ok_or_else(|| ReviewError::NotFound(format!("pull request {}", pull_request_id)))
    }

    fn pull_request_mut(&mut self, pull_request_id: &str) -> Result<&mut PullRequest, ReviewError> {
        self.pull_requests
            .iter_mut()
            .find(|pr| pr.pull_request_id == pull_request_id)
            .ok_or_else(|| ReviewError::NotFound(format!("pull request {}", pull_request_id)))
    }

    fn ensure_user(&self, user_id: &str) -> Result<(), ReviewError> {
        if self.users.contains_key(user_id) {
            Ok(())
        } else {
            Err(ReviewError::NotFound(format!("user {}", user_id)))
        }
    }

    fn team_members(&self, team_name: &str) -> Vec<User> {
        let mut members: Vec<User> = self
            .users
            .values()
            .filter(|u| u.team_name == team_name)
            .cloned()
            .collect();
        members.sort_by(|a, b| {
            a.username
                .cmp(&b.username)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        members
    }
}

/// Process-local store. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    failing: Arc<std::sync::Mutex<HashSet<&'static str>>>,
}

/// Transaction handle for [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call of `operation` fail with a database error.
    ///
    /// `operation` is a trait method name such as `"add_reviewer"` or
    /// `"commit"`.
    pub fn fail_on(&self, operation: &'static str) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation);
    }

    /// Undo every `fail_on`.
    pub fn clear_failures(&self) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn check(&self, operation: &'static str) -> Result<(), ReviewError> {
        let failing = self.failing.lock().unwrap_or_else(PoisonError::into_inner);
        if failing.contains(operation) {
            return Err(ReviewError::Database(format!(
                "injected failure in {}",
                operation
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Transactor for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, ReviewError> {
        self.check("begin")?;
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx { guard, working })
    }

    async fn commit(&self, tx: MemoryTx) -> Result<(), ReviewError> {
        self.check("commit")?;
        let MemoryTx { mut guard, working } = tx;
        *guard = working;
        Ok(())
    }

    async fn rollback(&self, tx: MemoryTx) -> Result<(), ReviewError> {
        drop(tx);
        Ok(())
    }

    async fn ping(&self) -> Result<(), ReviewError> {
        self.check("ping")
    }
}

#[async_trait]
impl TeamRepository for MemoryStore {
    async fn create_team(&self, tx: &mut MemoryTx, team_name: &str) -> Result<(), ReviewError> {
        self.check("create_team")?;
        if !tx.working.teams.insert(team_name.to_string()) {
            return Err(ReviewError::TeamExists(team_name.to_string()));
        }
        Ok(())
    }

    async fn team_exists(&self, tx: &mut MemoryTx, team_name: &str) -> Result<bool, ReviewError> {
        self.check("team_exists")?;
        Ok(tx.working.teams.contains(team_name))
    }

    async fn get_team(&self, tx: &mut MemoryTx, team_name: &str) -> Result<Team, ReviewError> {
        self.check("get_team")?;
        if !tx.working.teams.contains(team_name) {
            return Err(ReviewError::NotFound(format!("team {}", team_name)));
        }
        Ok(Team {
            team_name: team_name.to_string(),
            members: tx.working.team_members(team_name),
        })
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_user(&self, tx: &mut MemoryTx, user_id: &str) -> Result<User, ReviewError> {
        self.check("get_user")?;
        tx.working
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| ReviewError::NotFound(format!("user {}", user_id)))
    }

    async fn upsert_user(&self, tx: &mut MemoryTx, user: &User) -> Result<(), ReviewError> {
        self.check("upsert_user")?;
        if !tx.working.teams.contains(&user.team_name) {
            return Err(ReviewError::NotFound(format!("team {}", user.team_name)));
        }
        tx.working.users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn update_user(&self, tx: &mut MemoryTx, user: &User) -> Result<(), ReviewError> {
        self.check("update_user")?;
        let stored = tx
            .working
            .users
            .get_mut(&user.user_id)
            .ok_or_else(|| ReviewError::NotFound(format!("user {}", user.user_id)))?;
        *stored = user.clone();
        Ok(())
    }

    async fn get_team_members(
        &self,
        tx: &mut MemoryTx,
        team_name: &str,
    ) -> Result<Vec<User>, ReviewError> {
        self.check("get_team_members")?;
        Ok(tx.working.team_members(team_name))
    }

    async fn lock_team_members(
        &self,
        tx: &mut MemoryTx,
        team_name: &str,
    ) -> Result<Vec<User>, ReviewError> {
        // The transaction already holds the only lock.
        self.check("lock_team_members")?;
        Ok(tx.working.team_members(team_name))
    }

    async fn deactivate_users(
        &self,
        tx: &mut MemoryTx,
        team_name: &str,
        user_ids: &[String],
    ) -> Result<(), ReviewError> {
        self.check("deactivate_users")?;
        let users = &mut tx.working.users;

        if let Some(missing) = user_ids
            .iter()
            .find(|id| users.get(id.as_str()).map(|u| u.team_name.as_str()) != Some(team_name))
        {
            return Err(ReviewError::NotFound(format!(
                "user {} in team {}",
                missing, team_name
            )));
        }

        for id in user_ids {
            if let Some(user) = users.get_mut(id) {
                user.is_active = false;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PullRequestRepository for MemoryStore {
    async fn create_pull_request(
        &self,
        tx: &mut MemoryTx,
        pr: &PullRequest,
    ) -> Result<(), ReviewError> {
        self.check("create_pull_request")?;
        let state = &mut tx.working;
        if state.pull_request(&pr.pull_request_id).is_ok() {
            return Err(ReviewError::PrExists(pr.pull_request_id.clone()));
        }
        state.ensure_user(&pr.author_id)?;
        state.pull_requests.push(PullRequest {
            assigned_reviewers: Vec::new(),
            ..pr.clone()
        });
        Ok(())
    }

    async fn pull_request_exists(
        &self,
        tx: &mut MemoryTx,
        pull_request_id: &str,
    ) -> Result<bool, ReviewError> {
        self.check("pull_request_exists")?;
        Ok(tx.working.pull_request(pull_request_id).is_ok())
    }

    async fn get_pull_request(
        &self,
        tx: &mut MemoryTx,
        pull_request_id: &str,
    ) -> Result<PullRequest, ReviewError> {
        self.check("get_pull_request")?;
        tx.working.pull_request(pull_request_id).cloned()
    }

    async fn lock_pull_request(
        &self,
        tx: &mut MemoryTx,
        pull_request_id: &str,
    ) -> Result<PullRequest, ReviewError> {
        self.check("lock_pull_request")?;
        tx.working.pull_request(pull_request_id).cloned()
    }

    async fn update_pull_request(
        &self,
        tx: &mut MemoryTx,
        pr: &PullRequest,
    ) -> Result<(), ReviewError> {
        self.check("update_pull_request")?;
        let stored = tx.working.pull_request_mut(&pr.pull_request_id)?;
        stored.pull_request_name = pr.pull_request_name.clone();
        stored.status = pr.status;
        stored.merged_at = pr.merged_at;
        stored.assigned_reviewers = pr.assigned_reviewers.clone();
        Ok(())
    }

    async fn assign_reviewers(
        &self,
        tx: &mut MemoryTx,
        pull_request_id: &str,
        user_ids: &[String],
    ) -> Result<(), ReviewError> {
        self.check("assign_reviewers")?;
        for id in user_ids {
            tx.working.ensure_user(id)?;
        }
        let pr = tx.working.pull_request_mut(pull_request_id)?;
        for id in user_ids {
            if !pr.is_reviewer_assigned(id) {
                pr.assigned_reviewers.push(id.clone());
            }
        }
        Ok(())
    }

    async fn remove_reviewer(
        &self,
        tx: &mut MemoryTx,
        pull_request_id: &str,
        user_id: &str,
    ) -> Result<(), ReviewError> {
        self.check("remove_reviewer")?;
        let pr = tx.working.pull_request_mut(pull_request_id)?;
        if !pr.is_reviewer_assigned(user_id) {
            return Err(ReviewError::NotFound(format!(
                "reviewer {} on pull request {}",
                user_id, pull_request_id
            )));
        }
        pr.assigned_reviewers.retain(|r| r != user_id);
        Ok(())
    }

    async fn add_reviewer(
        &self,
        tx: &mut MemoryTx,
        pull_request_id: &str,
        user_id: &str,
    ) -> Result<(), ReviewError> {
        self.check("add_reviewer")?;
        tx.working.ensure_user(user_id)?;
        let pr = tx.working.pull_request_mut(pull_request_id)?;
        if !pr.is_reviewer_assigned(user_id) {
            pr.assigned_reviewers.push(user_id.to_string());
        }
        Ok(())
    }

    async fn open_pull_request_ids_by_reviewer(
        &self,
        tx: &mut MemoryTx,
        user_id: &str,
    ) -> Result<Vec<String>, ReviewError> {
        self.check("open_pull_request_ids_by_reviewer")?;
        Ok(tx
            .working
            .pull_requests
            .iter()
            .filter(|pr| pr.status == PrStatus::Open && pr.is_reviewer_assigned(user_id))
            .map(|pr| pr.pull_request_id.clone())
            .collect())
    }

    async fn pull_requests_by_reviewer(
        &self,
        tx: &mut MemoryTx,
        user_id: &str,
    ) -> Result<Vec<PullRequest>, ReviewError> {
        self.check("pull_requests_by_reviewer")?;
        Ok(tx
            .working
            .pull_requests
            .iter()
            .filter(|pr| pr.is_reviewer_assigned(user_id))
            .cloned()
            .collect())
    }

    async fn assignment_stats(&self, tx: &mut MemoryTx) -> Result<AssignmentStats, ReviewError> {
        self.check("assignment_stats")?;
        let mut stats = AssignmentStats::default();
        for pr in &tx.working.pull_requests {
            stats
                .by_pr
                .insert(pr.pull_request_id.clone(), pr.assigned_reviewers.len() as i64);
            for reviewer in &pr.assigned_reviewers {
                *stats.by_user.entry(reviewer.clone()).or_insert(0) += 1;
            }
        }
        Ok(stats)
    }
}
