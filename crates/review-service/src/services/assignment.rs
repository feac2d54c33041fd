//! Reviewer assignment strategy.
//!
//! Randomized candidate selection over a team roster snapshot. The random
//! source is owned by the strategy and guarded by a mutex, so one instance
//! can be shared by concurrent requests. A fixed seed makes selection
//! reproducible in tests.

use crate::errors::ReviewError;
use crate::models::{Team, MAX_REVIEWERS};
use crate::observability::metrics;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Picks reviewers and replacement reviewers from a team roster.
#[derive(Debug)]
pub struct AssignmentStrategy {
    rng: Mutex<StdRng>,
}

impl Default for AssignmentStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl AssignmentStrategy {
    /// Strategy seeded from OS entropy.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Strategy with a fixed seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    /// Seeded when `seed` is set, otherwise from entropy.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::new, Self::with_seed)
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    // A panic while holding the lock can't leave the rng in a bad state.
    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Select up to two reviewers for a new pull request.
    ///
    /// Candidates are the active members of `team` other than the author.
    /// Returns `min(2, candidates)` distinct ids in random order. An empty
    /// result is valid.
    pub fn select_reviewers(&self, team: &Team, author_id: &str) -> Vec<String> {
        let exclude = HashSet::from([author_id]);
        let mut candidates: Vec<&str> = team
            .active_members_excluding(&exclude)
            .into_iter()
            .map(|m| m.user_id.as_str())
            .collect();

        if candidates.is_empty() {
            tracing::debug!(
                target: "review.service.assignment",
                team_name = %team.team_name,
                author_id = %author_id,
                "No reviewer candidates, creating pull request without reviewers"
            );
            metrics::record_reviewer_selection("initial", "empty");
            return Vec::new();
        }

        candidates.shuffle(&mut *self.rng());
        candidates.truncate(MAX_REVIEWERS);

        metrics::record_reviewer_selection("initial", "selected");
        candidates.into_iter().map(str::to_string).collect()
    }

    /// Select one replacement reviewer.
    ///
    /// The result is an active member of `team` that is not in `exclude`.
    ///
    /// # Errors
    ///
    /// - `ReviewError::NoCandidate` - every active member is excluded
    pub fn select_replacement_reviewer(
        &self,
        team: &Team,
        exclude: &HashSet<&str>,
    ) -> Result<String, ReviewError> {
        let candidates = team.active_members_excluding(exclude);

        if candidates.is_empty() {
            tracing::warn!(
                target: "review.service.assignment",
                team_name = %team.team_name,
                excluded = exclude.len(),
                "No active replacement candidate"
            );
            metrics::record_reviewer_selection("replacement", "no_candidate");
            return Err(ReviewError::NoCandidate(team.team_name.clone()));
        }

        let index = self.rng().gen_range(0..candidates.len());
        let chosen = candidates
            .get(index)
            .map(|m| m.user_id.clone())
            .ok_or_else(|| ReviewError::Internal("candidate index out of range".to_string()))?;

        metrics::record_reviewer_selection("replacement", "selected");
        Ok(chosen)
    }
}
