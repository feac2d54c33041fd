//! Seed helpers for service unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::models::{PullRequest, User};
use crate::repositories::{
    MemoryStore, PullRequestRepository, TeamRepository, Transactor, UserRepository,
};

/// Create `team_name` with `(user_id, is_active)` members.
pub(crate) async fn seed_team(store: &MemoryStore, team_name: &str, members: &[(&str, bool)]) {
    let mut tx = store.begin().await.unwrap();
    store.create_team(&mut tx, team_name).await.unwrap();
    for (id, active) in members {
        store
            .upsert_user(&mut tx, &User::new(*id, format!("user-{id}"), team_name, *active))
            .await
            .unwrap();
    }
    store.commit(tx).await.unwrap();
}

/// Create an open pull request with exactly `reviewers`.
pub(crate) async fn seed_pull_request(
    store: &MemoryStore,
    pull_request_id: &str,
    author_id: &str,
    reviewers: &[&str],
) {
    let mut tx = store.begin().await.unwrap();
    store
        .create_pull_request(
            &mut tx,
            &PullRequest::new(pull_request_id, format!("PR {pull_request_id}"), author_id),
        )
        .await
        .unwrap();
    let reviewers: Vec<String> = reviewers.iter().map(|r| r.to_string()).collect();
    store
        .assign_reviewers(&mut tx, pull_request_id, &reviewers)
        .await
        .unwrap();
    store.commit(tx).await.unwrap();
}

/// Merge an existing pull request.
pub(crate) async fn seed_merge(store: &MemoryStore, pull_request_id: &str) {
    let mut tx = store.begin().await.unwrap();
    let mut pr = store.get_pull_request(&mut tx, pull_request_id).await.unwrap();
    pr.merge(chrono::Utc::now());
    store.update_pull_request(&mut tx, &pr).await.unwrap();
    store.commit(tx).await.unwrap();
}

pub(crate) async fn reviewers_of(store: &MemoryStore, pull_request_id: &str) -> Vec<String> {
    let mut tx = store.begin().await.unwrap();
    store
        .get_pull_request(&mut tx, pull_request_id)
        .await
        .unwrap()
        .assigned_reviewers
}

pub(crate) async fn is_active(store: &MemoryStore, user_id: &str) -> bool {
    let mut tx = store.begin().await.unwrap();
    store.get_user(&mut tx, user_id).await.unwrap().is_active
}
