//! Pull request endpoint integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use reqwest::{Client, StatusCode};
use review_service::repositories::MemoryStore;
use review_test_utils::{
    error_code, expect_status, reviewer_ids, seed_pull_request, seed_team, TestReviewServer,
};
use serde_json::json;
use std::collections::HashSet;

async fn backend_server() -> Result<(TestReviewServer<MemoryStore>, Client), anyhow::Error> {
    let server = TestReviewServer::spawn(MemoryStore::new()).await?;
    let client = Client::new();
    seed_team(
        &client,
        &server,
        "backend",
        &[
            ("u1", "Alice", true),
            ("u2", "Bob", true),
            ("u3", "Carol", true),
            ("u4", "Dave", true),
        ],
    )
    .await?;
    Ok((server, client))
}

#[tokio::test]
async fn test_create_assigns_two_reviewers_from_team() -> Result<(), anyhow::Error> {
    let (server, client) = backend_server().await?;

    let pr = seed_pull_request(&client, &server, "pr-1", "u1").await?;

    assert_eq!(pr["status"], "OPEN");
    assert!(pr.get("createdAt").is_some());
    assert!(pr.get("mergedAt").is_none());

    let reviewers = reviewer_ids(&pr);
    assert_eq!(reviewers.len(), 2);
    let unique: HashSet<&String> = reviewers.iter().collect();
    assert_eq!(unique.len(), 2);
    for reviewer in &reviewers {
        assert!(["u2", "u3", "u4"].contains(&reviewer.as_str()));
    }

    Ok(())
}

#[tokio::test]
async fn test_create_duplicate_returns_pr_exists() -> Result<(), anyhow::Error> {
    let (server, client) = backend_server().await?;
    seed_pull_request(&client, &server, "pr-1", "u1").await?;

    let response = client
        .post(format!("{}/pullRequest/create", server.url()))
        .json(&json!({
            "pull_request_id": "pr-1",
            "pull_request_name": "Again",
            "author_id": "u2"
        }))
        .send()
        .await?;

    let body = expect_status(response, StatusCode::CONFLICT).await?;
    assert_eq!(error_code(&body), Some("PR_EXISTS"));

    Ok(())
}

#[tokio::test]
async fn test_create_with_unknown_author_returns_404() -> Result<(), anyhow::Error> {
    let (server, client) = backend_server().await?;

    let response = client
        .post(format!("{}/pullRequest/create", server.url()))
        .json(&json!({ "pull_request_id": "pr-1", "pull_request_name": "X", "author_id": "ghost" }))
        .send()
        .await?;

    let body = expect_status(response, StatusCode::NOT_FOUND).await?;
    assert_eq!(error_code(&body), Some("NOT_FOUND"));

    Ok(())
}

#[tokio::test]
async fn test_merge_is_idempotent() -> Result<(), anyhow::Error> {
    let (server, client) = backend_server().await?;
    seed_pull_request(&client, &server, "pr-1", "u1").await?;

    let merge = || {
        client
            .post(format!("{}/pullRequest/merge", server.url()))
            .json(&json!({ "pull_request_id": "pr-1" }))
            .send()
    };

    let first = expect_status(merge().await?, StatusCode::OK).await?;
    let second = expect_status(merge().await?, StatusCode::OK).await?;

    assert_eq!(first["pr"]["status"], "MERGED");
    assert!(first["pr"].get("mergedAt").is_some());
    assert_eq!(first, second);

    Ok(())
}

#[tokio::test]
async fn test_reassign_replaces_reviewer() -> Result<(), anyhow::Error> {
    let (server, client) = backend_server().await?;
    let pr = seed_pull_request(&client, &server, "pr-1", "u1").await?;
    let before = reviewer_ids(&pr);
    let old = before.first().cloned().unwrap_or_default();

    let response = client
        .post(format!("{}/pullRequest/reassign", server.url()))
        .json(&json!({ "pull_request_id": "pr-1", "old_user_id": old }))
        .send()
        .await?;
    let body = expect_status(response, StatusCode::OK).await?;

    let replaced_by = body["replaced_by"].as_str().unwrap_or_default().to_string();
    let after = reviewer_ids(&body["pr"]);

    assert!(!after.contains(&old));
    assert!(after.contains(&replaced_by));
    assert_ne!(replaced_by, "u1");
    assert!(!before.contains(&replaced_by));
    assert_eq!(after.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_reassign_errors() -> Result<(), anyhow::Error> {
    let (server, client) = backend_server().await?;
    let pr = seed_pull_request(&client, &server, "pr-1", "u1").await?;
    let assigned = reviewer_ids(&pr);

    let reassign = |old: String| {
        client
            .post(format!("{}/pullRequest/reassign", server.url()))
            .json(&json!({ "pull_request_id": "pr-1", "old_user_id": old }))
            .send()
    };

    // The author is never a reviewer.
    let body = expect_status(reassign("u1".to_string()).await?, StatusCode::CONFLICT).await?;
    assert_eq!(error_code(&body), Some("NOT_ASSIGNED"));

    let old = assigned.first().cloned().unwrap_or_default();
    let body = expect_status(reassign(old).await?, StatusCode::OK).await?;

    client
        .post(format!("{}/pullRequest/merge", server.url()))
        .json(&json!({ "pull_request_id": "pr-1" }))
        .send()
        .await?;
    let current = reviewer_ids(&body["pr"]);
    let frozen = current.first().cloned().unwrap_or_default();
    let body = expect_status(reassign(frozen).await?, StatusCode::CONFLICT).await?;
    assert_eq!(error_code(&body), Some("PR_MERGED"));

    Ok(())
}

#[tokio::test]
async fn test_reassign_without_candidate_returns_no_candidate() -> Result<(), anyhow::Error> {
    let server = TestReviewServer::spawn(MemoryStore::new()).await?;
    let client = Client::new();
    seed_team(
        &client,
        &server,
        "backend",
        &[
            ("u1", "Alice", true),
            ("u2", "Bob", true),
            ("u3", "Carol", false),
            ("u4", "Dave", false),
        ],
    )
    .await?;
    let pr = seed_pull_request(&client, &server, "pr-2", "u1").await?;
    assert_eq!(reviewer_ids(&pr), vec!["u2".to_string()]);

    let response = client
        .post(format!("{}/pullRequest/reassign", server.url()))
        .json(&json!({ "pull_request_id": "pr-2", "old_user_id": "u2" }))
        .send()
        .await?;
    let body = expect_status(response, StatusCode::CONFLICT).await?;
    assert_eq!(error_code(&body), Some("NO_CANDIDATE"));

    let response = client
        .get(format!("{}/users/getReview", server.url()))
        .query(&[("user_id", "u2")])
        .send()
        .await?;
    let body = expect_status(response, StatusCode::OK).await?;
    assert_eq!(body["pull_requests"][0]["pull_request_id"], "pr-2");

    Ok(())
}

#[tokio::test]
async fn test_assignment_stats() -> Result<(), anyhow::Error> {
    let (server, client) = backend_server().await?;
    seed_pull_request(&client, &server, "pr-1", "u1").await?;
    seed_pull_request(&client, &server, "pr-2", "u2").await?;

    let response = client
        .get(format!("{}/stats/assignments", server.url()))
        .send()
        .await?;
    let body = expect_status(response, StatusCode::OK).await?;

    assert_eq!(body["by_pr"]["pr-1"], 2);
    assert_eq!(body["by_pr"]["pr-2"], 2);
    let total: i64 = body["by_user"]
        .as_object()
        .map(|m| m.values().filter_map(|v| v.as_i64()).sum())
        .unwrap_or_default();
    assert_eq!(total, 4);

    Ok(())
}
