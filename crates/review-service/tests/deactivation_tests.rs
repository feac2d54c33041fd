//! Bulk deactivation integration tests.
//!
//! Teams are sized so that reviewer selection has exactly one possible
//! outcome, which keeps the assertions independent of the random source.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use reqwest::{Client, StatusCode};
use review_service::repositories::MemoryStore;
use review_test_utils::{
    error_code, expect_status, reviewer_ids, seed_pull_request, seed_team, TestReviewServer,
};
use serde_json::{json, Value};

async fn deactivate(
    client: &Client,
    server: &TestReviewServer<MemoryStore>,
    team_name: &str,
    user_ids: &[&str],
) -> Result<reqwest::Response, anyhow::Error> {
    Ok(client
        .post(format!("{}/users/deactivateTeamMembers", server.url()))
        .json(&json!({ "team_name": team_name, "user_ids": user_ids }))
        .send()
        .await?)
}

async fn set_active(
    client: &Client,
    server: &TestReviewServer<MemoryStore>,
    user_id: &str,
    is_active: bool,
) -> Result<(), anyhow::Error> {
    let response = client
        .post(format!("{}/users/setIsActive", server.url()))
        .json(&json!({ "user_id": user_id, "is_active": is_active }))
        .send()
        .await?;
    expect_status(response, StatusCode::OK).await?;
    Ok(())
}

async fn team_member(
    client: &Client,
    server: &TestReviewServer<MemoryStore>,
    team_name: &str,
    user_id: &str,
) -> Result<Value, anyhow::Error> {
    let response = client
        .get(format!("{}/team/get", server.url()))
        .query(&[("team_name", team_name)])
        .send()
        .await?;
    let body = expect_status(response, StatusCode::OK).await?;
    body["members"]
        .as_array()
        .and_then(|members| members.iter().find(|m| m["user_id"] == user_id))
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("{} not in {}", user_id, team_name))
}

async fn reviews_of(
    client: &Client,
    server: &TestReviewServer<MemoryStore>,
    user_id: &str,
) -> Result<Vec<String>, anyhow::Error> {
    let response = client
        .get(format!("{}/users/getReview", server.url()))
        .query(&[("user_id", user_id)])
        .send()
        .await?;
    let body = expect_status(response, StatusCode::OK).await?;
    Ok(body["pull_requests"]
        .as_array()
        .map(|prs| {
            prs.iter()
                .filter_map(|pr| pr["pull_request_id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default())
}

/// Team where pr-1 (by u1) is reviewed by u2 and u3, and u4 is the only
/// spare reviewer.
async fn one_spare() -> Result<(TestReviewServer<MemoryStore>, Client), anyhow::Error> {
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
            ("u4", "Dave", false),
        ],
    )
    .await?;
    let pr = seed_pull_request(&client, &server, "pr-1", "u1").await?;
    let mut reviewers = reviewer_ids(&pr);
    reviewers.sort();
    assert_eq!(reviewers, vec!["u2".to_string(), "u3".to_string()]);
    set_active(&client, &server, "u4", true).await?;
    Ok((server, client))
}

#[tokio::test]
async fn test_deactivation_reassigns_open_reviews() -> Result<(), anyhow::Error> {
    let (server, client) = one_spare().await?;

    let response = deactivate(&client, &server, "backend", &["u2"]).await?;
    let body = expect_status(response, StatusCode::OK).await?;

    assert_eq!(body["team_name"], "backend");
    assert_eq!(body["deactivated_user_ids"], json!(["u2"]));
    assert_eq!(
        body["reassignments"],
        json!([{ "pull_request_id": "pr-1", "old_user_id": "u2", "new_user_id": "u4" }])
    );

    let u2 = body["team_members"]
        .as_array()
        .and_then(|members| members.iter().find(|m| m["user_id"] == "u2"))
        .cloned()
        .unwrap_or_default();
    assert_eq!(u2["is_active"], false);

    assert!(reviews_of(&client, &server, "u2").await?.is_empty());
    assert_eq!(reviews_of(&client, &server, "u4").await?, vec!["pr-1"]);
    assert_eq!(team_member(&client, &server, "backend", "u2").await?["is_active"], false);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_ids_are_processed_once() -> Result<(), anyhow::Error> {
    let (server, client) = one_spare().await?;

    let response = deactivate(&client, &server, "backend", &["u2", " u2 ", "u2"]).await?;
    let body = expect_status(response, StatusCode::OK).await?;

    assert_eq!(body["deactivated_user_ids"], json!(["u2"]));
    assert_eq!(body["reassignments"].as_array().map(Vec::len), Some(1));

    Ok(())
}

#[tokio::test]
async fn test_no_candidate_leaves_everything_unchanged() -> Result<(), anyhow::Error> {
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
    seed_pull_request(&client, &server, "pr-2", "u1").await?;

    let response = deactivate(&client, &server, "backend", &["u2"]).await?;
    let body = expect_status(response, StatusCode::CONFLICT).await?;
    assert_eq!(error_code(&body), Some("NO_CANDIDATE"));

    assert_eq!(team_member(&client, &server, "backend", "u2").await?["is_active"], true);
    assert_eq!(reviews_of(&client, &server, "u2").await?, vec!["pr-2"]);

    Ok(())
}

#[tokio::test]
async fn test_targets_cannot_replace_each_other() -> Result<(), anyhow::Error> {
    let (server, client) = one_spare().await?;
    // Without u4 the only other members are the targets themselves.
    set_active(&client, &server, "u4", false).await?;

    let response = deactivate(&client, &server, "backend", &["u2", "u3"]).await?;
    let body = expect_status(response, StatusCode::CONFLICT).await?;
    assert_eq!(error_code(&body), Some("NO_CANDIDATE"));

    for user_id in ["u2", "u3"] {
        assert_eq!(team_member(&client, &server, "backend", user_id).await?["is_active"], true);
        assert_eq!(reviews_of(&client, &server, user_id).await?, vec!["pr-1"]);
    }

    Ok(())
}

#[tokio::test]
async fn test_merged_pull_requests_are_not_reassigned() -> Result<(), anyhow::Error> {
    let (server, client) = one_spare().await?;
    let response = client
        .post(format!("{}/pullRequest/merge", server.url()))
        .json(&json!({ "pull_request_id": "pr-1" }))
        .send()
        .await?;
    expect_status(response, StatusCode::OK).await?;

    let response = deactivate(&client, &server, "backend", &["u2", "u3"]).await?;
    let body = expect_status(response, StatusCode::OK).await?;

    assert_eq!(body["deactivated_user_ids"], json!(["u2", "u3"]));
    assert_eq!(body["reassignments"], json!([]));
    assert_eq!(reviews_of(&client, &server, "u2").await?, vec!["pr-1"]);

    Ok(())
}

#[tokio::test]
async fn test_already_inactive_members_are_ignored() -> Result<(), anyhow::Error> {
    let (server, client) = one_spare().await?;
    set_active(&client, &server, "u4", false).await?;

    let response = deactivate(&client, &server, "backend", &["u4"]).await?;
    let body = expect_status(response, StatusCode::OK).await?;

    assert_eq!(body["deactivated_user_ids"], json!([]));
    assert_eq!(body["reassignments"], json!([]));
    assert_eq!(body["team_members"].as_array().map(Vec::len), Some(4));

    Ok(())
}

#[tokio::test]
async fn test_invalid_requests() -> Result<(), anyhow::Error> {
    let (server, client) = one_spare().await?;
    seed_team(&client, &server, "frontend", &[("f1", "Erin", true)]).await?;

    let body = expect_status(
        deactivate(&client, &server, "backend", &[]).await?,
        StatusCode::BAD_REQUEST,
    )
    .await?;
    assert_eq!(error_code(&body), Some("INVALID_ARGUMENT"));

    let body = expect_status(
        deactivate(&client, &server, "backend", &["u2", " "]).await?,
        StatusCode::BAD_REQUEST,
    )
    .await?;
    assert_eq!(error_code(&body), Some("INVALID_ARGUMENT"));

    let body = expect_status(
        deactivate(&client, &server, "ghost", &["u2"]).await?,
        StatusCode::NOT_FOUND,
    )
    .await?;
    assert_eq!(error_code(&body), Some("NOT_FOUND"));

    // f1 exists, but not in backend; u2 must stay active.
    let body = expect_status(
        deactivate(&client, &server, "backend", &["u2", "f1"]).await?,
        StatusCode::NOT_FOUND,
    )
    .await?;
    assert_eq!(error_code(&body), Some("NOT_FOUND"));
    assert_eq!(team_member(&client, &server, "backend", "u2").await?["is_active"], true);

    Ok(())
}

#[tokio::test]
async fn test_storage_failure_rolls_back() -> Result<(), anyhow::Error> {
    let (server, client) = one_spare().await?;
    server.store().fail_on("add_reviewer");

    let response = deactivate(&client, &server, "backend", &["u2"]).await?;
    let body = expect_status(response, StatusCode::INTERNAL_SERVER_ERROR).await?;
    assert_eq!(error_code(&body), Some("DATABASE_ERROR"));

    server.store().clear_failures();
    assert_eq!(team_member(&client, &server, "backend", "u2").await?["is_active"], true);
    assert_eq!(reviews_of(&client, &server, "u2").await?, vec!["pr-1"]);

    Ok(())
}
