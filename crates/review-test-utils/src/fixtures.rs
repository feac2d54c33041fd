//! HTTP fixtures for seeding a running test server.
//!
//! Every helper asserts on the status code it expects, so a failing seed
//! surfaces at the call site rather than as a confusing later assertion.

use crate::server_harness::TestReviewServer;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

/// Create `team_name` with `(user_id, username, is_active)` members.
pub async fn seed_team<S>(
    client: &Client,
    server: &TestReviewServer<S>,
    team_name: &str,
    members: &[(&str, &str, bool)],
) -> Result<Value, anyhow::Error>
where
    S: review_service::repositories::ReviewStore,
{
    let members: Vec<Value> = members
        .iter()
        .map(|(user_id, username, is_active)| {
            json!({ "user_id": user_id, "username": username, "is_active": is_active })
        })
        .collect();

    let response = client
        .post(format!("{}/team/add", server.url()))
        .json(&json!({ "team_name": team_name, "members": members }))
        .send()
        .await?;

    expect_status(response, StatusCode::CREATED).await
}

/// Create a pull request and return the `pr` object.
pub async fn seed_pull_request<S>(
    client: &Client,
    server: &TestReviewServer<S>,
    pull_request_id: &str,
    author_id: &str,
) -> Result<Value, anyhow::Error>
where
    S: review_service::repositories::ReviewStore,
{
    let response = client
        .post(format!("{}/pullRequest/create", server.url()))
        .json(&json!({
            "pull_request_id": pull_request_id,
            "pull_request_name": format!("PR {}", pull_request_id),
            "author_id": author_id,
        }))
        .send()
        .await?;

    let body = expect_status(response, StatusCode::CREATED).await?;
    Ok(body["pr"].clone())
}

/// Reviewer ids of a pull request `pr` object.
pub fn reviewer_ids(pr: &Value) -> Vec<String> {
    pr["assigned_reviewers"]
        .as_array()
        .map(|ids| {
            ids.iter()
                .filter_map(|id| id.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Read the JSON body after checking the status.
pub async fn expect_status(
    response: reqwest::Response,
    expected: StatusCode,
) -> Result<Value, anyhow::Error> {
    let status = response.status();
    let body = response.text().await?;
    if status != expected {
        anyhow::bail!("expected {}, got {}: {}", expected, status, body);
    }
    Ok(serde_json::from_str(&body)?)
}

/// The `error.code` field of an error body.
pub fn error_code(body: &Value) -> Option<&str> {
    body["error"]["code"].as_str()
}
