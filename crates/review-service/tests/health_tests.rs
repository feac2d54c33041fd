//! Health endpoint integration tests.
//!
//! `/health` returns plain text for liveness probes, `/ready` returns JSON
//! with the database status.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use review_service::repositories::MemoryStore;
use review_test_utils::TestReviewServer;

#[tokio::test]
async fn test_health_endpoint_returns_200() -> Result<(), anyhow::Error> {
    let server = TestReviewServer::spawn(MemoryStore::new()).await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

#[tokio::test]
async fn test_ready_endpoint_reports_healthy_store() -> Result<(), anyhow::Error> {
    let server = TestReviewServer::spawn(MemoryStore::new()).await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;
    assert_eq!(response.status(), 200);

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    assert!(
        content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json")),
        "Expected application/json content type, got {:?}",
        content_type
    );

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["database"], "healthy");
    assert!(body.get("error").is_none());

    Ok(())
}

#[tokio::test]
async fn test_ready_endpoint_returns_503_when_store_down() -> Result<(), anyhow::Error> {
    let store = MemoryStore::new();
    store.fail_on("ping");
    let server = TestReviewServer::spawn(store).await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;
    assert_eq!(response.status(), 503);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["database"], "unhealthy");
    // Generic message only, the injected cause stays in the logs.
    assert_eq!(body["error"], "Service dependencies unavailable");

    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_returns_200() -> Result<(), anyhow::Error> {
    let server = TestReviewServer::spawn(MemoryStore::new()).await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;
    assert_eq!(response.status(), 200);

    Ok(())
}
