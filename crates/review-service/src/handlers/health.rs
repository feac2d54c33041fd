//! Health check handlers.
//!
//! - `/health`: Liveness probe, returns OK while the process is running
//! - `/ready`: Readiness probe, checks the database

use crate::models::api::ReadinessResponse;
use crate::repositories::ReviewStore;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
///
/// Does not check dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Returns 200 if the store answers a ping, 503 otherwise. The error message
/// is generic; the cause is logged server-side.
#[tracing::instrument(skip_all, name = "review.health.readiness")]
pub async fn readiness_check<S: ReviewStore>(
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    if let Err(e) = state.store.ping().await {
        tracing::warn!(target: "review.handlers.health", error = %e, "Readiness check failed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                database: "unhealthy",
                error: Some("Service dependencies unavailable".to_string()),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready",
            database: "healthy",
            error: None,
        }),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        assert_eq!(health_check().await, "OK");
    }

    #[test]
    fn test_readiness_response_serialization() {
        let ready = ReadinessResponse {
            status: "ready",
            database: "healthy",
            error: None,
        };
        let json = serde_json::to_string(&ready).unwrap();
        assert!(json.contains("\"status\":\"ready\""));
        assert!(!json.contains("\"error\""));

        let not_ready = ReadinessResponse {
            status: "not_ready",
            database: "unhealthy",
            error: Some("Service dependencies unavailable".to_string()),
        };
        let json = serde_json::to_string(&not_ready).unwrap();
        assert!(json.contains("\"database\":\"unhealthy\""));
        assert!(json.contains("\"error\":\"Service dependencies unavailable\""));
    }
}
