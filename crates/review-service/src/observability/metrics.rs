//! Metrics definitions for the review service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `review_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP methods
//! - `endpoint`: the fixed route table, anything else is `/other`
//! - `status`: success, error, timeout
//! - `operation`: bounded by repository code
//! - `kind`, `outcome`, `mode`: small fixed sets

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("review_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("review_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("review_bulk_deactivation".to_string()),
            &[0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000],
        )
        .map_err(|e| format!("Failed to set bulk deactivation buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `review_http_requests_total`, `review_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status_code` / `status`
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    let endpoint = normalize_endpoint(path);
    let status = categorize_status_code(status_code);

    histogram!("review_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("review_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto the route table.
///
/// Query strings are not part of `path`. Unknown paths collapse to `/other`.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/team/add" => "/team/add",
        "/team/get" => "/team/get",
        "/users/setIsActive" => "/users/setIsActive",
        "/users/getReview" => "/users/getReview",
        "/users/deactivateTeamMembers" => "/users/deactivateTeamMembers",
        "/pullRequest/create" => "/pullRequest/create",
        "/pullRequest/merge" => "/pullRequest/merge",
        "/pullRequest/reassign" => "/pullRequest/reassign",
        "/stats/assignments" => "/stats/assignments",
        _ => "/other",
    }
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record database query execution
///
/// Metric: `review_db_query_duration_seconds`, `review_db_queries_total`
/// Labels: `operation`, `status`
pub fn record_db_query(operation: &'static str, status: &'static str, duration: Duration) {
    histogram!("review_db_query_duration_seconds",
        "operation" => operation
    )
    .record(duration.as_secs_f64());

    counter!("review_db_queries_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
}

// ============================================================================
// Assignment Metrics
// ============================================================================

/// Record one reviewer selection.
///
/// Metric: `review_reviewer_selections_total`
/// Labels: `kind` (initial, replacement), `outcome` (selected, empty, no_candidate)
pub fn record_reviewer_selection(kind: &'static str, outcome: &'static str) {
    counter!("review_reviewer_selections_total",
        "kind" => kind,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record reviewer reassignments committed or rolled back.
///
/// Metric: `review_reassignments_total`
/// Labels: `mode` (single, bulk), `status` (success, error)
pub fn record_reassignments(mode: &'static str, status: &'static str, count: u64) {
    counter!("review_reassignments_total",
        "mode" => mode,
        "status" => status
    )
    .increment(count);
}

/// Record a bulk deactivation call.
///
/// Metric: `review_bulk_deactivation_duration_seconds`, `review_deactivated_users_total`
/// Labels: `status`
pub fn record_bulk_deactivation(status: &'static str, deactivated: usize, duration: Duration) {
    histogram!("review_bulk_deactivation_duration_seconds",
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("review_deactivated_users_total").increment(deactivated as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    // These run against the no-op global recorder; they cover the label
    // construction paths only.

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 200, Duration::from_millis(5));
        record_http_request("POST", "/pullRequest/reassign", 409, Duration::from_millis(20));
        record_http_request("GET", "/unknown", 404, Duration::from_millis(1));
    }

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(201), "success");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
        assert_eq!(categorize_status_code(409), "error");
        assert_eq!(categorize_status_code(500), "error");
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("/team/add"), "/team/add");
        assert_eq!(
            normalize_endpoint("/users/deactivateTeamMembers"),
            "/users/deactivateTeamMembers"
        );
        assert_eq!(normalize_endpoint("/pullRequest/abc"), "/other");
        assert_eq!(normalize_endpoint("/"), "/other");
    }

    #[test]
    fn test_record_domain_metrics() {
        record_db_query("get_team", "success", Duration::from_millis(2));
        record_reviewer_selection("replacement", "no_candidate");
        record_reassignments("bulk", "success", 3);
        record_bulk_deactivation("error", 0, Duration::from_millis(40));
    }
}
