//! HTTP routes for the review service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::errors::ReviewError;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::repositories::ReviewStore;
use crate::services::{
    AssignmentStrategy, DeactivationService, PullRequestService, TeamService, UserService,
};
use axum::{
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState<S> {
    /// Backing store, also used by the readiness probe.
    pub store: S,

    /// Service configuration.
    pub config: Config,

    pub teams: TeamService<S>,
    pub users: UserService<S>,
    pub pull_requests: PullRequestService<S>,
    pub deactivation: DeactivationService<S>,
}

impl<S: ReviewStore> AppState<S> {
    /// Wire every service to `store`. The pull request and deactivation
    /// services share one assignment strategy.
    pub fn new(store: S, config: Config, strategy: Arc<AssignmentStrategy>) -> Self {
        Self {
            teams: TeamService::new(store.clone()),
            users: UserService::new(store.clone()),
            pull_requests: PullRequestService::new(store.clone(), Arc::clone(&strategy)),
            deactivation: DeactivationService::new(store.clone(), strategy),
            store,
            config,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe
/// - `/ready` - Readiness probe (pings the store)
/// - `/metrics` - Prometheus metrics
/// - `/team/*`, `/users/*`, `/pullRequest/*`, `/stats/assignments`
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - Request timeout from `Config::request_timeout`
/// - Panic recovery answering `INTERNAL_ERROR`
pub fn build_routes<S: ReviewStore>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let request_timeout = state.config.request_timeout;

    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check::<S>))
        .route("/team/add", post(handlers::add_team::<S>))
        .route("/team/get", get(handlers::get_team::<S>))
        .route("/users/setIsActive", post(handlers::set_is_active::<S>))
        .route("/users/getReview", get(handlers::get_reviews::<S>))
        .route(
            "/users/deactivateTeamMembers",
            post(handlers::deactivate_team_members::<S>),
        )
        .route(
            "/pullRequest/create",
            post(handlers::create_pull_request::<S>),
        )
        .route("/pullRequest/merge", post(handlers::merge_pull_request::<S>))
        .route(
            "/pullRequest/reassign",
            post(handlers::reassign_reviewer::<S>),
        )
        .route("/stats/assignments", get(handlers::assignment_stats::<S>))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    with_layers(api_routes.merge(metrics_routes), request_timeout)
}

/// Wrap `router` in the shared middleware stack.
///
/// Layer order (bottom-to-top execution):
/// 1. CatchPanicLayer - innermost; a panicking handler becomes a 500
/// 2. TimeoutLayer - a timed-out request drops its transaction
/// 3. TraceLayer - request logging
/// 4. http_metrics_middleware - outermost, sees every response
fn with_layers(router: Router, request_timeout: Duration) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ReviewError::Internal(format!("handler panicked: {}", detail)).into_response()
}
