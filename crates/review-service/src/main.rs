//! Review Service
//!
//! Entry point for the pull request reviewer assignment service.

use common::observability::init_tracing;
use common::secret::ExposeSecret;
use review_service::config::Config;
use review_service::observability::metrics::init_metrics_recorder;
use review_service::repositories::PgStore;
use review_service::routes::{self, AppState};
use review_service::services::AssignmentStrategy;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration first: it decides the log format.
    let config = Config::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    init_tracing(&config.observability)?;

    info!("Starting Review Service");
    info!(
        bind_address = %config.bind_address,
        max_connections = config.database.max_connections,
        request_timeout_secs = config.request_timeout.as_secs(),
        seeded = config.assignment_seed.is_some(),
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to install metrics recorder: {}", e);
        e
    })?;

    info!("Connecting to database...");
    let db_url = config.database.url_with_statement_timeout();
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(config.database.acquire_timeout)
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(db_url.expose_secret())
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    info!("Database connection established");

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;
    let drain = config.shutdown_drain;

    let strategy = Arc::new(AssignmentStrategy::from_optional_seed(config.assignment_seed));
    let state = Arc::new(AppState::new(PgStore::new(db_pool), config, strategy));
    let app = routes::build_routes(state, metrics_handle);

    info!("Review Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(drain))
        .await?;

    info!("Review Service shutdown complete");

    Ok(())
}

/// Returns once SIGTERM or SIGINT is received and the drain period is over.
async fn shutdown_signal(drain: Duration) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain.is_zero() {
        info!("Skipping drain period (SHUTDOWN_DRAIN_SECONDS=0)");
    } else {
        warn!("Draining connections for {} seconds...", drain.as_secs());
        tokio::time::sleep(drain).await;
        info!("Drain period complete");
    }
}
