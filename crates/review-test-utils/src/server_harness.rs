//! Test server harness for HTTP tests
//!
//! Provides `TestReviewServer` for spawning real review service instances.

use metrics_exporter_prometheus::PrometheusBuilder;
use review_service::config::Config;
use review_service::repositories::{PgStore, ReviewStore};
use review_service::routes::{self, AppState};
use review_service::services::AssignmentStrategy;
use sqlx::PgPool;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Seed used for reviewer selection in spawned servers.
pub const TEST_ASSIGNMENT_SEED: u64 = 42;

/// Test harness for spawning the review service.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> Result<(), anyhow::Error> {
///     let server = TestReviewServer::spawn(MemoryStore::new()).await?;
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestReviewServer<S> {
    addr: SocketAddr,
    store: S,
    config: Config,
    _handle: JoinHandle<()>,
}

impl<S: ReviewStore> TestReviewServer<S> {
    /// Spawn a server over `store`.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Use a fixed assignment seed
    /// - Use a metrics handle that is not installed as the global recorder,
    ///   so several servers can run in one test binary
    pub async fn spawn(store: S) -> Result<Self, anyhow::Error> {
        let vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://test/test".to_string(),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            (
                "ASSIGNMENT_SEED".to_string(),
                TEST_ASSIGNMENT_SEED.to_string(),
            ),
            ("SHUTDOWN_DRAIN_SECONDS".to_string(), "0".to_string()),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let strategy = Arc::new(AssignmentStrategy::from_optional_seed(
            config.assignment_seed,
        ));
        let state = Arc::new(AppState::new(store.clone(), config.clone(), strategy));

        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            store,
            config,
            _handle: handle,
        })
    }

    /// Get reference to the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl TestReviewServer<PgStore> {
    /// Spawn a server backed by PostgreSQL (typically a `#[sqlx::test]` pool).
    pub async fn spawn_postgres(pool: PgPool) -> Result<Self, anyhow::Error> {
        Self::spawn(PgStore::new(pool)).await
    }
}

impl<S> Drop for TestReviewServer<S> {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
