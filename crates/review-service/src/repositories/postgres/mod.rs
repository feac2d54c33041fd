//! PostgreSQL store.
//!
//! All queries are runtime `sqlx::query` calls with bound parameters and run
//! on the connection owned by the caller's transaction. Roster and pull
//! request reads that feed a mutation have `lock_*` variants that take
//! `FOR UPDATE` row locks, so a concurrent writer waits for the unit of work
//! to finish instead of racing it.

mod pull_requests;
mod teams;
mod users;

use super::Transactor;
use crate::errors::ReviewError;
use crate::observability::metrics;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

/// Transaction handle for [`PgStore`].
pub type PgTx = Transaction<'static, Postgres>;

/// Store backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Record query metrics and pass the result through.
fn observe<T>(
    operation: &'static str,
    start: Instant,
    result: Result<T, sqlx::Error>,
) -> Result<T, sqlx::Error> {
    let status = if result.is_ok() { "success" } else { "error" };
    metrics::record_db_query(operation, status, start.elapsed());
    result
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

#[async_trait]
impl Transactor for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, ReviewError> {
        let start = Instant::now();
        let tx = observe("begin", start, self.pool.begin().await)
            .map_err(|e| ReviewError::Database(format!("Failed to begin transaction: {}", e)))?;
        Ok(tx)
    }

    async fn commit(&self, tx: PgTx) -> Result<(), ReviewError> {
        let start = Instant::now();
        observe("commit", start, tx.commit().await)
            .map_err(|e| ReviewError::Database(format!("Failed to commit transaction: {}", e)))
    }

    async fn rollback(&self, tx: PgTx) -> Result<(), ReviewError> {
        let start = Instant::now();
        observe("rollback", start, tx.rollback().await)
            .map_err(|e| ReviewError::Database(format!("Failed to roll back transaction: {}", e)))
    }

    async fn ping(&self) -> Result<(), ReviewError> {
        let start = Instant::now();
        observe(
            "ping",
            start,
            sqlx::query("SELECT 1").execute(&self.pool).await,
        )
        .map(|_| ())
        .map_err(|e| ReviewError::Database(format!("Database ping failed: {}", e)))
    }
}
