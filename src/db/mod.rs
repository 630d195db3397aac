//! The relational store: connection pool, schema bootstrap, and the error
//! classes the transfer engine cares about

pub mod schema;

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// How long a transfer may wait for a pooled connection before the
/// request is better off failing
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the PostgreSQL store. Cheap to share: the pool itself is
/// reference-counted.
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open a pool against the configured store.
    ///
    /// `max_connections` bounds concurrent transfers holding row locks;
    /// it comes from `AppConfig`, not from ambient environment state.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await?;

        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trip a trivial query; used by /healthz
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Unique-constraint violation (SQLSTATE 23505)
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

/// Deadlock or serialization failure (SQLSTATE 40P01 / 40001).
/// These are the retryable lock-contention class of the transfer engine.
pub fn is_lock_contention(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db)
            if matches!(db.code().as_deref(), Some("40P01") | Some("40001"))
    )
}
