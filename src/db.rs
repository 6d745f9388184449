use sqlx::postgres::{PgPoolOptions, Postgres};
use sqlx::pool::PoolConnection;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::errors::DbError;

/// Floor for idle connections kept warm in the pool.
const MIN_IDLE_CONNECTIONS: u32 = 2;

/// Owns the pooled database connections.
///
/// Sized and timed from [`DatabaseConfig`]; hands out connections for the
/// duration of a statement and reclaims them when the guard drops. Cheap
/// to clone — clones share the same underlying pool.
#[derive(Clone)]
pub struct ConnectionManager {
    pool: PgPool,
    config: DatabaseConfig,
}

impl ConnectionManager {
    /// Builds the pool and probes it with a liveness query.
    ///
    /// Fails with `CONNECTION_FAILED` if the pool cannot be built or the
    /// probe does not succeed.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size())
            .min_connections(MIN_IDLE_CONNECTIONS.min(config.pool_size()))
            .acquire_timeout(Duration::from_millis(config.connection_timeout_ms()))
            .idle_timeout(Duration::from_millis(config.idle_timeout_ms()))
            .connect(&config.url())
            .await
            .map_err(|e| DbError::connection("failed to create connection pool", e))?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| DbError::connection("failed to validate database connection", e))?;

        tracing::info!(
            "Database connection pool initialized (max {} connections)",
            config.pool_size()
        );

        Ok(Self {
            pool,
            config: config.clone(),
        })
    }

    /// Checks out one pooled connection.
    ///
    /// The returned guard gives the connection back on drop, on every exit
    /// path. Dead connections are replaced inside the pool; callers never
    /// observe a closed one.
    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>, DbError> {
        self.pool
            .acquire()
            .await
            .map_err(|e| DbError::connection("failed to get database connection", e))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Shuts the pool down. Safe to call more than once.
    pub async fn close(&self) {
        if !self.pool.is_closed() {
            tracing::info!("Shutting down database connection pool");
            self.pool.close().await;
        }
    }
}
