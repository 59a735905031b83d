//! PostgreSQL pool for the ranking ledger

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::DatabaseConfig;
use crate::error::{RankingError, Result};

/// Build the pool and verify it with `SELECT 1` under the connect timeout
pub async fn create_pool(config: &DatabaseConfig, service_name: &str) -> Result<PgPool> {
    let url = config
        .url
        .as_deref()
        .ok_or_else(|| RankingError::Config("DATABASE_URL environment variable not set".to_string()))?;

    debug!(
        service = %service_name,
        max = config.max_connections,
        min = config.min_connections,
        acquire_timeout_secs = config.acquire_timeout_secs,
        "Creating database pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(true)
        .connect(url)
        .await?;

    match tokio::time::timeout(
        Duration::from_secs(config.connect_timeout_secs),
        sqlx::query("SELECT 1").execute(&pool),
    )
    .await
    {
        Ok(Ok(_)) => {
            info!(service = %service_name, "Database pool created and verified");
            Ok(pool)
        }
        Ok(Err(e)) => {
            error!(service = %service_name, error = %e, "Database connection verification failed");
            Err(e.into())
        }
        Err(_) => {
            error!(
                service = %service_name,
                timeout_secs = config.connect_timeout_secs,
                "Database connection verification timeout"
            );
            Err(RankingError::Database(sqlx::Error::PoolTimedOut))
        }
    }
}
