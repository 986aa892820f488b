//! Database connection management.
//!
//! Pool construction with a bounded ping-retry loop (the database may come
//! up after the service in container environments), embedded migrations,
//! and optional seed data for local development.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::path::Path;
use std::time::Duration;

const PING_ATTEMPTS: u32 = 10;
const PING_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Create a connection pool and wait for the database to answer.
///
/// Pings up to 10 times with a 2 second delay; failing all attempts is
/// fatal to startup.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let max_connections = std::env::var("PG_POOL_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(database_url)?;

    let mut last_err = None;
    for attempt in 1..=PING_ATTEMPTS {
        match sqlx::query("SELECT 1").execute(&pool).await {
            Ok(_) => {
                tracing::info!("PostgreSQL connection pool established");
                return Ok(pool);
            }
            Err(e) => {
                tracing::warn!(
                    attempt,
                    error = %e,
                    retry_delay_secs = PING_RETRY_DELAY.as_secs(),
                    "database ping failed, retrying"
                );
                last_err = Some(e);
                tokio::time::sleep(PING_RETRY_DELAY).await;
            }
        }
    }

    Err(last_err.unwrap_or(sqlx::Error::PoolTimedOut))
}

/// Apply embedded migrations from `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("migrations applied");
    Ok(())
}

/// Apply seed data when the seed file exists. Seeds are idempotent and
/// failures are non-fatal: a production deployment simply does not ship the
/// file.
pub async fn apply_seeds(pool: &PgPool, path: &str) {
    if !Path::new(path).exists() {
        return;
    }

    let sql = match std::fs::read_to_string(path) {
        Ok(sql) => sql,
        Err(e) => {
            tracing::warn!(path, error = %e, "could not read seed file, skipping");
            return;
        }
    };

    match sqlx::raw_sql(&sql).execute(pool).await {
        Ok(_) => tracing::info!(path, "seed data applied"),
        Err(e) => tracing::warn!(path, error = %e, "could not apply seed data, skipping"),
    }
}

/// Liveness probe used by the health endpoint.
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
