//! Outbox table access.
//!
//! Rows are written inside the same database transaction as the balance
//! change they describe, and drained by the relay. A row is only marked
//! processed after its payload has been handed to the broker.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

/// Rows that have failed to enqueue this many times are left for operator
/// intervention and never silently dropped.
pub const MAX_RELAY_RETRIES: i32 = 5;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutboxEntry {
    pub id: String,
    pub job_type: String,
    pub payload: Vec<u8>,
    pub processed: bool,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Durably record a job to be enqueued. Must be called inside the caller's
/// open transaction.
pub async fn insert(
    conn: &mut PgConnection,
    job_type: &str,
    payload: &[u8],
) -> Result<(), AppError> {
    sqlx::query("INSERT INTO outbox_tb (job_type, payload) VALUES ($1, $2)")
        .bind(job_type)
        .bind(payload)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Next batch of unprocessed rows, oldest first. `FOR UPDATE SKIP LOCKED`
/// lets parallel relay instances drain without contending.
pub async fn fetch_unprocessed(
    conn: &mut PgConnection,
    limit: i64,
) -> Result<Vec<OutboxEntry>, AppError> {
    let entries = sqlx::query_as::<_, OutboxEntry>(
        r#"
        SELECT id, job_type, payload, processed, retry_count, created_at, processed_at
        FROM outbox_tb
        WHERE processed = FALSE
        ORDER BY created_at ASC
        LIMIT $1
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    Ok(entries)
}

pub async fn mark_processed(conn: &mut PgConnection, entry_id: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE outbox_tb SET processed = TRUE, processed_at = NOW() WHERE id = $1")
        .bind(entry_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn increment_retry(conn: &mut PgConnection, entry_id: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE outbox_tb SET retry_count = retry_count + 1 WHERE id = $1")
        .bind(entry_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
