//! Outbox relay.
//!
//! Long-running loop that drains committed outbox rows into the job queue.
//! Selection and marking happen in one database transaction with the broker
//! publish in between: a crash after publish but before commit re-publishes
//! on restart, which the consumer-side dedup absorbs.

use super::store::{self, MAX_RELAY_RETRIES};
use crate::error::AppError;
use crate::queue::{JobQueue, JobType};
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const BATCH_SIZE: i64 = 10;

pub struct OutboxRelay {
    pool: PgPool,
    queue: Arc<dyn JobQueue>,
}

impl OutboxRelay {
    pub fn new(pool: PgPool, queue: Arc<dyn JobQueue>) -> Self {
        Self { pool, queue }
    }

    /// Run until shutdown is signalled. Errors inside a batch are logged and
    /// the loop keeps ticking; individual rows carry their own retry budget.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("outbox relay started");
        let mut ticker = tokio::time::interval(POLL_INTERVAL);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("outbox relay stopping");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.process_batch().await {
                        tracing::error!(error = %e, "error processing outbox batch");
                    }
                }
            }
        }
    }

    /// Drain one batch. Public so tests can step the relay deterministically.
    pub async fn process_batch(&self) -> Result<usize, AppError> {
        let mut tx = self.pool.begin().await?;

        let entries = store::fetch_unprocessed(&mut tx, BATCH_SIZE).await?;
        if entries.is_empty() {
            return Ok(0);
        }

        tracing::info!(batch_size = entries.len(), "processing outbox batch");

        let mut enqueued = Vec::new();
        for entry in &entries {
            if entry.retry_count >= MAX_RELAY_RETRIES {
                tracing::warn!(
                    outbox_id = %entry.id,
                    job_type = %entry.job_type,
                    retry_count = entry.retry_count,
                    "outbox entry exceeded max retries, skipping"
                );
                continue;
            }

            match self.relay_entry(entry).await {
                Ok(()) => enqueued.push(entry.id.clone()),
                Err(e) => {
                    tracing::error!(
                        outbox_id = %entry.id,
                        job_type = %entry.job_type,
                        retry_count = entry.retry_count,
                        error = %e,
                        "error relaying outbox entry"
                    );
                    store::increment_retry(&mut tx, &entry.id).await?;
                }
            }
        }

        for entry_id in &enqueued {
            store::mark_processed(&mut tx, entry_id).await?;
            tracing::info!(outbox_id = %entry_id, "outbox entry processed");
        }

        tx.commit().await?;
        Ok(enqueued.len())
    }

    async fn relay_entry(&self, entry: &store::OutboxEntry) -> Result<(), AppError> {
        let job_type = JobType::from_str(&entry.job_type).map_err(AppError::Internal)?;

        let payload: serde_json::Value = serde_json::from_slice(&entry.payload)
            .map_err(|e| AppError::internal(format!("unmarshal outbox payload: {e}")))?;

        self.queue.enqueue(job_type, payload).await
    }
}
