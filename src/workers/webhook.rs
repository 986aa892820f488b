//! Webhook worker.
//!
//! Drains the webhook queue and persists each event. Semantic
//! reconciliation against transactions is a follow-on concern; this worker
//! only guarantees the event is durably recorded.

use crate::error::AppError;
use crate::queue::{Job, JobHandler, JobQueue, JobType, WebhookJobPayload};
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const TICK_INTERVAL: Duration = Duration::from_secs(1);
const DEQUEUE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct WebhookWorker {
    pool: PgPool,
    queue: Arc<dyn JobQueue>,
}

impl WebhookWorker {
    pub fn new(pool: PgPool, queue: Arc<dyn JobQueue>) -> Self {
        Self { pool, queue }
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("webhook worker started");
        let mut ticker = tokio::time::interval(TICK_INTERVAL);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("webhook worker stopping");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self
                        .queue
                        .process(JobType::Webhook, self, DEQUEUE_TIMEOUT)
                        .await
                    {
                        tracing::error!(error = %e, job_type = %JobType::Webhook, "error processing webhook job");
                    }
                }
            }
        }
    }
}

#[async_trait]
impl JobHandler for WebhookWorker {
    async fn handle(&self, job: &Job) -> Result<(), AppError> {
        let payload: WebhookJobPayload = serde_json::from_value(job.payload.clone())
            .map_err(|e| AppError::internal(format!("unmarshal webhook job payload: {e}")))?;

        let body = serde_json::to_vec(&payload.payload)
            .map_err(|e| AppError::internal(format!("marshal webhook body: {e}")))?;

        let mut conn = self.pool.acquire().await?;
        insert_webhook_event(
            &mut conn,
            &payload.provider_name,
            &payload.event_type,
            &payload.provider_reference,
            payload.transaction_id.as_deref(),
            &body,
        )
        .await?;

        tracing::info!(
            provider = %payload.provider_name,
            event_type = %payload.event_type,
            provider_reference = %payload.provider_reference,
            "webhook event recorded"
        );

        Ok(())
    }
}

pub async fn insert_webhook_event(
    conn: &mut PgConnection,
    provider_name: &str,
    event_type: &str,
    provider_reference: &str,
    transaction_id: Option<&str>,
    payload: &[u8],
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO webhook_events_tb
            (provider_name, event_type, provider_reference, transaction_id, payload, processed)
        VALUES ($1, $2, $3, $4, $5, TRUE)
        "#,
    )
    .bind(provider_name)
    .bind(event_type)
    .bind(provider_reference)
    .bind(transaction_id)
    .bind(payload)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
