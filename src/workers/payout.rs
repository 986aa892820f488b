//! Payout worker.
//!
//! Consumes payout jobs, dispatches to the selected provider, records the
//! outcome on the transaction, and enqueues the follow-up webhook job. The
//! status gate on `pending` is the application-side idempotence check,
//! complementing the queue's consumer dedup.

use crate::error::AppError;
use crate::money::{Currency, Money};
use crate::payment::store;
use crate::payment::types::TransactionStatus;
use crate::providers::{BankDestination, PayoutRequest, ProviderRegistry};
use crate::queue::{Job, JobHandler, JobQueue, JobType, PayoutJobPayload, WebhookJobPayload};
use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

const TICK_INTERVAL: Duration = Duration::from_secs(1);
const DEQUEUE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct PayoutWorker {
    pool: PgPool,
    providers: Arc<ProviderRegistry>,
    queue: Arc<dyn JobQueue>,
}

impl PayoutWorker {
    pub fn new(pool: PgPool, providers: Arc<ProviderRegistry>, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            pool,
            providers,
            queue,
        }
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("payout worker started");
        let mut ticker = tokio::time::interval(TICK_INTERVAL);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("payout worker stopping");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self
                        .queue
                        .process(JobType::Payout, self, DEQUEUE_TIMEOUT)
                        .await
                    {
                        tracing::error!(error = %e, job_type = %JobType::Payout, "error processing payout job");
                    }
                }
            }
        }
    }

    async fn fail_transaction(&self, transaction_id: &str, reason: &str) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        store::update_failure(&mut conn, transaction_id, reason).await
    }
}

#[async_trait]
impl JobHandler for PayoutWorker {
    async fn handle(&self, job: &Job) -> Result<(), AppError> {
        let payload: PayoutJobPayload = serde_json::from_value(job.payload.clone())
            .map_err(|e| AppError::internal(format!("unmarshal payout job payload: {e}")))?;

        let mut conn = self.pool.acquire().await?;
        let txn = store::get_by_id(&mut conn, &payload.transaction_id)
            .await?
            .ok_or_else(|| AppError::not_found("transaction not found"))?;
        drop(conn);

        // Already handled (completed, failed, or never confirmed): the job
        // is a duplicate or stale, and succeeds without effect.
        if txn.status != TransactionStatus::Pending {
            tracing::info!(
                trace_id = %payload.trace_id,
                transaction_id = %payload.transaction_id,
                status = %txn.status,
                "transaction not pending, skipping payout"
            );
            return Ok(());
        }

        let currency = Currency::from_str(&payload.currency)
            .map_err(|e| AppError::internal(e.to_string()))?;

        // Provisional reference, generated before the provider call so a
        // crash mid-call still leaves something to correlate on.
        let provisional_ref = format!("payout-{}", Uuid::new_v4());

        let payout_req = PayoutRequest {
            amount: Money::new(payload.amount, currency),
            destination: BankDestination {
                bank_name: None,
                bank_code: payload.bank_code.clone(),
                account_number: payload.account_number.clone(),
                account_name: None,
                currency,
            },
            provider_ref: Some(provisional_ref.clone()),
            transaction_id: payload.transaction_id.clone(),
        };

        let payout_resp = match self.providers.send_payout(&payout_req).await {
            Ok(resp) => resp,
            Err(err) => {
                let reason = format!("provider payout failed: {err}");
                if let Err(fail_err) = self
                    .fail_transaction(&payload.transaction_id, &reason)
                    .await
                {
                    return Err(AppError::internal(format!(
                        "{reason} (also failed to mark transaction failed: {fail_err})"
                    )));
                }
                // Propagate so the queue retries within its budget.
                return Err(err);
            }
        };

        let provider_ref = if payout_resp.provider_ref.is_empty() {
            provisional_ref
        } else {
            payout_resp.provider_ref.clone()
        };

        let mut conn = self.pool.acquire().await?;
        store::update_provider(
            &mut conn,
            &payload.transaction_id,
            Some(&payout_resp.provider_name),
            &provider_ref,
            TransactionStatus::Completed,
        )
        .await?;
        drop(conn);

        tracing::info!(
            trace_id = %payload.trace_id,
            transaction_id = %payload.transaction_id,
            provider = %payout_resp.provider_name,
            provider_reference = %provider_ref,
            "payout completed"
        );

        let snapshot = json!({
            "transaction_id": payload.transaction_id,
            "provider_reference": provider_ref,
            "status": "completed",
            "amount": payload.amount,
            "currency": payload.currency,
        });

        let webhook_payload = WebhookJobPayload {
            provider_name: payout_resp.provider_name,
            event_type: "payout.completed".to_string(),
            provider_reference: provider_ref,
            transaction_id: Some(payload.transaction_id.clone()),
            payload: snapshot,
        };

        let webhook_value = serde_json::to_value(&webhook_payload)
            .map_err(|e| AppError::internal(format!("marshal webhook payload: {e}")))?;

        self.queue.enqueue(JobType::Webhook, webhook_value).await?;

        Ok(())
    }
}
