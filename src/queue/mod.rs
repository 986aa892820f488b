//! Job queue contract and envelope types.
//!
//! The broker gives at-least-once delivery; the consumer-side
//! `processed_jobs_tb` dedup marker turns that into at-most-once effect.
//! Handler failures are retried up to [`MAX_ATTEMPTS`] times before the job
//! is parked on the queue's dead-letter list.

pub mod memory;
pub mod redis;

use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use self::memory::InMemoryQueue;
pub use self::redis::RedisQueue;

pub const MAX_ATTEMPTS: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(5);
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);
pub const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);
/// How long a processed-job marker is kept before it may be pruned.
pub const PROCESSED_JOB_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Payout,
    Webhook,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Payout => "payout",
            JobType::Webhook => "webhook",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payout" => Ok(JobType::Payout),
            "webhook" => Ok(JobType::Webhook),
            other => Err(format!("unknown job type: {other}")),
        }
    }
}

/// Envelope published to the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub payload: serde_json::Value,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(job_type: JobType, payload: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            job_type,
            payload,
            attempts: 0,
            created_at: Utc::now(),
        }
    }
}

/// Instruction to dispatch a payout, carried through the outbox and the
/// payout queue. `trace_id` ties worker logs back to the originating
/// request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutJobPayload {
    pub transaction_id: String,
    pub trace_id: String,
    pub amount: i64,
    pub currency: String,
    pub account_number: String,
    pub bank_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookJobPayload {
    pub provider_name: String,
    pub event_type: String,
    pub provider_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<(), AppError>;
}

/// Queue contract. `enqueue`/`dequeue` move envelopes; `process` is the
/// single-shot dequeue-then-handle loop body used by workers, owning the
/// retry/dead-letter policy; `retry` republishes a fresh copy of a job's
/// payload.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job_type: JobType, payload: serde_json::Value)
        -> Result<(), AppError>;

    /// Block up to `timeout` for one job. Jobs whose id already has a
    /// processed marker are discarded and `None` is returned.
    async fn dequeue(
        &self,
        job_type: JobType,
        timeout: Duration,
    ) -> Result<Option<Job>, AppError>;

    async fn process(
        &self,
        job_type: JobType,
        handler: &dyn JobHandler,
        timeout: Duration,
    ) -> Result<(), AppError>;

    async fn retry(&self, job: &Job) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn job_type_roundtrip() {
        assert_eq!("payout".parse::<JobType>().unwrap(), JobType::Payout);
        assert_eq!("webhook".parse::<JobType>().unwrap(), JobType::Webhook);
        assert!("mystery".parse::<JobType>().is_err());
    }

    #[test]
    fn job_envelope_serde_roundtrip() {
        let job = Job::new(JobType::Payout, json!({"transaction_id": "txn_1"}));
        let encoded = serde_json::to_string(&job).unwrap();
        assert!(encoded.contains("\"type\":\"payout\""));

        let decoded: Job = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.id, job.id);
        assert_eq!(decoded.job_type, JobType::Payout);
        assert_eq!(decoded.attempts, 0);
        assert_eq!(decoded.payload["transaction_id"], "txn_1");
    }

    #[test]
    fn payout_payload_roundtrip() {
        let payload = PayoutJobPayload {
            transaction_id: "txn_1".into(),
            trace_id: "trace_1".into(),
            amount: 1000,
            currency: "EUR".into(),
            account_number: "0001112223".into(),
            bank_code: "044".into(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        let back: PayoutJobPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back.transaction_id, "txn_1");
        assert_eq!(back.amount, 1000);
    }

    #[test]
    fn webhook_payload_omits_absent_transaction_id() {
        let payload = WebhookJobPayload {
            provider_name: "CurrencyCloud".into(),
            event_type: "payout.completed".into(),
            provider_reference: "CC-1".into(),
            transaction_id: None,
            payload: json!({}),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("transaction_id").is_none());
    }
}
