//! Redis-backed job queue.
//!
//! Transport is a Redis list per queue (`queue:{type}`) with `LPUSH` to
//! publish and `BRPOP` to consume, plus a `queue:{type}:dlq` list per queue
//! for jobs that exhaust their retry budget. The connection manager
//! reconnects with capped exponential backoff; consumer dedup runs against
//! the `processed_jobs_tb` table so a redelivered job id is applied at most
//! once.

use super::{
    Job, JobHandler, JobQueue, JobType, MAX_ATTEMPTS, MAX_RECONNECT_DELAY, PROCESSED_JOB_TTL,
    RECONNECT_DELAY, RETRY_DELAY,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use sqlx::PgPool;
use std::time::Duration;

pub struct RedisQueue {
    conn: ConnectionManager,
    pool: PgPool,
}

impl RedisQueue {
    pub async fn new(redis_url: &str, pool: PgPool) -> Result<Self, AppError> {
        let client = redis::Client::open(redis_url)?;

        let config = ConnectionManagerConfig::new()
            .set_factor(RECONNECT_DELAY.as_millis() as u64)
            .set_exponent_base(2)
            .set_max_delay(MAX_RECONNECT_DELAY.as_millis() as u64);

        let conn = ConnectionManager::new_with_config(client, config).await?;
        tracing::info!("connected to redis");

        Ok(Self { conn, pool })
    }

    fn queue_key(job_type: JobType) -> String {
        format!("queue:{job_type}")
    }

    fn dlq_key(job_type: JobType) -> String {
        format!("queue:{job_type}:dlq")
    }

    async fn push(&self, key: &str, job: &Job) -> Result<(), AppError> {
        let body = serde_json::to_string(job)
            .map_err(|e| AppError::internal(format!("marshal job: {e}")))?;

        let mut conn = self.conn.clone();
        let _: i64 = conn.lpush(key, body).await?;
        Ok(())
    }

    async fn is_job_processed(&self, job_id: &str) -> Result<bool, AppError> {
        let processed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM processed_jobs_tb \
             WHERE job_id = $1 AND expires_at > NOW())",
        )
        .bind(job_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(processed)
    }

    /// The authoritative "done" marker. Kept for 24 hours so redeliveries
    /// within the broker's retention window are recognized.
    async fn mark_job_processed(&self, job_id: &str) -> Result<(), AppError> {
        let expires_at = Utc::now()
            + chrono::Duration::from_std(PROCESSED_JOB_TTL)
                .unwrap_or_else(|_| chrono::Duration::hours(24));

        sqlx::query(
            "INSERT INTO processed_jobs_tb (job_id, expires_at) VALUES ($1, $2) \
             ON CONFLICT (job_id) DO NOTHING",
        )
        .bind(job_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn enqueue(
        &self,
        job_type: JobType,
        payload: serde_json::Value,
    ) -> Result<(), AppError> {
        let job = Job::new(job_type, payload);
        self.push(&Self::queue_key(job_type), &job).await?;

        tracing::info!(job_id = %job.id, job_type = %job_type, "job enqueued");
        Ok(())
    }

    async fn dequeue(
        &self,
        job_type: JobType,
        timeout: Duration,
    ) -> Result<Option<Job>, AppError> {
        let key = Self::queue_key(job_type);

        let mut conn = self.conn.clone();
        let popped: Option<(String, String)> = conn.brpop(&key, timeout.as_secs_f64()).await?;

        let Some((_, body)) = popped else {
            return Ok(None);
        };

        let job: Job = serde_json::from_str(&body)
            .map_err(|e| AppError::internal(format!("unmarshal job: {e}")))?;

        if self.is_job_processed(&job.id).await? {
            tracing::warn!(job_id = %job.id, job_type = %job_type, "duplicate job discarded");
            return Ok(None);
        }

        Ok(Some(job))
    }

    async fn process(
        &self,
        job_type: JobType,
        handler: &dyn JobHandler,
        timeout: Duration,
    ) -> Result<(), AppError> {
        let Some(mut job) = self.dequeue(job_type, timeout).await? else {
            return Ok(());
        };

        match handler.handle(&job).await {
            Ok(()) => self.mark_job_processed(&job.id).await,
            Err(err) => {
                job.attempts += 1;

                if job.attempts < MAX_ATTEMPTS {
                    tracing::warn!(
                        job_id = %job.id,
                        job_type = %job_type,
                        attempts = job.attempts,
                        error = %err,
                        "job failed, requeueing"
                    );
                    self.push(&Self::queue_key(job_type), &job).await?;
                    tokio::time::sleep(RETRY_DELAY).await;
                    Ok(())
                } else {
                    tracing::error!(
                        job_id = %job.id,
                        job_type = %job_type,
                        attempts = job.attempts,
                        error = %err,
                        "job exhausted retries, dead-lettering"
                    );
                    self.push(&Self::dlq_key(job_type), &job).await?;
                    Err(AppError::internal(format!(
                        "job failed after {MAX_ATTEMPTS} attempts: {err}"
                    )))
                }
            }
        }
    }

    async fn retry(&self, job: &Job) -> Result<(), AppError> {
        self.enqueue(job.job_type, job.payload.clone()).await
    }
}
