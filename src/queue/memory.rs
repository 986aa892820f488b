//! In-memory queue used by tests and local tooling.
//!
//! Same contract and retry policy as the Redis queue, minus the broker:
//! per-type `VecDeque`s behind a mutex, a dead-letter deque per type, and
//! an in-process processed-id set for consumer dedup.

use super::{Job, JobHandler, JobQueue, JobType, MAX_ATTEMPTS};
use crate::error::AppError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Default)]
struct State {
    queues: HashMap<JobType, VecDeque<Job>>,
    dead_letters: HashMap<JobType, VecDeque<Job>>,
    processed: HashSet<String>,
}

#[derive(Default)]
pub struct InMemoryQueue {
    state: Mutex<State>,
    /// Delay between retry attempts; zero keeps tests fast.
    retry_delay: Duration,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn queued_len(&self, job_type: JobType) -> usize {
        let state = self.state.lock().await;
        state.queues.get(&job_type).map(|q| q.len()).unwrap_or(0)
    }

    pub async fn dead_letter_len(&self, job_type: JobType) -> usize {
        let state = self.state.lock().await;
        state
            .dead_letters
            .get(&job_type)
            .map(|q| q.len())
            .unwrap_or(0)
    }

    /// Push a pre-built job, preserving its id and attempt count.
    pub async fn push_job(&self, job: Job) {
        let mut state = self.state.lock().await;
        state
            .queues
            .entry(job.job_type)
            .or_default()
            .push_back(job);
    }
}

#[async_trait]
impl JobQueue for InMemoryQueue {
    async fn enqueue(
        &self,
        job_type: JobType,
        payload: serde_json::Value,
    ) -> Result<(), AppError> {
        self.push_job(Job::new(job_type, payload)).await;
        Ok(())
    }

    async fn dequeue(
        &self,
        job_type: JobType,
        _timeout: Duration,
    ) -> Result<Option<Job>, AppError> {
        let mut state = self.state.lock().await;

        let Some(job) = state.queues.entry(job_type).or_default().pop_front() else {
            return Ok(None);
        };

        if state.processed.contains(&job.id) {
            tracing::warn!(job_id = %job.id, "duplicate job discarded");
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
            Ok(()) => {
                let mut state = self.state.lock().await;
                state.processed.insert(job.id.clone());
                Ok(())
            }
            Err(err) => {
                job.attempts += 1;

                if job.attempts < MAX_ATTEMPTS {
                    self.push_job(job).await;
                    tokio::time::sleep(self.retry_delay).await;
                    Ok(())
                } else {
                    let job_id = job.id.clone();
                    let mut state = self.state.lock().await;
                    state
                        .dead_letters
                        .entry(job_type)
                        .or_default()
                        .push_back(job);
                    Err(AppError::internal(format!(
                        "job {job_id} failed after {MAX_ATTEMPTS} attempts: {err}"
                    )))
                }
            }
        }
    }

    async fn retry(&self, job: &Job) -> Result<(), AppError> {
        self.enqueue(job.job_type, job.payload.clone()).await
    }
}
