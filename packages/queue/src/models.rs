use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::background_job;
use crate::error::QueueError;

/// A dispatched job as handed to a worker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub job_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub next_run_at: DateTime<Utc>,
    /// Dispatch count including the dequeue that produced this value.
    pub attempts: i32,
}

impl From<background_job::Model> for Job {
    fn from(model: background_job::Model) -> Self {
        Self {
            id: model.id,
            job_type: model.job_type,
            payload: model.payload,
            created_at: model.created_at,
            next_run_at: model.next_run_at,
            attempts: model.attempts,
        }
    }
}

/// The job queue contract.
///
/// `dequeue` is the only operation with concurrency teeth: it must claim a
/// single dispatchable row atomically so that two workers never hold the same
/// job. Retry scheduling belongs to callers; the queue itself never retries.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Add a job to be dispatched after `delay`. Returns the job id.
    async fn enqueue(
        &self,
        job_type: &str,
        payload: Value,
        delay: Duration,
    ) -> Result<i64, QueueError>;

    /// Claim the next dispatchable job, or `None` if the queue is drained.
    async fn dequeue(&self) -> Result<Option<Job>, QueueError>;

    /// Terminal success write for a claimed job.
    async fn complete(&self, job: &Job) -> Result<(), QueueError>;

    /// Reschedule a claimed job to run again after `delay`.
    async fn retry(&self, job: &Job, delay: Duration) -> Result<(), QueueError>;

    /// Terminal failure write for a claimed job.
    async fn fail(&self, job: &Job, reason: &str) -> Result<(), QueueError>;

    /// Verify the queue transport is reachable.
    async fn health(&self) -> Result<(), QueueError>;
}
