use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::attributes::AttributeCatalog;
use common::backoff::BackoffSchedule;
use common::{LeadStatus, PROCESS_LEAD, ProcessLeadJob};
use queue::{Job, JobQueue};
use sea_orm::{DatabaseConnection, TransactionTrait};
use store::attempts::AttemptOutcome;
use store::entity::lead;
use store::{AttemptStore, LeadStore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::client::CustomerClient;
use crate::config::WorkerAppConfig;
use crate::error::ProcessorError;
use crate::services::{Mapper, Normalizer, Validator};

/// What should happen to the claimed job after a pipeline run.
enum JobDisposition {
    Complete,
    /// Put the job back on the queue to run after the delay (used when
    /// cancellation interrupts a backoff sleep).
    Reschedule(Duration),
}

/// Dequeues `process_lead` jobs and drives each lead through
/// validate -> normalize -> map -> deliver, recording every state change.
pub struct Processor {
    db: DatabaseConnection,
    queue: Arc<dyn JobQueue>,
    validator: Validator,
    normalizer: Normalizer,
    mapper: Mapper,
    client: CustomerClient,
    poll_interval: Duration,
    concurrency: usize,
    max_attempts: u32,
    backoff: BackoffSchedule,
}

impl Processor {
    pub fn new(
        db: DatabaseConnection,
        queue: Arc<dyn JobQueue>,
        config: &WorkerAppConfig,
    ) -> anyhow::Result<Self> {
        let catalog = if std::path::Path::new(&config.attributes.path).exists() {
            AttributeCatalog::load(&config.attributes.path)?
        } else {
            warn!(
                path = %config.attributes.path,
                "Attribute catalog not found, all attributes pass through"
            );
            AttributeCatalog::default()
        };

        Ok(Self {
            db,
            queue,
            validator: Validator::new(&config.validation)?,
            normalizer: Normalizer::new(&config.normalization),
            mapper: Mapper::new(catalog, config.customer_api.product_name.clone()),
            client: CustomerClient::new(&config.customer_api)
                .map_err(|e| anyhow::anyhow!(e.to_string()))?,
            poll_interval: Duration::from_millis(config.worker.poll_interval_ms),
            concurrency: config.worker.concurrency.max(1),
            max_attempts: config.retry.max_attempts,
            backoff: BackoffSchedule::new(
                Duration::from_secs(config.retry.backoff_base_secs),
                config.retry.max_attempts,
            ),
        })
    }

    /// Spawn the worker pool and run until every loop has observed
    /// cancellation. In-flight jobs finish their current transaction first.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut handles = Vec::with_capacity(self.concurrency);
        for worker_id in 0..self.concurrency {
            let processor = Arc::clone(&self);
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                processor.poll_loop(worker_id, cancel).await;
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Dequeue and run at most one job, reporting whether one was found.
    /// This is the poll loop's body, exposed for out-of-band tooling and
    /// integration tests that drive the pipeline without the loop.
    pub async fn process_next(&self, cancel: &CancellationToken) -> Result<bool, ProcessorError> {
        match self.queue.dequeue().await? {
            Some(job) => {
                self.dispatch(job, cancel).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn poll_loop(&self, worker_id: usize, cancel: CancellationToken) {
        info!(worker_id, "Worker started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            match self.queue.dequeue().await {
                Ok(Some(job)) => self.dispatch(job, &cancel).await,
                Ok(None) => {}
                Err(e) => {
                    error!(worker_id, error = %e, "Failed to dequeue job");
                }
            }
        }

        info!(worker_id, "Worker stopped");
    }

    async fn dispatch(&self, job: Job, cancel: &CancellationToken) {
        let job_id = job.id;
        info!(job_id, job_type = %job.job_type, "Processing job");

        let result = match job.job_type.as_str() {
            PROCESS_LEAD => self.process_lead(&job, cancel).await,
            other => Err(ProcessorError::UnknownJobType(other.to_string())),
        };

        match result {
            Ok(JobDisposition::Complete) => {
                if let Err(e) = self.queue.complete(&job).await {
                    error!(job_id, error = %e, "Failed to mark job completed");
                } else {
                    info!(job_id, "Job completed");
                }
            }
            Ok(JobDisposition::Reschedule(delay)) => {
                if let Err(e) = self.queue.retry(&job, delay).await {
                    error!(job_id, error = %e, "Failed to reschedule job");
                } else {
                    info!(job_id, delay_secs = delay.as_secs(), "Job rescheduled");
                }
            }
            Err(e) => {
                error!(job_id, error = %e, "Job failed");
                if let Err(fail_err) = self.queue.fail(&job, &e.to_string()).await {
                    error!(job_id, error = %fail_err, "Failed to mark job failed");
                }
            }
        }
    }

    #[instrument(skip(self, job, cancel), fields(job_id = job.id))]
    async fn process_lead(
        &self,
        job: &Job,
        cancel: &CancellationToken,
    ) -> Result<JobDisposition, ProcessorError> {
        let payload =
            ProcessLeadJob::from_payload(&job.payload).ok_or(ProcessorError::InvalidJobPayload)?;
        let lead_id = payload.lead_id;

        let lead = LeadStore::new(&self.db)
            .find_by_id(lead_id)
            .await?
            .ok_or(ProcessorError::LeadNotFound(lead_id))?;

        info!(lead_id, status = %lead.status, "Loaded lead");

        let lead = match lead.status {
            // Fresh lead: run the full pipeline.
            LeadStatus::Received => match self.screen_and_transform(lead).await? {
                Some(ready) => ready,
                None => return Ok(JobDisposition::Complete),
            },
            // Re-enqueued retry: payloads are already persisted, go straight
            // to delivery.
            LeadStatus::Ready | LeadStatus::Failed => lead,
            terminal => {
                info!(lead_id, status = %terminal, "Lead already terminal, nothing to do");
                return Ok(JobDisposition::Complete);
            }
        };

        self.deliver(&lead, cancel).await
    }

    /// Validation and transformation stages. Returns the READY lead, or
    /// `None` when the lead reached a terminal status and the job is done.
    async fn screen_and_transform(
        &self,
        lead: lead::Model,
    ) -> Result<Option<lead::Model>, ProcessorError> {
        let lead_id = lead.id;

        if let Err(rejection) = self.validator.validate(&lead.raw_payload) {
            info!(
                lead_id,
                code = %rejection.code,
                detail = %rejection.detail,
                "Lead rejected"
            );
            let txn = self.db.begin().await?;
            LeadStore::new(&txn)
                .mark_rejected(lead_id, &rejection.code)
                .await?;
            txn.commit().await?;
            return Ok(None);
        }

        let normalized = self.normalizer.normalize(&lead.raw_payload);

        match self.mapper.map(&normalized) {
            Ok(mapping) => {
                if !mapping.omitted.is_empty() {
                    info!(
                        lead_id,
                        omitted = ?mapping.omitted,
                        "Omitted invalid optional attributes"
                    );
                }
                let txn = self.db.begin().await?;
                let ready = LeadStore::new(&txn)
                    .mark_ready_with_payloads(lead_id, normalized, mapping.customer_payload)
                    .await?;
                txn.commit().await?;
                info!(lead_id, "Lead transformed and marked READY");
                Ok(Some(ready))
            }
            Err(e) => {
                warn!(lead_id, error = %e, "Mapping failed");
                let txn = self.db.begin().await?;
                LeadStore::new(&txn)
                    .set_status(lead_id, LeadStatus::PermanentlyFailed)
                    .await?;
                txn.commit().await?;
                Ok(None)
            }
        }
    }

    /// Delivery stage.
    ///
    /// The downstream is assumed idempotent on the mapped payload: if the
    /// status-and-attempt transaction fails after a 2xx, the lead stays
    /// READY and a later job will call the downstream again.
    async fn deliver(
        &self,
        lead: &lead::Model,
        cancel: &CancellationToken,
    ) -> Result<JobDisposition, ProcessorError> {
        let lead_id = lead.id;

        let n = AttemptStore::new(&self.db).count_for_lead(lead_id).await? as u32;

        if n >= self.max_attempts {
            info!(
                lead_id,
                attempts = n,
                max_attempts = self.max_attempts,
                "Delivery attempts exhausted"
            );
            let txn = self.db.begin().await?;
            LeadStore::new(&txn)
                .set_status(lead_id, LeadStatus::PermanentlyFailed)
                .await?;
            txn.commit().await?;
            return Ok(JobDisposition::Complete);
        }

        if n > 0
            && let Some(delay) = self.backoff.delay(n as usize - 1)
            && !delay.is_zero()
        {
            info!(
                lead_id,
                attempt_no = n + 1,
                delay_secs = delay.as_secs(),
                "Applying backoff before retry"
            );
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(lead_id, "Cancelled during backoff, rescheduling job");
                    return Ok(JobDisposition::Reschedule(delay));
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let customer_payload = lead
            .customer_payload
            .clone()
            .ok_or(ProcessorError::MissingCustomerPayload(lead_id))?;

        info!(
            lead_id,
            attempt_no = n + 1,
            max_attempts = self.max_attempts,
            "Attempting delivery"
        );

        let requested_at = Utc::now();
        let result = self.client.send(&customer_payload).await;

        let (outcome, new_status) = match &result {
            Ok(delivery) => (
                AttemptOutcome::success(requested_at, delivery.status, delivery.body.clone()),
                LeadStatus::Delivered,
            ),
            Err(err) => {
                info!(
                    lead_id,
                    attempt_no = n + 1,
                    status = ?err.status,
                    retriable = err.retriable,
                    error = %err.message,
                    "Delivery attempt failed"
                );
                let status = if !err.retriable || n + 1 >= self.max_attempts {
                    LeadStatus::PermanentlyFailed
                } else {
                    LeadStatus::Failed
                };
                (
                    AttemptOutcome::failure(requested_at, err.status, err.to_string()),
                    status,
                )
            }
        };

        // The HTTP call is done; only now open the transaction, so the
        // request timeout never sits inside the lock footprint. Status
        // transition and attempt record commit or abort together; taking
        // the lead lock first serialises attempt numbering, and a racing
        // job that finds the lead already terminal aborts here.
        let txn = self.db.begin().await?;
        LeadStore::new(&txn).set_status(lead_id, new_status).await?;
        let attempt = AttemptStore::new(&txn).record_next(lead_id, outcome).await?;
        txn.commit().await?;

        match new_status {
            LeadStatus::Delivered => {
                info!(lead_id, attempt_no = attempt.attempt_no, "Lead delivered");
            }
            LeadStatus::PermanentlyFailed => {
                warn!(
                    lead_id,
                    attempt_no = attempt.attempt_no,
                    "Lead permanently failed"
                );
            }
            LeadStatus::Failed => {
                let delay = self.backoff.delay(n as usize).unwrap_or_default();
                let job_id = self
                    .queue
                    .enqueue(
                        PROCESS_LEAD,
                        ProcessLeadJob::new(lead_id).to_payload(),
                        delay,
                    )
                    .await?;
                info!(
                    lead_id,
                    job_id,
                    delay_secs = delay.as_secs(),
                    "Retry scheduled"
                );
            }
            _ => {}
        }

        Ok(JobDisposition::Complete)
    }
}
