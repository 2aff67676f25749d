use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{LeadStatus, PROCESS_LEAD, ProcessLeadJob};
use queue::JobQueue;
use queue::entity::background_job::{self, JobState};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, TransactionTrait,
};
use store::LeadStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::SweeperConfig;

/// Upper bound on candidates handled per scan.
const SCAN_BATCH: u64 = 100;

/// Run the orphan-lead sweeper as a background task.
///
/// A lead stuck in RECEIVED past the age threshold has lost its processing
/// job (typically an enqueue failure after the row was persisted); the
/// sweeper gives it a new one.
pub async fn run_sweeper(
    db: DatabaseConnection,
    job_queue: Arc<dyn JobQueue>,
    config: SweeperConfig,
    cancel: CancellationToken,
) {
    let scan_interval = Duration::from_secs(config.scan_interval_secs);

    info!(
        age_threshold_secs = config.age_threshold_secs,
        scan_interval_secs = config.scan_interval_secs,
        "Starting orphan lead sweeper"
    );

    let mut interval = tokio::time::interval(scan_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        if let Err(e) = sweep_once(&db, job_queue.as_ref(), &config).await {
            error!(error = %e, "Orphan lead sweep failed");
        }
    }

    info!("Orphan lead sweeper stopped");
}

/// Scan for orphaned RECEIVED leads and re-enqueue a processing job for each.
async fn sweep_once(
    db: &DatabaseConnection,
    job_queue: &dyn JobQueue,
    config: &SweeperConfig,
) -> anyhow::Result<()> {
    let threshold = Utc::now() - chrono::Duration::seconds(config.age_threshold_secs as i64);

    let stale_ids = LeadStore::new(db).stale_received(threshold, SCAN_BATCH).await?;
    if stale_ids.is_empty() {
        return Ok(());
    }

    info!(count = stale_ids.len(), "Found stale RECEIVED leads");

    for lead_id in stale_ids {
        if let Err(e) = requeue_lead(db, job_queue, lead_id).await {
            error!(lead_id, error = %e, "Failed to re-enqueue stale lead");
        }
    }

    Ok(())
}

async fn requeue_lead(
    db: &DatabaseConnection,
    job_queue: &dyn JobQueue,
    lead_id: i64,
) -> anyhow::Result<()> {
    // A live job means the lead is not orphaned, just slow.
    if has_active_job(db, lead_id).await? {
        warn!(lead_id, "Stale lead already has an active job, skipping");
        return Ok(());
    }

    // Recheck under lock: a racing processor may have moved the lead on.
    let txn = db.begin().await?;
    let lead = LeadStore::new(&txn).find_by_id_for_update(lead_id).await?;

    let Some(lead) = lead else {
        txn.rollback().await?;
        return Ok(());
    };

    if lead.status != LeadStatus::Received {
        txn.rollback().await?;
        return Ok(());
    }
    txn.commit().await?;

    let job_id = job_queue
        .enqueue(
            PROCESS_LEAD,
            ProcessLeadJob::new(lead_id).to_payload(),
            Duration::ZERO,
        )
        .await?;

    info!(lead_id, job_id, "Re-enqueued stale lead");
    Ok(())
}

/// Whether a pending or in-flight `process_lead` job already references the
/// lead.
async fn has_active_job(db: &DatabaseConnection, lead_id: i64) -> anyhow::Result<bool> {
    let count = background_job::Entity::find()
        .filter(background_job::Column::JobType.eq(PROCESS_LEAD))
        .filter(background_job::Column::State.is_in([JobState::Pending, JobState::Processing]))
        .filter(Expr::cust_with_values(
            "payload->>'lead_id' = ?",
            [lead_id.to_string()],
        ))
        .count(db)
        .await?;

    Ok(count > 0)
}
