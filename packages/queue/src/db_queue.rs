use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{LockBehavior, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde_json::Value;
use tracing::debug;

use crate::entity::background_job::{self, JobState};
use crate::error::QueueError;
use crate::models::{Job, JobQueue};

/// Relational job queue over the shared database.
///
/// Dispatch uses a `FOR UPDATE SKIP LOCKED` row claim inside a short
/// transaction, so the dispatch lock is held only for the duration of the
/// dequeue statement.
#[derive(Clone)]
pub struct DbQueue {
    db: DatabaseConnection,
}

impl DbQueue {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl JobQueue for DbQueue {
    async fn enqueue(
        &self,
        job_type: &str,
        payload: Value,
        delay: Duration,
    ) -> Result<i64, QueueError> {
        let now = Utc::now();
        let next_run_at = delayed_from(now, delay);

        let model = background_job::ActiveModel {
            job_type: Set(job_type.to_string()),
            payload: Set(payload),
            created_at: Set(now),
            next_run_at: Set(next_run_at),
            attempts: Set(0),
            state: Set(JobState::Pending),
            error_message: Set(None),
            completed_at: Set(None),
            failed_at: Set(None),
            ..Default::default()
        };

        let inserted = model.insert(&self.db).await.map_err(QueueError::from_db)?;
        debug!(job_id = inserted.id, job_type, "Job enqueued");
        Ok(inserted.id)
    }

    async fn dequeue(&self) -> Result<Option<Job>, QueueError> {
        let txn = self.db.begin().await.map_err(QueueError::from_db)?;

        let row = background_job::Entity::find()
            .filter(background_job::Column::State.eq(JobState::Pending))
            .filter(background_job::Column::NextRunAt.lte(Utc::now()))
            .order_by_asc(background_job::Column::NextRunAt)
            .limit(1)
            .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
            .one(&txn)
            .await
            .map_err(QueueError::from_db)?;

        let Some(row) = row else {
            txn.commit().await.map_err(QueueError::from_db)?;
            return Ok(None);
        };

        let attempts = row.attempts + 1;
        let mut active: background_job::ActiveModel = row.into();
        active.state = Set(JobState::Processing);
        active.attempts = Set(attempts);
        let claimed = active.update(&txn).await.map_err(QueueError::from_db)?;

        txn.commit().await.map_err(QueueError::from_db)?;

        debug!(job_id = claimed.id, attempts, "Job claimed");
        Ok(Some(Job::from(claimed)))
    }

    async fn complete(&self, job: &Job) -> Result<(), QueueError> {
        let result = background_job::Entity::update_many()
            .col_expr(
                background_job::Column::State,
                sea_orm::sea_query::Expr::value(JobState::Completed),
            )
            .col_expr(
                background_job::Column::CompletedAt,
                sea_orm::sea_query::Expr::value(Some(Utc::now())),
            )
            .filter(background_job::Column::Id.eq(job.id))
            .exec(&self.db)
            .await
            .map_err(QueueError::from_db)?;

        if result.rows_affected == 0 {
            return Err(QueueError::JobNotFound(job.id));
        }
        Ok(())
    }

    async fn retry(&self, job: &Job, delay: Duration) -> Result<(), QueueError> {
        let next_run_at = delayed_from(Utc::now(), delay);
        let result = background_job::Entity::update_many()
            .col_expr(
                background_job::Column::State,
                sea_orm::sea_query::Expr::value(JobState::Pending),
            )
            .col_expr(
                background_job::Column::NextRunAt,
                sea_orm::sea_query::Expr::value(next_run_at),
            )
            .filter(background_job::Column::Id.eq(job.id))
            .exec(&self.db)
            .await
            .map_err(QueueError::from_db)?;

        if result.rows_affected == 0 {
            return Err(QueueError::JobNotFound(job.id));
        }
        Ok(())
    }

    async fn fail(&self, job: &Job, reason: &str) -> Result<(), QueueError> {
        let result = background_job::Entity::update_many()
            .col_expr(
                background_job::Column::State,
                sea_orm::sea_query::Expr::value(JobState::Failed),
            )
            .col_expr(
                background_job::Column::ErrorMessage,
                sea_orm::sea_query::Expr::value(Some(reason.to_string())),
            )
            .col_expr(
                background_job::Column::FailedAt,
                sea_orm::sea_query::Expr::value(Some(Utc::now())),
            )
            .filter(background_job::Column::Id.eq(job.id))
            .exec(&self.db)
            .await
            .map_err(QueueError::from_db)?;

        if result.rows_affected == 0 {
            return Err(QueueError::JobNotFound(job.id));
        }
        Ok(())
    }

    async fn health(&self) -> Result<(), QueueError> {
        self.db.ping().await.map_err(QueueError::from_db)
    }
}

/// `now + delay`, saturating at the far end of the representable range.
fn delayed_from(
    now: chrono::DateTime<Utc>,
    delay: Duration,
) -> chrono::DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delay| now.checked_add_signed(delay))
        .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC)
}
