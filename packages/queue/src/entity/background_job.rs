use sea_orm::entity::prelude::*;
use sea_orm::prelude::StringLen;
use serde::{Deserialize, Serialize};

/// Dispatch state of a background job.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting to be picked up once `next_run_at` passes.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Claimed by exactly one worker.
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// A queued background job.
///
/// Only `pending` rows with `next_run_at <= now` are dispatchable; dispatch
/// flips the row to `processing` under a skip-locked row claim so concurrent
/// workers never receive the same job.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "background_job")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(indexed)]
    pub job_type: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub payload: serde_json::Value,

    pub created_at: DateTimeUtc,

    /// Earliest time this job may be dispatched.
    #[sea_orm(indexed)]
    pub next_run_at: DateTimeUtc,

    /// Number of times the job has been dispatched to a worker. This is
    /// queue-level bookkeeping; delivery attempts are counted per lead.
    pub attempts: i32,

    #[sea_orm(indexed)]
    pub state: JobState,

    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    pub completed_at: Option<DateTimeUtc>,
    pub failed_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
