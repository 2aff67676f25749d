use common::LeadStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An inbound lead and the three payload snapshots of its lifetime.
///
/// `raw_payload` and `source_headers` are immutable after insert; status,
/// the derived payloads, and the rejection reason are mutated only by the
/// processor and only along permitted status transitions.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lead")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(indexed)]
    pub received_at: DateTimeUtc,

    /// Webhook body exactly as received.
    #[sea_orm(column_type = "JsonBinary")]
    pub raw_payload: serde_json::Value,

    /// Inbound headers snapshot (one representative value per name).
    #[sea_orm(column_type = "JsonBinary")]
    pub source_headers: serde_json::Value,

    #[sea_orm(indexed)]
    pub status: LeadStatus,

    /// Non-null iff status is REJECTED.
    pub rejection_reason: Option<String>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub normalized_payload: Option<serde_json::Value>,

    /// Non-null once the lead has reached READY.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub customer_payload: Option<serde_json::Value>,

    #[sea_orm(has_many)]
    pub delivery_attempts: HasMany<super::delivery_attempt::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
