use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entity::delivery_attempt;
use crate::error::StoreError;

/// Outcome data for a delivery attempt about to be recorded.
#[derive(Clone, Debug)]
pub struct AttemptOutcome {
    pub requested_at: DateTime<Utc>,
    pub response_status: Option<i32>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    pub success: bool,
}

impl AttemptOutcome {
    pub fn success(requested_at: DateTime<Utc>, status: u16, body: String) -> Self {
        Self {
            requested_at,
            response_status: Some(i32::from(status)),
            response_body: Some(body),
            error_message: None,
            success: true,
        }
    }

    pub fn failure(
        requested_at: DateTime<Utc>,
        status: Option<u16>,
        error_message: String,
    ) -> Self {
        Self {
            requested_at,
            response_status: status.map(i32::from),
            response_body: None,
            error_message: Some(error_message),
            success: false,
        }
    }
}

/// Delivery attempt bookkeeping, generic over a connection or an open
/// transaction.
pub struct AttemptStore<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> AttemptStore<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Number of attempts recorded for a lead. This count is authoritative
    /// for retry decisions; queue-level dispatch counters are not.
    pub async fn count_for_lead(&self, lead_id: i64) -> Result<u64, StoreError> {
        Ok(delivery_attempt::Entity::find()
            .filter(delivery_attempt::Column::LeadId.eq(lead_id))
            .count(self.conn)
            .await?)
    }

    /// Record the next attempt for a lead. The attempt number is recomputed
    /// from the stored count on this same connection, so calling inside the
    /// transaction that also writes the status keeps numbering gapless even
    /// under concurrent processors (the unique index backstops the rest).
    pub async fn record_next(
        &self,
        lead_id: i64,
        outcome: AttemptOutcome,
    ) -> Result<delivery_attempt::Model, StoreError> {
        let attempt_no = self.count_for_lead(lead_id).await? as i32 + 1;

        let model = delivery_attempt::ActiveModel {
            lead_id: Set(lead_id),
            attempt_no: Set(attempt_no),
            requested_at: Set(outcome.requested_at),
            response_status: Set(outcome.response_status),
            response_body: Set(outcome.response_body),
            error_message: Set(outcome.error_message),
            success: Set(outcome.success),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        Ok(model.insert(self.conn).await?)
    }

    /// All attempts for a lead, ordered by attempt number.
    pub async fn list_for_lead(
        &self,
        lead_id: i64,
    ) -> Result<Vec<delivery_attempt::Model>, StoreError> {
        Ok(delivery_attempt::Entity::find()
            .filter(delivery_attempt::Column::LeadId.eq(lead_id))
            .order_by_asc(delivery_attempt::Column::AttemptNo)
            .all(self.conn)
            .await?)
    }
}
