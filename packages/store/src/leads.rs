use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::LeadStatus;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entity::lead;
use crate::error::StoreError;

/// Lead persistence operations, generic over a connection or an open
/// transaction so status writes can commit together with attempt records.
pub struct LeadStore<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> LeadStore<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Insert a freshly received lead.
    pub async fn insert(
        &self,
        raw_payload: serde_json::Value,
        source_headers: serde_json::Value,
    ) -> Result<lead::Model, StoreError> {
        let now = Utc::now();
        let model = lead::ActiveModel {
            received_at: Set(now),
            raw_payload: Set(raw_payload),
            source_headers: Set(source_headers),
            status: Set(LeadStatus::Received),
            rejection_reason: Set(None),
            normalized_payload: Set(None),
            customer_payload: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(model.insert(self.conn).await?)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<lead::Model>, StoreError> {
        Ok(lead::Entity::find_by_id(id).one(self.conn).await?)
    }

    /// Load a lead under `FOR UPDATE`, serialising concurrent transitions.
    pub async fn find_by_id_for_update(&self, id: i64) -> Result<Option<lead::Model>, StoreError> {
        Ok(lead::Entity::find_by_id(id)
            .lock(LockType::Update)
            .one(self.conn)
            .await?)
    }

    /// Move a lead to `target`, failing loudly on any move outside the
    /// status graph. The row is locked for the duration of the surrounding
    /// transaction.
    pub async fn set_status(
        &self,
        id: i64,
        target: LeadStatus,
    ) -> Result<lead::Model, StoreError> {
        let current = self
            .find_by_id_for_update(id)
            .await?
            .ok_or(StoreError::LeadNotFound(id))?;

        current.status.transition(target)?;

        let mut active: lead::ActiveModel = current.into();
        active.status = Set(target);
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.conn).await?)
    }

    /// RECEIVED -> REJECTED with the validation rejection code.
    pub async fn mark_rejected(&self, id: i64, code: &str) -> Result<lead::Model, StoreError> {
        let current = self
            .find_by_id_for_update(id)
            .await?
            .ok_or(StoreError::LeadNotFound(id))?;

        current.status.transition(LeadStatus::Rejected)?;

        let mut active: lead::ActiveModel = current.into();
        active.status = Set(LeadStatus::Rejected);
        active.rejection_reason = Set(Some(code.to_string()));
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.conn).await?)
    }

    /// RECEIVED -> READY, persisting the normalized and customer payloads
    /// produced by the transformation stage.
    pub async fn mark_ready_with_payloads(
        &self,
        id: i64,
        normalized_payload: serde_json::Value,
        customer_payload: serde_json::Value,
    ) -> Result<lead::Model, StoreError> {
        let current = self
            .find_by_id_for_update(id)
            .await?
            .ok_or(StoreError::LeadNotFound(id))?;

        current.status.transition(LeadStatus::Ready)?;

        let mut active: lead::ActiveModel = current.into();
        active.status = Set(LeadStatus::Ready);
        active.normalized_payload = Set(Some(normalized_payload));
        active.customer_payload = Set(Some(customer_payload));
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.conn).await?)
    }

    /// Lead counts grouped by status.
    pub async fn counts_by_status(&self) -> Result<HashMap<LeadStatus, u64>, StoreError> {
        let statuses: Vec<LeadStatus> = lead::Entity::find()
            .select_only()
            .column(lead::Column::Status)
            .into_tuple()
            .all(self.conn)
            .await?;

        let mut counts: HashMap<LeadStatus, u64> = HashMap::new();
        for status in statuses {
            *counts.entry(status).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Most recent leads by arrival time.
    pub async fn recent(&self, limit: u64) -> Result<Vec<lead::Model>, StoreError> {
        Ok(lead::Entity::find()
            .order_by_desc(lead::Column::ReceivedAt)
            .limit(limit)
            .all(self.conn)
            .await?)
    }

    /// Ids of leads still RECEIVED after `older_than` — candidates for
    /// re-enqueueing by the sweeper.
    pub async fn stale_received(
        &self,
        older_than: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<i64>, StoreError> {
        Ok(lead::Entity::find()
            .select_only()
            .column(lead::Column::Id)
            .filter(lead::Column::Status.eq(LeadStatus::Received))
            .filter(lead::Column::ReceivedAt.lt(older_than))
            .order_by_asc(lead::Column::ReceivedAt)
            .limit(limit)
            .into_tuple()
            .all(self.conn)
            .await?)
    }
}
