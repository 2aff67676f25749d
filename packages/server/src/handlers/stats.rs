use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use common::LeadStatus;
use serde::{Deserialize, Serialize};
use store::{AttemptStore, LeadStore};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

/// Lead counts grouped by status.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LeadCountsResponse {
    pub received: u64,
    pub rejected: u64,
    pub ready: u64,
    pub delivered: u64,
    pub failed: u64,
    pub permanently_failed: u64,
    pub total: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RecentLeadSummary {
    pub id: i64,
    pub received_at: DateTime<Utc>,
    pub status: LeadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DeliveryAttemptSummary {
    pub attempt_no: i32,
    pub requested_at: DateTime<Utc>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_status: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Full per-lead history: all stored payload snapshots plus the ordered
/// delivery attempts.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LeadHistoryResponse {
    pub id: i64,
    pub received_at: DateTime<Utc>,
    pub status: LeadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[schema(value_type = Object)]
    pub raw_payload: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub normalized_payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub customer_payload: Option<serde_json::Value>,
    pub delivery_attempts: Vec<DeliveryAttemptSummary>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct RecentLeadsQuery {
    /// Number of leads to return. Default 50, capped at 200.
    pub limit: Option<u64>,
}

/// Lead counts by status.
#[utoipa::path(
    get,
    path = "/stats/leads/counts",
    tag = "Stats",
    operation_id = "leadCounts",
    summary = "Lead counts grouped by status",
    responses(
        (status = 200, description = "Counts per status", body = LeadCountsResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn lead_counts(
    State(state): State<AppState>,
) -> Result<Json<LeadCountsResponse>, AppError> {
    let counts = LeadStore::new(&state.db).counts_by_status().await?;
    let get = |status: LeadStatus| counts.get(&status).copied().unwrap_or(0);

    let response = LeadCountsResponse {
        received: get(LeadStatus::Received),
        rejected: get(LeadStatus::Rejected),
        ready: get(LeadStatus::Ready),
        delivered: get(LeadStatus::Delivered),
        failed: get(LeadStatus::Failed),
        permanently_failed: get(LeadStatus::PermanentlyFailed),
        total: counts.values().sum(),
    };

    Ok(Json(response))
}

/// Most recently received leads.
#[utoipa::path(
    get,
    path = "/stats/leads/recent",
    tag = "Stats",
    operation_id = "recentLeads",
    summary = "Most recent leads",
    params(RecentLeadsQuery),
    responses(
        (status = 200, description = "Recent leads, newest first", body = [RecentLeadSummary]),
    ),
)]
#[instrument(skip(state, query))]
pub async fn recent_leads(
    State(state): State<AppState>,
    Query(query): Query<RecentLeadsQuery>,
) -> Result<Json<Vec<RecentLeadSummary>>, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);

    let leads = LeadStore::new(&state.db).recent(limit).await?;
    let response = leads
        .into_iter()
        .map(|lead| RecentLeadSummary {
            id: lead.id,
            received_at: lead.received_at,
            status: lead.status,
            rejection_reason: lead.rejection_reason,
        })
        .collect();

    Ok(Json(response))
}

/// Full history of one lead.
#[utoipa::path(
    get,
    path = "/stats/leads/{id}/history",
    tag = "Stats",
    operation_id = "leadHistory",
    summary = "Full lead history",
    params(
        ("id" = i64, Path, description = "Lead ID")
    ),
    responses(
        (status = 200, description = "Lead snapshot with delivery attempts", body = LeadHistoryResponse),
        (status = 404, description = "Lead not found", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(lead_id = %id))]
pub async fn lead_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LeadHistoryResponse>, AppError> {
    let lead = LeadStore::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("lead {id} not found")))?;

    let attempts = AttemptStore::new(&state.db)
        .list_for_lead(id)
        .await?
        .into_iter()
        .map(|attempt| DeliveryAttemptSummary {
            attempt_no: attempt.attempt_no,
            requested_at: attempt.requested_at,
            success: attempt.success,
            response_status: attempt.response_status,
            response_body: attempt.response_body,
            error_message: attempt.error_message,
        })
        .collect();

    Ok(Json(LeadHistoryResponse {
        id: lead.id,
        received_at: lead.received_at,
        status: lead.status,
        rejection_reason: lead.rejection_reason,
        raw_payload: lead.raw_payload,
        normalized_payload: lead.normalized_payload,
        customer_payload: lead.customer_payload,
        delivery_attempts: attempts,
    }))
}
