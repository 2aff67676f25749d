use std::time::Duration;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use common::{LeadStatus, PROCESS_LEAD, ProcessLeadJob};
use serde::Serialize;
use serde_json::{Map, Value};
use store::LeadStore;
use tracing::{error, info, instrument};

use crate::error::{AppError, CorrelatedError, ErrorBody};
use crate::extractors::correlation::CorrelationId;
use crate::extractors::secret::verify_shared_secret;
use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
pub struct WebhookResponse {
    pub lead_id: i64,
    pub status: LeadStatus,
    pub correlation_id: String,
}

/// Accept a lead from an upstream source.
///
/// The happy path persists the raw lead, enqueues a processing job, and
/// answers inside the 500ms handoff budget; everything downstream of the
/// queue is observable through the stats endpoints.
#[utoipa::path(
    post,
    path = "/webhooks/leads",
    tag = "Webhooks",
    operation_id = "receiveLead",
    summary = "Receive a lead webhook",
    responses(
        (status = 200, description = "Lead accepted", body = WebhookResponse),
        (status = 400, description = "Malformed JSON payload", body = ErrorBody),
        (status = 401, description = "Missing or invalid shared secret", body = ErrorBody),
        (status = 503, description = "Persistence or queue unavailable", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers, body), fields(correlation_id = %correlation.as_str()))]
pub async fn receive_lead(
    State(state): State<AppState>,
    correlation: CorrelationId,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, CorrelatedError> {
    let correlate = |error: AppError| error.with_correlation(correlation.as_str());

    let raw_payload: Value = serde_json::from_slice(&body).map_err(|e| {
        info!(error = %e, "Malformed JSON payload");
        correlate(AppError::Validation("malformed JSON payload".into()))
    })?;

    verify_shared_secret(&state.config.auth, &headers).map_err(|e| {
        info!("Authentication failed");
        correlate(e)
    })?;

    let source_headers = snapshot_headers(&headers);

    let lead = LeadStore::new(&state.db)
        .insert(raw_payload, source_headers)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to persist lead");
            correlate(AppError::Unavailable("database error".into()))
        })?;

    info!(lead_id = lead.id, "Created lead");

    state
        .queue
        .enqueue(
            PROCESS_LEAD,
            ProcessLeadJob::new(lead.id).to_payload(),
            Duration::ZERO,
        )
        .await
        .map_err(|e| {
            // The lead row stays; the sweeper re-enqueues it later.
            error!(lead_id = lead.id, error = %e, "Failed to enqueue processing job");
            correlate(AppError::Unavailable("queue unavailable".into()))
        })?;

    info!(lead_id = lead.id, "Enqueued processing job");

    Ok(Json(WebhookResponse {
        lead_id: lead.id,
        status: lead.status,
        correlation_id: correlation.0,
    }))
}

/// One representative value per header name, for the audit trail.
fn snapshot_headers(headers: &HeaderMap) -> Value {
    let mut snapshot = Map::new();
    for (name, value) in headers {
        snapshot.entry(name.as_str().to_string()).or_insert_with(|| {
            Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned())
        });
    }
    Value::Object(snapshot)
}
