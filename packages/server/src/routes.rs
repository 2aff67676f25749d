use utoipa_axum::{router::OpenApiRouter, routes};

use crate::handlers;
use crate::state::AppState;

pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::webhook::receive_lead))
        .routes(routes!(handlers::stats::lead_counts))
        .routes(routes!(handlers::stats::recent_leads))
        .routes(routes!(handlers::stats::lead_history))
        .routes(routes!(handlers::health::health))
}
