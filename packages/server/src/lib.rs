pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod sweeper;

use std::any::Any;

use axum::Json;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tower_http::catch_panic::CatchPanicLayer;

use crate::error::ErrorBody;
use crate::extractors::correlation::{CORRELATION_HEADER, CorrelationId, correlation_layer};
use crate::state::AppState;

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, _api) = routes::api_routes().split_for_parts();

    router
        .method_not_allowed_fallback(method_not_allowed)
        .layer(axum::middleware::from_fn(correlation_layer))
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

async fn method_not_allowed(correlation: CorrelationId) -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorBody {
            error: "method not allowed".into(),
            correlation_id: Some(correlation.0),
        }),
    )
        .into_response()
}

/// The recovery layer: a panicking handler must not crash the server, and
/// the caller still gets a correlation id to report.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let correlation = CorrelationId::generate();

    let detail = if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(correlation_id = %correlation.as_str(), "Panic recovered: {detail}");

    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "internal server error".into(),
            correlation_id: Some(correlation.0.clone()),
        }),
    )
        .into_response();

    if let Ok(value) = HeaderValue::from_str(&correlation.0) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}
