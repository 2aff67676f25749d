use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;

/// Structured error response body. The correlation id is present on every
/// ingest-path error so callers can tie it to their request.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    Unauthorized(String),
    NotFound(String),
    Unavailable(String),
    Internal(String),
}

/// An `AppError` carrying the request's correlation id into the body.
#[derive(Debug)]
pub struct CorrelatedError {
    pub error: AppError,
    pub correlation_id: String,
}

impl AppError {
    pub fn with_correlation(self, correlation_id: impl Into<String>) -> CorrelatedError {
        CorrelatedError {
            error: self,
            correlation_id: correlation_id.into(),
        }
    }

    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "an unexpected error occurred".into(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_message();
        (
            status,
            Json(ErrorBody {
                error,
                correlation_id: None,
            }),
        )
            .into_response()
    }
}

impl IntoResponse for CorrelatedError {
    fn into_response(self) -> Response {
        let (status, error) = self.error.status_and_message();
        (
            status,
            Json(ErrorBody {
                error,
                correlation_id: Some(self.correlation_id),
            }),
        )
            .into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<store::StoreError> for AppError {
    fn from(err: store::StoreError) -> Self {
        match err {
            store::StoreError::LeadNotFound(id) => AppError::NotFound(format!("lead {id} not found")),
            other => AppError::Internal(other.to_string()),
        }
    }
}
