use axum::http::HeaderMap;

use crate::config::AuthConfig;
use crate::error::AppError;

/// Header carrying the inbound shared secret.
pub const SHARED_SECRET_HEADER: &str = "x-shared-secret";

/// Enforce the shared-secret policy when it is enabled. Runs after body
/// parsing so malformed JSON still answers 400.
pub fn verify_shared_secret(auth: &AuthConfig, headers: &HeaderMap) -> Result<(), AppError> {
    if !auth.enabled {
        return Ok(());
    }

    let Some(provided) = headers.get(SHARED_SECRET_HEADER) else {
        return Err(AppError::Unauthorized(
            "missing authentication header".into(),
        ));
    };

    if provided.as_bytes() != auth.shared_secret.as_bytes() {
        return Err(AppError::Unauthorized(
            "invalid authentication credentials".into(),
        ));
    }

    Ok(())
}
