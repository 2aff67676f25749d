use std::fmt;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::CustomerApiConfig;

/// A downstream response in the 2xx range.
#[derive(Clone, Debug)]
pub struct Delivery {
    pub status: u16,
    pub body: String,
}

/// A failed delivery attempt, carrying its own retriability instead of
/// relying on ambient state.
#[derive(Clone, Debug)]
pub struct DeliveryError {
    /// HTTP status, absent for transport-level failures.
    pub status: Option<u16>,
    pub retriable: bool,
    pub message: String,
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.retriable {
            "retriable"
        } else {
            "non-retriable"
        };
        match self.status {
            Some(status) => write!(f, "delivery error ({kind}): HTTP {status} - {}", self.message),
            None => write!(f, "delivery error ({kind}): {}", self.message),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Stateless client for the downstream customer API. One POST per call;
/// retry scheduling belongs to the processor.
pub struct CustomerClient {
    client: Client,
    url: String,
    token: String,
}

impl CustomerClient {
    pub fn new(cfg: &CustomerApiConfig) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| DeliveryError {
                status: None,
                retriable: false,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            url: cfg.url.clone(),
            token: cfg.token.clone(),
        })
    }

    /// POST the customer payload, classifying the outcome.
    ///
    /// 2xx is success; 429 and 5xx are retriable; other 4xx are not;
    /// transport errors and timeouts are retriable without a status;
    /// payload serialization problems are not retriable.
    pub async fn send(&self, payload: &Value) -> Result<Delivery, DeliveryError> {
        let body = serde_json::to_vec(payload).map_err(|e| DeliveryError {
            status: None,
            retriable: false,
            message: format!("failed to serialize payload: {e}"),
        })?;

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .bearer_auth(&self.token)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    DeliveryError {
                        status: None,
                        retriable: false,
                        message: format!("failed to build request: {e}"),
                    }
                } else {
                    DeliveryError {
                        status: None,
                        retriable: true,
                        message: format!("network error: {e}"),
                    }
                }
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| DeliveryError {
            status: Some(status),
            retriable: true,
            message: format!("failed to read response body: {e}"),
        })?;

        debug!(status, "Customer API responded");

        if (200..300).contains(&status) {
            return Ok(Delivery { status, body });
        }

        Err(DeliveryError {
            status: Some(status),
            retriable: is_retriable_status(status),
            message: format!("HTTP {status}: {body}"),
        })
    }
}

/// 5xx and 429 may succeed later; everything else will not.
fn is_retriable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}
