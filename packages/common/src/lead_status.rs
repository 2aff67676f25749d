#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a lead during the ingest-to-delivery lifecycle.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    /// Accepted via webhook and queued for processing.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "RECEIVED"))]
    Received,
    /// Failed business validation. Terminal.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "REJECTED"))]
    Rejected,
    /// Validated and mapped, waiting for delivery.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "READY"))]
    Ready,
    /// Accepted by the downstream customer API. Terminal.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "DELIVERED"))]
    Delivered,
    /// Last delivery attempt failed but may be retried.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "FAILED"))]
    Failed,
    /// Retries exhausted or a non-retriable failure occurred. Terminal.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "PERMANENTLY_FAILED"))]
    PermanentlyFailed,
}

/// Rejected attempt to move a lead outside the allowed status graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid lead status transition {from} -> {to}")]
pub struct TransitionError {
    pub from: LeadStatus,
    pub to: LeadStatus,
}

impl LeadStatus {
    /// Returns true if no further transitions are allowed from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::Delivered | Self::PermanentlyFailed
        )
    }

    /// Whether a transition to `target` is allowed.
    ///
    /// The graph is closed: RECEIVED fans out to REJECTED (validation),
    /// READY (mapped) or PERMANENTLY_FAILED (mapping failure); READY and
    /// FAILED move between the delivery outcomes; terminal states go nowhere.
    pub fn can_transition_to(&self, target: LeadStatus) -> bool {
        match self {
            Self::Received => matches!(
                target,
                Self::Rejected | Self::Ready | Self::PermanentlyFailed
            ),
            Self::Ready => matches!(
                target,
                Self::Delivered | Self::Failed | Self::PermanentlyFailed
            ),
            Self::Failed => matches!(
                target,
                Self::Delivered | Self::Failed | Self::PermanentlyFailed
            ),
            Self::Rejected | Self::Delivered | Self::PermanentlyFailed => false,
        }
    }

    /// Guard a transition, failing loudly on any illegal move.
    pub fn transition(self, target: LeadStatus) -> Result<LeadStatus, TransitionError> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(TransitionError {
                from: self,
                to: target,
            })
        }
    }

    /// All possible status values.
    pub const ALL: &'static [LeadStatus] = &[
        Self::Received,
        Self::Rejected,
        Self::Ready,
        Self::Delivered,
        Self::Failed,
        Self::PermanentlyFailed,
    ];

    /// Returns the string representation (SCREAMING_SNAKE_CASE).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "RECEIVED",
            Self::Rejected => "REJECTED",
            Self::Ready => "READY",
            Self::Delivered => "DELIVERED",
            Self::Failed => "FAILED",
            Self::PermanentlyFailed => "PERMANENTLY_FAILED",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for LeadStatus {
    fn default() -> Self {
        Self::Received
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            LeadStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for LeadStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECEIVED" => Ok(Self::Received),
            "REJECTED" => Ok(Self::Rejected),
            "READY" => Ok(Self::Ready),
            "DELIVERED" => Ok(Self::Delivered),
            "FAILED" => Ok(Self::Failed),
            "PERMANENTLY_FAILED" => Ok(Self::PermanentlyFailed),
            _ => Err(ParseStatusError {
                invalid: s.to_string(),
            }),
        }
    }
}
