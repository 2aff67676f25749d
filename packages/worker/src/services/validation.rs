use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::config::ValidationConfig;

/// Why a lead was rejected. The code is written to the lead row; the detail
/// only reaches logs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejection {
    pub code: String,
    pub detail: String,
}

/// Business-rule screening of the raw payload.
///
/// Rules run in a fixed order and the first failure wins: postal code,
/// homeowner flag, then configured required fields.
pub struct Validator {
    zipcode_pattern: Regex,
    required_fields: Vec<String>,
    code_zipcode_invalid: String,
    code_not_homeowner: String,
    code_missing_required_field: String,
}

impl Validator {
    pub fn new(cfg: &ValidationConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            zipcode_pattern: Regex::new(&cfg.zipcode_pattern)?,
            required_fields: cfg.required_fields.clone(),
            code_zipcode_invalid: cfg.codes.zipcode_invalid.clone(),
            code_not_homeowner: cfg.codes.not_homeowner.clone(),
            code_missing_required_field: cfg.codes.missing_required_field.clone(),
        })
    }

    /// Validate a raw lead payload. Pure over the input document.
    pub fn validate(&self, raw: &Value) -> Result<(), Rejection> {
        if !self.zipcode_ok(raw) {
            debug!("Zipcode validation failed");
            return Err(Rejection {
                code: self.code_zipcode_invalid.clone(),
                detail: format!(
                    "zipcode must be a string matching {}",
                    self.zipcode_pattern.as_str()
                ),
            });
        }

        if !self.homeowner_ok(raw) {
            debug!("Homeowner validation failed");
            return Err(Rejection {
                code: self.code_not_homeowner.clone(),
                detail: "house.is_owner must be exactly true".into(),
            });
        }

        if let Some(field) = self.first_missing_required_field(raw) {
            debug!(field, "Required field validation failed");
            return Err(Rejection {
                code: self.code_missing_required_field.clone(),
                detail: format!("missing required field: {field}"),
            });
        }

        Ok(())
    }

    /// The postal code must be a string scalar matching the anchored pattern.
    fn zipcode_ok(&self, raw: &Value) -> bool {
        raw.get("zipcode")
            .and_then(Value::as_str)
            .is_some_and(|zip| self.zipcode_pattern.is_match(zip))
    }

    /// `house.is_owner` must be exactly boolean true.
    fn homeowner_ok(&self, raw: &Value) -> bool {
        raw.get("house")
            .and_then(|house| house.get("is_owner"))
            .and_then(Value::as_bool)
            == Some(true)
    }

    fn first_missing_required_field(&self, raw: &Value) -> Option<&str> {
        self.required_fields
            .iter()
            .map(String::as_str)
            .find(|field| matches!(raw.get(field), None | Some(Value::Null)))
    }
}
