use std::fmt;

use common::attributes::{AttributeCatalog, AttributeDefinition, AttributeRule};
use serde_json::{Map, Value};
use tracing::debug;

/// Successful mapping: the downstream payload plus the keys of optional
/// attributes that were dropped for failing their type rule.
#[derive(Clone, Debug)]
pub struct Mapping {
    pub customer_payload: Value,
    pub omitted: Vec<String>,
}

/// The mapping could not produce a meaningful downstream call.
#[derive(Clone, Debug)]
pub struct MappingError {
    pub reasons: Vec<String>,
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mapping failed: {}", self.reasons.join("; "))
    }
}

impl std::error::Error for MappingError {}

/// Transforms a normalized lead into the customer wire format.
///
/// Permissive by policy: upstream sources drift, so an optional attribute
/// failing its type check is dropped rather than failing the whole lead.
/// Failure is reserved for missing core fields and invalid required
/// attributes, where the downstream call itself would be meaningless.
pub struct Mapper {
    catalog: AttributeCatalog,
    product_name: String,
}

impl Mapper {
    pub fn new(catalog: AttributeCatalog, product_name: impl Into<String>) -> Self {
        Self {
            catalog,
            product_name: product_name.into(),
        }
    }

    pub fn map(&self, normalized: &Value) -> Result<Mapping, MappingError> {
        let input = normalized.as_object().cloned().unwrap_or_default();

        let mut payload = Map::new();
        let mut omitted = Vec::new();
        let mut reasons = Vec::new();

        // Core field: phone must be present and non-empty.
        match input.get("phone").and_then(Value::as_str) {
            Some(phone) if !phone.is_empty() => {
                payload.insert("phone".into(), Value::String(phone.to_string()));
            }
            _ => {
                debug!("Missing required core field: phone");
                reasons.push("missing required field: phone".to_string());
            }
        }

        // Core field: product identifier always comes from configuration.
        payload.insert(
            "product".into(),
            serde_json::json!({ "name": self.product_name }),
        );

        for (key, value) in &input {
            if key == "phone" || key == "product" {
                continue;
            }

            let Some(def) = self.catalog.get(key) else {
                payload.insert(key.clone(), value.clone());
                continue;
            };

            match validate_attribute(value, def) {
                Some(validated) => {
                    payload.insert(key.clone(), validated);
                }
                None if def.required => {
                    debug!(attribute = %key, "Required attribute is invalid");
                    reasons.push(format!("required attribute '{key}' is invalid"));
                }
                None => {
                    debug!(attribute = %key, "Omitting invalid optional attribute");
                    omitted.push(key.clone());
                }
            }
        }

        if !reasons.is_empty() {
            return Err(MappingError { reasons });
        }

        Ok(Mapping {
            customer_payload: Value::Object(payload),
            omitted,
        })
    }
}

/// Check a value against its attribute rule, returning the value to emit on
/// success (range values are emitted as numbers even when they arrived as
/// strings).
fn validate_attribute(value: &Value, def: &AttributeDefinition) -> Option<Value> {
    if value.is_null() {
        return None;
    }

    match &def.rule {
        AttributeRule::Text => {
            let s = value.as_str()?;
            if s.trim().is_empty() {
                None
            } else {
                Some(Value::String(s.to_string()))
            }
        }
        AttributeRule::Dropdown { options } => {
            let s = value.as_str()?;
            if options.is_empty() || options.iter().any(|option| option == s) {
                Some(Value::String(s.to_string()))
            } else {
                None
            }
        }
        AttributeRule::Range { min, max } => {
            let n = match value {
                Value::Number(n) => n.as_f64()?,
                Value::String(s) => s.parse::<f64>().ok()?,
                _ => return None,
            };
            if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
                return None;
            }
            serde_json::Number::from_f64(n).map(Value::Number)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::attributes::AttributeCatalog;
    use serde_json::json;
    use std::collections::HashMap;

    fn catalog() -> AttributeCatalog {
        let defs = json!({
            "roof_type": {"type": "dropdown", "options": ["flat", "gabled"]},
            "full_name": {"type": "text"},
            "roof_area": {"type": "range", "min": 10.0, "max": 500.0},
            "salutation": {"type": "dropdown", "required": true, "options": ["mr", "ms"]},
        });
        serde_json::from_value(defs).unwrap()
    }

    fn mapper() -> Mapper {
        Mapper::new(catalog(), "solar_premium")
    }

    #[test]
    fn test_core_fields() {
        let mapping = mapper()
            .map(&json!({"phone": "4912345678", "salutation": "mr"}))
            .unwrap();
        assert_eq!(mapping.customer_payload["phone"], "4912345678");
        assert_eq!(mapping.customer_payload["product"]["name"], "solar_premium");
        assert!(mapping.omitted.is_empty());
    }

    #[test]
    fn test_missing_phone_fails() {
        for payload in [
            json!({"salutation": "mr"}),
            json!({"phone": "", "salutation": "mr"}),
            json!({"phone": null, "salutation": "mr"}),
            json!({"phone": 491234, "salutation": "mr"}),
        ] {
            let err = mapper().map(&payload).unwrap_err();
            assert!(
                err.reasons.iter().any(|r| r.contains("phone")),
                "payload {payload} should fail on phone: {err}"
            );
        }
    }

    #[test]
    fn test_product_always_injected() {
        let mapping = mapper()
            .map(&json!({"phone": "1", "salutation": "ms", "product": "spoofed"}))
            .unwrap();
        assert_eq!(
            mapping.customer_payload["product"],
            json!({"name": "solar_premium"})
        );
    }

    #[test]
    fn test_unconfigured_attributes_pass_through() {
        let mapping = mapper()
            .map(&json!({"phone": "1", "salutation": "mr", "source": "campaign-7", "score": 3}))
            .unwrap();
        assert_eq!(mapping.customer_payload["source"], "campaign-7");
        assert_eq!(mapping.customer_payload["score"], 3);
    }

    #[test]
    fn test_invalid_optional_attributes_are_omitted() {
        let mapping = mapper()
            .map(&json!({
                "phone": "1",
                "salutation": "mr",
                "roof_type": "unlisted_label",
                "full_name": "   ",
                "roof_area": 9.5,
            }))
            .unwrap();

        let payload = mapping.customer_payload.as_object().unwrap();
        assert!(!payload.contains_key("roof_type"));
        assert!(!payload.contains_key("full_name"));
        assert!(!payload.contains_key("roof_area"));
        assert_eq!(mapping.omitted.len(), 3);
        assert!(mapping.omitted.contains(&"roof_type".to_string()));
    }

    #[test]
    fn test_invalid_required_attribute_fails() {
        let err = mapper()
            .map(&json!({"phone": "1", "salutation": "dr"}))
            .unwrap_err();
        assert!(err.reasons[0].contains("salutation"));
    }

    #[test]
    fn test_missing_optional_attribute_is_fine() {
        let mapping = mapper().map(&json!({"phone": "1", "salutation": "mr"})).unwrap();
        assert!(mapping.omitted.is_empty());
    }

    #[test]
    fn test_range_accepts_numeric_strings_and_bounds() {
        let m = mapper();

        let mapping = m
            .map(&json!({"phone": "1", "salutation": "mr", "roof_area": "120.5"}))
            .unwrap();
        assert_eq!(mapping.customer_payload["roof_area"], 120.5);

        let mapping = m
            .map(&json!({"phone": "1", "salutation": "mr", "roof_area": 10.0}))
            .unwrap();
        assert_eq!(mapping.customer_payload["roof_area"], 10.0);

        let mapping = m
            .map(&json!({"phone": "1", "salutation": "mr", "roof_area": 500.01}))
            .unwrap();
        assert!(mapping.omitted.contains(&"roof_area".to_string()));
    }

    #[test]
    fn test_dropdown_without_options_accepts_any_string() {
        let defs: HashMap<String, common::attributes::AttributeDefinition> =
            serde_json::from_value(json!({
                "origin": {"type": "dropdown", "options": []},
            }))
            .unwrap();
        let m = Mapper::new(AttributeCatalog::new(defs), "p");

        let mapping = m
            .map(&json!({"phone": "1", "origin": "anything goes"}))
            .unwrap();
        assert_eq!(mapping.customer_payload["origin"], "anything goes");
    }

    #[test]
    fn test_non_object_input_fails_on_phone() {
        assert!(mapper().map(&json!("not an object")).is_err());
    }
}
