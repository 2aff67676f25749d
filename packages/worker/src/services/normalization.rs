use std::collections::HashSet;

use regex::Regex;
use serde_json::{Map, Value};

use crate::config::NormalizationConfig;

/// Idempotent cleanup of inbound lead values.
///
/// Strings are trimmed and internal whitespace runs collapsed; fields whose
/// name carries the email role are lowercased; fields carrying the phone
/// role keep decimal digits only. Everything else passes through unchanged,
/// so `normalize(normalize(x)) == normalize(x)` for every document.
pub struct Normalizer {
    email_fields: HashSet<String>,
    phone_fields: HashSet<String>,
    whitespace: Regex,
}

impl Normalizer {
    pub fn new(cfg: &NormalizationConfig) -> Self {
        Self {
            email_fields: cfg.email_fields.iter().cloned().collect(),
            phone_fields: cfg.phone_fields.iter().cloned().collect(),
            whitespace: Regex::new(r"\s+").expect("whitespace pattern is valid"),
        }
    }

    pub fn normalize(&self, doc: &Value) -> Value {
        self.normalize_value(doc, None)
    }

    fn normalize_value(&self, value: &Value, key: Option<&str>) -> Value {
        match value {
            Value::String(s) => Value::String(self.normalize_string(s, key)),
            Value::Object(map) => {
                let mut normalized = Map::with_capacity(map.len());
                for (k, v) in map {
                    normalized.insert(k.clone(), self.normalize_value(v, Some(k)));
                }
                Value::Object(normalized)
            }
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.normalize_value(item, key))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn normalize_string(&self, s: &str, key: Option<&str>) -> String {
        if let Some(key) = key {
            if self.phone_fields.contains(key) {
                return s.chars().filter(char::is_ascii_digit).collect();
            }
            if self.email_fields.contains(key) {
                return self.clean_whitespace(s).to_lowercase();
            }
        }
        self.clean_whitespace(s)
    }

    fn clean_whitespace(&self, s: &str) -> String {
        self.whitespace.replace_all(s.trim(), " ").into_owned()
    }
}
