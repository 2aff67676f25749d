use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Validation rule for one customer attribute.
///
/// The downstream customer publishes a catalogue of attribute definitions;
/// the mapper validates inbound values against it. Attributes without a
/// definition pass through untouched.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeRule {
    /// Non-empty string after trimming.
    Text,
    /// Exact match against one of the option strings. An empty option list
    /// accepts any string.
    Dropdown {
        #[serde(default)]
        options: Vec<String>,
    },
    /// Real number within the (optionally open) bounds.
    Range {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
}

/// A rule plus whether the attribute is required for the mapping to succeed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttributeDefinition {
    #[serde(flatten)]
    pub rule: AttributeRule,
    #[serde(default)]
    pub required: bool,
}

/// The attribute-validation document: attribute key -> definition.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeCatalog {
    entries: HashMap<String, AttributeDefinition>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read attribute catalog at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse attribute catalog at {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

impl AttributeCatalog {
    pub fn new(entries: HashMap<String, AttributeDefinition>) -> Self {
        Self { entries }
    }

    /// Load the catalog from a JSON file. Keys starting with `_` are treated
    /// as metadata and skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let data = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: display.clone(),
            source,
        })?;

        let raw: HashMap<String, serde_json::Value> =
            serde_json::from_str(&data).map_err(|source| CatalogError::Parse {
                path: display.clone(),
                source,
            })?;

        let mut entries = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            if key.starts_with('_') {
                continue;
            }
            let def: AttributeDefinition =
                serde_json::from_value(value).map_err(|source| CatalogError::Parse {
                    path: display.clone(),
                    source,
                })?;
            entries.insert(key, def);
        }

        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&AttributeDefinition> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
