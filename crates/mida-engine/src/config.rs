//! Engine configuration

use serde::Deserialize;

/// Engine configuration
///
/// Every field has a default, so a host can deserialize a partial JSON
/// document or start from [`Config::default`] and adjust with the
/// `with_*` methods.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Trailing `itemprop` marker for array bindings in templates
    pub array_marker: String,
    /// Opening interpolation delimiter
    pub placeholder_open: String,
    /// Closing interpolation delimiter
    pub placeholder_close: String,
    /// Container attribute naming the source item type for auto-sync
    pub source_type_attr: String,
    /// Container attribute naming the element id that bounds the source set
    pub source_root_attr: String,
    /// Vocabularies validated by the permissive strategy
    pub permissive_prefixes: Vec<String>,
    /// Upper bound on observation rounds in one flush
    pub max_flush_rounds: usize,
    /// Trim whitespace around extracted text values
    pub trim_values: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            array_marker: "[]".to_string(),
            placeholder_open: "{{".to_string(),
            placeholder_close: "}}".to_string(),
            source_type_attr: "data-itemtype".to_string(),
            source_root_attr: "data-itemsource".to_string(),
            permissive_prefixes: vec![
                "http://schema.org/".to_string(),
                "https://schema.org/".to_string(),
            ],
            max_flush_rounds: 8,
            trim_values: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different array marker
    pub fn with_array_marker(mut self, marker: &str) -> Self {
        self.array_marker = marker.to_string();
        self
    }

    /// Use different interpolation delimiters
    pub fn with_placeholders(mut self, open: &str, close: &str) -> Self {
        self.placeholder_open = open.to_string();
        self.placeholder_close = close.to_string();
        self
    }

    /// Treat another vocabulary as permissive
    pub fn with_permissive_prefix(mut self, prefix: &str) -> Self {
        self.permissive_prefixes.push(prefix.to_string());
        self
    }

    /// Keep extracted text exactly as found
    pub fn with_raw_values(mut self) -> Self {
        self.trim_values = false;
        self
    }

    /// Parse a configuration from JSON, falling back to defaults per field
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
