//! Schema system
//!
//! A [`Schema`] is created synchronously from its URL, with a validation
//! strategy picked by vocabulary prefix, and loaded asynchronously exactly
//! once. The [`SchemaRegistry`] caches schemas by URL, so every load of a
//! URL returns the same instance and concurrent loads share one fetch.
//!
//! Schema documents are JSON:
//!
//! ```json
//! {"properties": {"name": {"type": "Text", "cardinality": "1"}}}
//! ```
//!
//! A missing `type` means `Text`; a missing `cardinality` means `0..*`.

mod cardinality;
mod registry;
mod validate;

pub use cardinality::Cardinality;
pub use registry::{LoadReport, SchemaRegistry};
pub use validate::{Validation, Violation, ViolationKind};

use crate::error::SchemaError;
use crate::source::Source;
use crate::config::Config;
use indexmap::IndexMap;
use mida_net::{Fetcher, NetError, fetch_ok};
use serde::Deserialize;
use std::cell::{Cell, RefCell};

/// Validation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// Open vocabularies: only explicit type mismatches fail
    Permissive,
    /// Cardinality and type of every defined property are enforced
    Strict,
}

/// Load state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    Pending,
    Loaded,
    Failed,
}

/// Definition of one property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDef {
    /// `Text`, `URL`, `Number`, `Boolean`, `Date`, `DateTime` or a type URL;
    /// `None` accepts any value
    pub value_type: Option<String>,
    pub cardinality: Cardinality,
}

#[derive(Deserialize)]
struct SchemaDocument {
    #[serde(default)]
    properties: IndexMap<String, PropertyDocument>,
}

#[derive(Deserialize)]
struct PropertyDocument {
    #[serde(rename = "type")]
    value_type: Option<String>,
    cardinality: Option<String>,
}

/// Parse a schema document into property definitions
pub fn parse_definitions(json: &str) -> Result<IndexMap<String, PropertyDef>, String> {
    let doc: SchemaDocument = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let mut defs = IndexMap::with_capacity(doc.properties.len());
    for (name, prop) in doc.properties {
        let cardinality = match prop.cardinality.as_deref() {
            None => Cardinality::ANY,
            Some(text) => Cardinality::parse(text)
                .ok_or_else(|| format!("property `{name}` has invalid cardinality `{text}`"))?,
        };
        let value_type = prop.value_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        defs.insert(name, PropertyDef { value_type, cardinality });
    }
    Ok(defs)
}

/// One vocabulary type, loaded once
#[derive(Debug)]
pub struct Schema {
    url: String,
    kind: SchemaKind,
    state: Cell<SchemaState>,
    definitions: RefCell<IndexMap<String, PropertyDef>>,
    loaded: smol::lock::OnceCell<Result<(), SchemaError>>,
}

impl Schema {
    pub fn new(url: &str, kind: SchemaKind) -> Self {
        Self {
            url: url.to_string(),
            kind,
            state: Cell::new(SchemaState::Pending),
            definitions: RefCell::new(IndexMap::new()),
            loaded: smol::lock::OnceCell::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    pub fn state(&self) -> SchemaState {
        self.state.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == SchemaState::Loaded
    }

    /// Definition of a property, once loaded
    pub fn property(&self, name: &str) -> Option<PropertyDef> {
        self.definitions.borrow().get(name).cloned()
    }

    /// Defined property names in document order
    pub fn property_names(&self) -> Vec<String> {
        self.definitions.borrow().keys().cloned().collect()
    }

    /// Fill definitions directly, without fetching
    pub fn load_from_str(&self, json: &str) -> Result<(), SchemaError> {
        let defs = parse_definitions(json).map_err(|message| SchemaError::Parse {
            url: self.url.clone(),
            message,
        })?;
        *self.definitions.borrow_mut() = defs;
        self.state.set(SchemaState::Loaded);
        Ok(())
    }

    /// Fetch and parse, at most once per instance
    ///
    /// Concurrent callers wait on the same attempt. A failed attempt is
    /// remembered; clearing the registry is the way to try again.
    pub async fn load(&self, fetcher: &dyn Fetcher) -> Result<(), SchemaError> {
        self.loaded
            .get_or_init(|| async {
                if self.is_loaded() {
                    return Ok(());
                }
                let result = self.fetch_and_parse(fetcher).await;
                if let Err(err) = &result {
                    tracing::warn!(url = %self.url, error = %err, "schema load failed");
                    self.state.set(SchemaState::Failed);
                }
                result
            })
            .await
            .clone()
    }

    async fn fetch_and_parse(&self, fetcher: &dyn Fetcher) -> Result<(), SchemaError> {
        tracing::debug!(url = %self.url, "fetching schema");
        let response = fetch_ok(fetcher, &self.url)
            .await
            .map_err(|source| self.fetch_error(source))?;
        let body = response.text().map_err(|source| self.fetch_error(source))?;
        self.load_from_str(&body)?;
        tracing::info!(
            url = %self.url,
            properties = self.definitions.borrow().len(),
            "schema loaded"
        );
        Ok(())
    }

    fn fetch_error(&self, source: NetError) -> SchemaError {
        SchemaError::Fetch { url: self.url.clone(), source }
    }

    /// Validate a source
    ///
    /// Fails only when the schema is still pending. A schema that failed
    /// to load passes everything through.
    pub fn validate(
        &self,
        source: &Source<'_>,
        config: &Config,
    ) -> Result<Validation, SchemaError> {
        let data = source.to_object(config);
        match self.state() {
            SchemaState::Pending => Err(SchemaError::NotLoaded { url: self.url.clone() }),
            SchemaState::Failed => Ok(Validation::Valid(validate::tag(data, &self.url))),
            SchemaState::Loaded => Ok(validate::check(self, data)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mida_net::StaticFetcher;
    use serde_json::json;

    const PERSON: &str = r#"{"properties": {
        "name": {"type": "Text", "cardinality": "1"},
        "email": {"cardinality": "0..1"},
        "age": {"type": "Number"}
    }}"#;

    #[test]
    fn test_parse_definitions_defaults() {
        let defs = parse_definitions(PERSON).unwrap();
        assert_eq!(defs["name"].cardinality, Cardinality::EXACTLY_ONE);
        assert_eq!(defs["name"].value_type.as_deref(), Some("Text"));
        assert_eq!(defs["email"].value_type, None);
        assert_eq!(defs["age"].cardinality, Cardinality::ANY);
        assert!(parse_definitions(r#"{"properties": {"x": {"cardinality": "lots"}}}"#).is_err());
        assert!(parse_definitions("not json").is_err());
    }

    #[test]
    fn test_pending_schema_refuses_validation() {
        let schema = Schema::new("https://vocab.test/Person", SchemaKind::Strict);
        let data = json!({"name": "Ada"});
        let err = schema.validate(&Source::Object(&data), &Config::default()).unwrap_err();
        assert_eq!(err, SchemaError::NotLoaded { url: "https://vocab.test/Person".into() });
    }

    #[test]
    fn test_failed_schema_passes_through() {
        let fetcher = StaticFetcher::new();
        let schema = Schema::new("https://vocab.test/Gone", SchemaKind::Strict);
        let err = smol::block_on(schema.load(&fetcher)).unwrap_err();
        assert_eq!(err.kind(), "fetch");
        assert_eq!(schema.state(), SchemaState::Failed);

        let data = json!({"anything": 1});
        let result = schema.validate(&Source::Object(&data), &Config::default()).unwrap();
        assert!(result.is_valid());
    }

    #[test]
    fn test_load_happens_once() {
        let fetcher = StaticFetcher::new();
        fetcher.insert("https://vocab.test/Person", PERSON);
        let schema = Schema::new("https://vocab.test/Person", SchemaKind::Strict);
        smol::block_on(schema.load(&fetcher)).unwrap();
        smol::block_on(schema.load(&fetcher)).unwrap();
        assert_eq!(fetcher.request_count("https://vocab.test/Person"), 1);
        assert_eq!(schema.property_names(), vec!["name", "email", "age"]);
    }
}
