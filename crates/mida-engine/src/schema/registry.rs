//! Schema cache
//!
//! One instance per URL until cleared. Strategies are registered per URL
//! prefix; the longest matching prefix wins and unknown vocabularies are
//! strict.

use super::{Schema, SchemaKind};
use crate::config::Config;
use crate::error::SchemaError;
use mida_net::Fetcher;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Result of loading several schemas
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub loaded: usize,
    pub failed: usize,
    pub total: usize,
    pub errors: Vec<SchemaError>,
}

/// URL-keyed schema cache with prefix-dispatched strategies
pub struct SchemaRegistry {
    fetcher: Rc<dyn Fetcher>,
    strategies: RefCell<Vec<(String, SchemaKind)>>,
    cache: RefCell<HashMap<String, Rc<Schema>>>,
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("strategies", &self.strategies.borrow())
            .field("schemas", &self.cache.borrow().len())
            .finish()
    }
}

impl SchemaRegistry {
    /// Registry with the configured permissive prefixes
    pub fn new(fetcher: Rc<dyn Fetcher>, config: &Config) -> Self {
        let strategies = config
            .permissive_prefixes
            .iter()
            .map(|p| (p.clone(), SchemaKind::Permissive))
            .collect();
        Self {
            fetcher,
            strategies: RefCell::new(strategies),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Use `kind` for every schema URL starting with `prefix`
    ///
    /// Only affects schemas created afterwards.
    pub fn register(&self, prefix: &str, kind: SchemaKind) {
        let mut strategies = self.strategies.borrow_mut();
        strategies.retain(|(p, _)| p != prefix);
        strategies.push((prefix.to_string(), kind));
    }

    /// Strategy for a schema URL
    pub fn kind_for(&self, url: &str) -> SchemaKind {
        self.strategies
            .borrow()
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(SchemaKind::Strict, |&(_, kind)| kind)
    }

    /// Cached schema for a URL, created (pending) if needed
    pub fn schema(&self, url: &str) -> Rc<Schema> {
        let url = url.trim();
        if let Some(schema) = self.cache.borrow().get(url) {
            return Rc::clone(schema);
        }
        let schema = Rc::new(Schema::new(url, self.kind_for(url)));
        tracing::trace!(url, kind = ?schema.kind(), "schema created");
        self.cache.borrow_mut().insert(url.to_string(), Rc::clone(&schema));
        schema
    }

    /// Cached schema without creating one
    pub fn get(&self, url: &str) -> Option<Rc<Schema>> {
        self.cache.borrow().get(url.trim()).cloned()
    }

    /// Load a schema once and return the cached instance
    pub async fn load(&self, url: &str) -> Result<Rc<Schema>, SchemaError> {
        let schema = self.schema(url);
        if schema.is_loaded() {
            tracing::trace!(url, "schema cache hit");
        }
        let fetcher = Rc::clone(&self.fetcher);
        schema.load(fetcher.as_ref()).await?;
        Ok(schema)
    }

    /// Load several schemas one after another
    pub async fn load_all<I>(&self, urls: I) -> LoadReport
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut report = LoadReport::default();
        for url in urls {
            report.total += 1;
            match self.load(url.as_ref()).await {
                Ok(_) => report.loaded += 1,
                Err(err) => {
                    report.failed += 1;
                    report.errors.push(err);
                }
            }
        }
        tracing::debug!(
            loaded = report.loaded,
            failed = report.failed,
            total = report.total,
            "schemas loaded"
        );
        report
    }

    /// Forget every schema; in-flight loads finish on their own instances
    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mida_net::StaticFetcher;

    const BODY: &str = r#"{"properties": {"name": {"cardinality": "1"}}}"#;

    fn registry(fetcher: &Rc<StaticFetcher>) -> SchemaRegistry {
        let dyn_fetcher: Rc<dyn Fetcher> = fetcher.clone();
        SchemaRegistry::new(dyn_fetcher, &Config::default())
    }

    #[test]
    fn test_strategy_by_prefix() {
        let fetcher = Rc::new(StaticFetcher::new());
        let reg = registry(&fetcher);
        assert_eq!(reg.kind_for("https://schema.org/Person"), SchemaKind::Permissive);
        assert_eq!(reg.kind_for("https://vocab.test/Person"), SchemaKind::Strict);

        reg.register("https://schema.org/strict/", SchemaKind::Strict);
        assert_eq!(reg.kind_for("https://schema.org/strict/Thing"), SchemaKind::Strict);
    }

    #[test]
    fn test_same_instance_per_url() {
        let fetcher = Rc::new(StaticFetcher::new());
        fetcher.insert("https://vocab.test/Person", BODY);
        let reg = registry(&fetcher);

        let a = smol::block_on(reg.load("https://vocab.test/Person")).unwrap();
        let b = smol::block_on(reg.load("https://vocab.test/Person")).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(fetcher.request_count("https://vocab.test/Person"), 1);
    }

    #[test]
    fn test_concurrent_loads_coalesce() {
        let fetcher = Rc::new(StaticFetcher::new().with_latency(3));
        fetcher.insert("https://vocab.test/Person", BODY);
        let reg = registry(&fetcher);

        let (a, b) = smol::block_on(smol::future::zip(
            reg.load("https://vocab.test/Person"),
            reg.load("https://vocab.test/Person"),
        ));
        assert!(Rc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(fetcher.request_count("https://vocab.test/Person"), 1);
    }

    #[test]
    fn test_clear_allows_new_load() {
        let fetcher = Rc::new(StaticFetcher::new());
        fetcher.insert("https://vocab.test/Person", BODY);
        let reg = registry(&fetcher);

        let first = smol::block_on(reg.load("https://vocab.test/Person")).unwrap();
        reg.clear();
        assert!(reg.is_empty());
        let second = smol::block_on(reg.load("https://vocab.test/Person")).unwrap();
        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(fetcher.request_count("https://vocab.test/Person"), 2);
    }

    #[test]
    fn test_load_all_report() {
        let fetcher = Rc::new(StaticFetcher::new());
        fetcher.insert("https://vocab.test/A", BODY);
        fetcher.insert("https://vocab.test/Bad", "{");
        let reg = registry(&fetcher);

        let report = smol::block_on(reg.load_all([
            "https://vocab.test/A",
            "https://vocab.test/Bad",
            "https://vocab.test/Missing",
        ]));
        assert_eq!((report.loaded, report.failed, report.total), (1, 2, 3));
        assert_eq!(report.errors[0].kind(), "parse");
        assert_eq!(report.errors[1].kind(), "fetch");
    }
}
