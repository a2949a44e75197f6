//! Binding manager
//!
//! Owns one [`Scope`] per attached document. Scopes share the engine
//! configuration, the fetcher and the schema registry.

use crate::config::Config;
use crate::schema::SchemaRegistry;
use crate::scope::Scope;
use indexmap::IndexMap;
use mida_dom::Document;
use mida_net::Fetcher;
use std::rc::Rc;

/// Handle to an attached document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// Attaches documents and hands out their scopes
pub struct Binder {
    config: Rc<Config>,
    fetcher: Rc<dyn Fetcher>,
    schemas: Rc<SchemaRegistry>,
    scopes: IndexMap<ScopeId, Scope>,
    next_id: u32,
}

impl std::fmt::Debug for Binder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binder")
            .field("config", &self.config)
            .field("schemas", &self.schemas)
            .field("scopes", &self.scopes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Binder {
    pub fn new(config: Config, fetcher: Rc<dyn Fetcher>) -> Self {
        let schemas = Rc::new(SchemaRegistry::new(Rc::clone(&fetcher), &config));
        Self {
            config: Rc::new(config),
            fetcher,
            schemas,
            scopes: IndexMap::new(),
            next_id: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registry shared by every scope
    pub fn schemas(&self) -> &Rc<SchemaRegistry> {
        &self.schemas
    }

    /// Take ownership of a document and bind it
    pub fn attach(&mut self, document: Document) -> ScopeId {
        let id = ScopeId(self.next_id);
        self.next_id += 1;
        let scope = Scope::new(
            document,
            Rc::clone(&self.config),
            Rc::clone(&self.schemas),
            Rc::clone(&self.fetcher),
        );
        tracing::info!(%id, "document attached");
        self.scopes.insert(id, scope);
        id
    }

    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(&id)
    }

    /// Drop a scope's bindings and return its document
    pub fn detach(&mut self, id: ScopeId) -> Option<Document> {
        let scope = self.scopes.shift_remove(&id)?;
        tracing::info!(%id, "document detached");
        Some(scope.into_document())
    }

    /// Attached scopes in attach order
    pub fn scopes(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.scopes.iter().map(|(&id, scope)| (id, scope))
    }

    /// Flush every scope; returns the records processed
    pub fn flush_all(&self) -> usize {
        self.scopes.values().map(Scope::flush).sum()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
