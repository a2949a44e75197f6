//! Document scope
//!
//! A [`Scope`] owns one document together with everything bound to it: the
//! live view states, the collection registry and the auto-sync containers.
//! Mutations are recorded by the tree and only observed when [`Scope::flush`]
//! runs, which is the observation tick.

use crate::bind::Writer;
use crate::builder::Builder;
use crate::collection::Collection;
use crate::config::Config;
use crate::error::{BindError, RenderError, SchemaError};
use crate::item::Item;
use crate::live::{LiveItem, ViewState};
use crate::notify::Notification;
use crate::schema::{LoadReport, SchemaRegistry, Validation};
use crate::source::{self, Source};
use crate::template::{AutoSync, Template, render_data};
use crate::vocab;
use mida_dom::{Document, DomEvent, EventListener, MutationRecord, NodeId, dispatch_event};
use mida_net::Fetcher;
use serde_json::Value as Json;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

/// One document and its bindings
pub struct Scope {
    pub(crate) config: Rc<Config>,
    pub(crate) document: RefCell<Document>,
    pub(crate) views: RefCell<HashMap<NodeId, ViewState>>,
    collection: RefCell<Collection>,
    syncs: RefCell<Vec<AutoSync>>,
    schemas: Rc<SchemaRegistry>,
    pub(crate) fetcher: Rc<dyn Fetcher>,
    flushing: Cell<bool>,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("document", &self.document)
            .field("views", &self.views.borrow().len())
            .field("items", &self.collection.borrow().len())
            .field("syncs", &self.syncs.borrow().len())
            .finish()
    }
}

impl Scope {
    /// Bind a document; records made before this point are discarded
    pub fn new(
        mut document: Document,
        config: Rc<Config>,
        schemas: Rc<SchemaRegistry>,
        fetcher: Rc<dyn Fetcher>,
    ) -> Self {
        document.take_records();
        let collection = Collection::scan(document.tree());
        tracing::debug!(url = document.url(), items = collection.len(), "scope attached");
        Self {
            config,
            document: RefCell::new(document),
            views: RefCell::new(HashMap::new()),
            collection: RefCell::new(collection),
            syncs: RefCell::new(Vec::new()),
            schemas,
            fetcher,
            flushing: Cell::new(false),
        }
    }

    /// Scope with its own schema registry
    pub fn standalone(document: Document, config: Config, fetcher: Rc<dyn Fetcher>) -> Self {
        let schemas = Rc::new(SchemaRegistry::new(Rc::clone(&fetcher), &config));
        Self::new(document, Rc::new(config), schemas, fetcher)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn schemas(&self) -> &Rc<SchemaRegistry> {
        &self.schemas
    }

    /// Borrow the document
    pub fn document(&self) -> Ref<'_, Document> {
        self.document.borrow()
    }

    /// Borrow the document mutably; changes are observed at the next flush
    pub fn document_mut(&self) -> RefMut<'_, Document> {
        self.document.borrow_mut()
    }

    pub fn with_document<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.document.borrow())
    }

    pub fn with_document_mut<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut self.document.borrow_mut())
    }

    /// Give the document back, dropping every binding
    pub fn into_document(self) -> Document {
        self.document.into_inner()
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    /// Live view of a scoped element
    ///
    /// The view state is created on first request and shared by every
    /// later view of the same node.
    pub fn item(&self, node: NodeId) -> Option<LiveItem<'_>> {
        let scoped = {
            let doc = self.document.borrow();
            vocab::is_scope(doc.tree(), node)
        };
        if !scoped {
            return None;
        }
        self.views.borrow_mut().entry(node).or_default();
        Some(LiveItem::new(self, node))
    }

    /// Live view of the scoped element with the given `id`
    pub fn item_by_id(&self, id: &str) -> Option<LiveItem<'_>> {
        let node = self.document.borrow().get_element_by_id(id)?;
        self.item(node)
    }

    /// Fresh, uncached extraction
    pub fn extract(&self, node: NodeId) -> Option<Item> {
        let doc = self.document.borrow();
        if !vocab::is_scope(doc.tree(), node) {
            return None;
        }
        Some(Builder::new(&doc, &self.config).build(node))
    }

    /// Bind an object into a scoped element's property nodes
    ///
    /// Keys the element does not declare are ignored. Views of the element
    /// pick the new content up at the next flush.
    pub fn bind(&self, node: NodeId, data: &Json) -> Result<(), BindError> {
        let mut doc = self.document.borrow_mut();
        if !vocab::is_scope(doc.tree(), node) {
            return Err(BindError::NotAnItem(node));
        }
        Writer::new(&self.config).bind_scope(doc.tree_mut(), node, data)
    }

    /// Top-level items as of the last flush
    pub fn collection(&self) -> Ref<'_, Collection> {
        self.collection.borrow()
    }

    /// Live views of the top-level items, resolved as they are consumed
    pub fn items(&self) -> impl Iterator<Item = LiveItem<'_>> + '_ {
        let nodes = self.collection.borrow().as_slice().to_vec();
        nodes.into_iter().filter_map(move |n| self.item(n))
    }

    /// Top-level item by position
    pub fn item_at(&self, index: usize) -> Option<LiveItem<'_>> {
        let node = self.collection.borrow().get(index)?;
        self.item(node)
    }

    /// Top-level item by `id`
    pub fn item_by_key(&self, key: &str) -> Option<LiveItem<'_>> {
        let node = self.collection.borrow().get_by_key(key)?;
        self.item(node)
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Number of records waiting for the next flush
    pub fn pending_records(&self) -> usize {
        self.document.borrow().tree().pending_records()
    }

    /// Deliver pending mutation records to views, collection and auto-syncs
    ///
    /// Repeats while delivery produces new records, up to the configured
    /// number of rounds; records produced by the last round wait for the
    /// next flush. A flush started while one is running returns
    /// immediately. Returns the number of records processed.
    pub fn flush(&self) -> usize {
        if self.flushing.replace(true) {
            tracing::trace!("flush already running");
            return 0;
        }
        let mut processed = 0;
        let mut rounds = 0;
        loop {
            let records = self.document.borrow_mut().take_records();
            if records.is_empty() {
                break;
            }
            rounds += 1;
            processed += records.len();
            self.deliver(&records);
            self.reconcile_syncs(&records);
            if rounds >= self.config.max_flush_rounds {
                tracing::warn!(rounds, "flush round limit reached, remaining records deferred");
                break;
            }
        }
        self.flushing.set(false);
        processed
    }

    fn deliver(&self, records: &[MutationRecord]) {
        let doc = self.document.borrow();
        let mut views = self.views.borrow_mut();
        let before = views.len();
        views.retain(|&node, _| doc.tree().is_connected(node));
        if views.len() < before {
            tracing::trace!(dropped = before - views.len(), "detached view states dropped");
        }
        for state in views.values_mut() {
            state.apply(doc.tree(), records);
        }
        self.collection.borrow_mut().apply(doc.tree(), records);
    }

    fn reconcile_syncs(&self, records: &[MutationRecord]) {
        let mut syncs = self.syncs.borrow_mut();
        if syncs.is_empty() {
            return;
        }
        let mut doc = self.document.borrow_mut();
        for sync in syncs.iter_mut() {
            if !sync.is_relevant(doc.tree(), records) {
                continue;
            }
            if let Err(err) = sync.reconcile(&mut doc, &self.config) {
                tracing::warn!(container = %sync.container(), error = %err, "auto-sync failed");
            }
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn add_event_listener(&self, node: NodeId, event_type: &str, listener: EventListener) {
        self.document.borrow_mut().add_event_listener(node, event_type, listener);
    }

    /// Dispatch an event through the document; listeners may read it
    pub fn dispatch(&self, event: DomEvent) -> usize {
        dispatch_event(&self.document, event)
    }

    pub(crate) fn notify(&self, notification: &Notification, target: NodeId) -> usize {
        self.dispatch(notification.to_event(target))
    }

    // ------------------------------------------------------------------
    // Schemas
    // ------------------------------------------------------------------

    /// Every item type URL used by live items, in document order
    pub fn document_types(&self) -> Vec<String> {
        let doc = self.document.borrow();
        let tree = doc.tree();
        let mut types: Vec<String> = Vec::new();
        for node in tree.descendants(tree.root()) {
            if !vocab::is_scope(tree, node) || !vocab::is_live(tree, node) {
                continue;
            }
            for t in vocab::item_types(tree, node) {
                if !types.iter().any(|u| u == t.url()) {
                    types.push(t.url().to_string());
                }
            }
        }
        types
    }

    /// Load schemas and report through notifications at the document node
    ///
    /// One `schemaerror` per failure, then one `schemasloaded`.
    pub async fn load_schemas<I>(&self, urls: I) -> LoadReport
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let report = self.schemas.load_all(urls).await;
        let root = self.document.borrow().root();
        for err in &report.errors {
            self.notify(&Notification::schema_error(err), root);
        }
        self.notify(&Notification::loaded(&report), root);
        report
    }

    /// Load the schema of every type used in the document
    pub async fn load_document_schemas(&self) -> LoadReport {
        let types = self.document_types();
        self.load_schemas(types).await
    }

    /// Validate against a schema, emitting one `invaliddata` per violation
    ///
    /// Notifications start at `origin`, or the document node. A schema
    /// that was never loaded is pending and fails with `NotLoaded`.
    pub fn validate(
        &self,
        schema_url: &str,
        source: &Source<'_>,
        origin: Option<NodeId>,
    ) -> Result<Validation, SchemaError> {
        let schema = self.schemas.schema(schema_url);
        let result = schema.validate(source, &self.config)?;
        if let Validation::Invalid(violations) = &result {
            let target = origin.unwrap_or_else(|| self.document.borrow().root());
            for violation in violations {
                self.notify(&Notification::invalid(violation), target);
            }
        }
        Ok(result)
    }

    /// Validate the current data of an item node
    pub fn validate_item(
        &self,
        schema_url: &str,
        node: NodeId,
    ) -> Result<Option<Validation>, SchemaError> {
        let Some(item) = self.extract(node) else { return Ok(None) };
        self.validate(schema_url, &Source::Item(&item), Some(node)).map(Some)
    }

    /// Normalized entries of a form in this document
    pub fn form_data(&self, form: NodeId) -> Json {
        let doc = self.document.borrow();
        Json::Object(source::normalize_form(doc.tree(), form, &self.config))
    }

    // ------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------

    /// Render a template node against a source; the clone is detached
    pub fn render(&self, source: &Source<'_>, template: NodeId) -> Result<NodeId, RenderError> {
        let data = Json::Object(source.to_object(&self.config));
        let mut doc = self.document.borrow_mut();
        let template = Template::from_node(doc.tree(), template)?;
        render_data(doc.tree_mut(), &data, &template, &self.config)
    }

    /// Keep a container's clones in sync with its source type
    ///
    /// Renders the initial set right away and returns the number of clones.
    /// Registering a container again replaces its previous binding.
    pub fn auto_sync(&self, container: NodeId) -> Result<usize, RenderError> {
        let mut doc = self.document.borrow_mut();
        let mut sync = AutoSync::from_container(doc.tree(), container, &self.config)?;
        let mut syncs = self.syncs.borrow_mut();
        if let Some(pos) = syncs.iter().position(|s| s.container() == container) {
            let old = syncs.remove(pos);
            for node in old.rendered() {
                doc.tree_mut().remove(node)?;
            }
        }
        sync.reconcile(&mut doc, &self.config)?;
        let count = sync.len();
        syncs.push(sync);
        Ok(count)
    }

    /// Clones currently rendered into an auto-sync container
    pub fn rendered(&self, container: NodeId) -> Option<Vec<NodeId>> {
        self.syncs
            .borrow()
            .iter()
            .find(|s| s.container() == container)
            .map(AutoSync::rendered)
    }
}
