//! Live item views
//!
//! A [`LiveItem`] reads and writes an item through the tree. Its state is
//! attached to the scope root on first request and kept until the scope is
//! dropped, so every view of one node shares a cache.
//!
//! Reads are cached until invalidated. Two caches exist: the layout (which
//! nodes contribute to which property) and per-property values. The
//! observation tick ([`Scope::flush`]) feeds mutation records to
//! the view state, which drops single values for content edits and
//! the whole layout for structural ones. Writes through a view invalidate
//! every property served by the written nodes at once, so a read in the same
//! turn sees the write.
//!
//! [`Scope::flush`]: crate::Scope::flush

use crate::builder::{Builder, Layout};
use crate::bind::Writer;
use crate::error::BindError;
use crate::item::{self, Item, Property};
use crate::scope::Scope;
use crate::vocab::{self, ItemType, KEY_CONTEXT, KEY_ID, KEY_TYPE};
use mida_dom::{DomTree, MutationRecord, MutationType, NodeId};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::rc::Rc;

/// Cached state of one live view
#[derive(Debug, Default)]
pub(crate) struct ViewState {
    layout: Option<Rc<Layout>>,
    values: HashMap<String, Option<Property>>,
}

/// What a mutation record does to a view
#[derive(Debug, PartialEq)]
enum Effect {
    None,
    Values(Vec<String>),
    Layout,
}

impl ViewState {
    pub(crate) fn invalidate_all(&mut self) {
        self.layout = None;
        self.values.clear();
    }

    #[cfg(test)]
    fn has_layout(&self) -> bool {
        self.layout.is_some()
    }

    /// Apply one batch of records; idempotent
    pub(crate) fn apply(&mut self, tree: &DomTree, records: &[MutationRecord]) {
        let Some(layout) = self.layout.clone() else {
            self.values.clear();
            return;
        };
        for record in records {
            match classify(&layout, tree, record) {
                Effect::None => {}
                Effect::Values(names) => {
                    for name in names {
                        self.values.remove(&name);
                    }
                }
                Effect::Layout => {
                    tracing::trace!(root = %layout.root(), "layout invalidated");
                    self.invalidate_all();
                    return;
                }
            }
        }
    }
}

fn classify(layout: &Layout, tree: &DomTree, record: &MutationRecord) -> Effect {
    match record.mutation_type {
        MutationType::Attributes => {
            let name = record.attribute_name().unwrap_or("");
            if name == vocab::ID {
                let old = record.old_value.as_deref();
                let new = tree.attr(record.target, vocab::ID);
                if old.into_iter().chain(new).any(|id| layout.references_id(id)) {
                    return Effect::Layout;
                }
            }
            if vocab::is_structural_attr(name) && layout.watches(tree, record.target) {
                return Effect::Layout;
            }
            content_effect(layout, tree, record.target)
        }
        MutationType::CharacterData => content_effect(layout, tree, record.target),
        MutationType::ChildList => {
            let changed = record.added_nodes.iter().chain(&record.removed_nodes);
            for &node in changed.clone() {
                if layout.depends_on_subtree(tree, node) {
                    return Effect::Layout;
                }
            }
            if layout.watches(tree, record.target)
                && changed.clone().any(|&n| vocab::subtree_has_microdata(tree, n))
            {
                return Effect::Layout;
            }
            for &node in &record.added_nodes {
                let referenced = |n: NodeId| {
                    tree.element(n)
                        .and_then(|e| e.id())
                        .is_some_and(|id| layout.references_id(id))
                };
                if referenced(node) || tree.descendants(node).any(referenced) {
                    return Effect::Layout;
                }
            }
            content_effect(layout, tree, record.target)
        }
    }
}

/// Properties whose contributing node is `target` or one of its ancestors
fn content_effect(layout: &Layout, tree: &DomTree, target: NodeId) -> Effect {
    let names: Vec<String> = std::iter::once(target)
        .chain(tree.ancestors(target))
        .filter_map(|n| layout.contributions(n))
        .flatten()
        .cloned()
        .collect();
    if names.is_empty() { Effect::None } else { Effect::Values(names) }
}

/// Properties a write to `nodes` makes stale, and whether it replaces
/// another contributing node
fn written_effect(layout: &Layout, tree: &DomTree, nodes: &[NodeId]) -> (Vec<String>, bool) {
    let mut names = Vec::new();
    for &node in nodes {
        if let Effect::Values(found) = content_effect(layout, tree, node) {
            names.extend(found);
        }
        if tree.descendants(node).any(|d| layout.contributions(d).is_some()) {
            return (names, true);
        }
    }
    (names, false)
}

/// Keyed view of one item, reading and writing through the tree
#[derive(Clone, Copy)]
pub struct LiveItem<'s> {
    scope: &'s Scope,
    node: NodeId,
}

impl std::fmt::Debug for LiveItem<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveItem").field("node", &self.node).finish()
    }
}

impl<'s> LiveItem<'s> {
    pub(crate) fn new(scope: &'s Scope, node: NodeId) -> Self {
        Self { scope, node }
    }

    /// Scope root this view is bound to
    pub fn node(&self) -> NodeId {
        self.node
    }

    fn layout(&self) -> Rc<Layout> {
        let cached = self.scope.views.borrow().get(&self.node).and_then(|v| v.layout.clone());
        if let Some(layout) = cached {
            return layout;
        }
        let layout = {
            let doc = self.scope.document.borrow();
            Rc::new(Builder::new(&doc, &self.scope.config).layout(self.node))
        };
        let mut views = self.scope.views.borrow_mut();
        let state = views.entry(self.node).or_default();
        state.layout = Some(Rc::clone(&layout));
        state.values.clear();
        layout
    }

    pub fn item_type(&self) -> Option<ItemType> {
        self.layout().item_type().cloned()
    }

    pub fn types(&self) -> Vec<ItemType> {
        self.layout().types.clone()
    }

    pub fn identity(&self) -> Option<String> {
        self.layout().identity().map(str::to_string)
    }

    /// Current value of a property
    pub fn get(&self, name: &str) -> Option<Property> {
        let layout = self.layout();
        let cached = self
            .scope
            .views
            .borrow()
            .get(&self.node)
            .and_then(|v| v.values.get(name).cloned());
        if let Some(value) = cached {
            return value;
        }
        let value = {
            let doc = self.scope.document.borrow();
            Builder::new(&doc, &self.scope.config).within(self.node).property(layout.nodes(name))
        };
        self.scope
            .views
            .borrow_mut()
            .entry(self.node)
            .or_default()
            .values
            .insert(name.to_string(), value.clone());
        value
    }

    /// Value as JSON, reserved keys included
    pub fn get_json(&self, name: &str) -> Option<Json> {
        match name {
            KEY_TYPE => self.item_type().map(|t| Json::String(t.name().to_string())),
            KEY_CONTEXT => self.item_type().map(|t| Json::String(t.context().to_string())),
            KEY_ID => self.identity().map(Json::String),
            _ => self.get(name).map(|p| p.to_json()),
        }
    }

    /// Whether a property value is served from the cache
    pub fn is_cached(&self, name: &str) -> bool {
        self.scope
            .views
            .borrow()
            .get(&self.node)
            .is_some_and(|v| v.layout.is_some() && v.values.contains_key(name))
    }

    /// Write a property through the tree
    ///
    /// Arrays fan out over the contributing nodes; see [`Writer::write_nodes`].
    pub fn set(&self, name: &str, value: &Json) -> Result<(), BindError> {
        if name.starts_with('@') {
            return Err(BindError::NotWritable {
                property: name.to_string(),
                reason: "reserved keys are derived from attributes".to_string(),
            });
        }
        let layout = self.layout();
        let nodes = layout.nodes(name);
        if nodes.is_empty() {
            return Err(BindError::UnknownProperty(name.to_string()));
        }
        let (stale, nested) = {
            let doc = self.scope.document.borrow();
            written_effect(&layout, doc.tree(), nodes)
        };
        {
            let mut doc = self.scope.document.borrow_mut();
            Writer::new(&self.scope.config).write_nodes(doc.tree_mut(), name, nodes, value)?;
        }
        if let Some(state) = self.scope.views.borrow_mut().get_mut(&self.node) {
            if nested {
                state.invalidate_all();
            } else {
                state.values.remove(name);
                for other in &stale {
                    state.values.remove(other);
                }
            }
        }
        Ok(())
    }

    /// Reserved keys that apply, then property names in discovery order
    pub fn keys(&self) -> Vec<String> {
        let layout = self.layout();
        item::reserved_keys(layout.item_type(), layout.identity())
            .chain(layout.names().map(str::to_string))
            .collect()
    }

    /// Plain JSON object with reserved keys
    pub fn to_serializable(&self) -> Json {
        let layout = self.layout();
        let mut map = item::reserved_map(layout.item_type(), layout.identity());
        for name in layout.names() {
            if let Some(property) = self.get(name) {
                map.insert(name.to_string(), property.to_json());
            }
        }
        Json::Object(map)
    }

    /// Detached copy of the current data
    pub fn snapshot(&self) -> Item {
        let layout = self.layout();
        let mut item = Item::new(self.node, layout.types.clone(), layout.identity.clone());
        for name in layout.names() {
            if let Some(property) = self.get(name) {
                item.properties.insert(name.to_string(), property);
            }
        }
        item
    }
}
