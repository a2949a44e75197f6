//! Item graph builder
//!
//! Building happens in two steps. [`Builder::layout`] walks the tree and
//! records which nodes contribute to which property name; values are then
//! read from those nodes. Live views cache the layout and the values
//! separately, so a text edit only re-reads one property.
//!
//! The walk stops at nested scopes: a scoped property node is the value,
//! and its interior is walked when its own item is built. `itemref`
//! targets are pulled in through a visited set seeded with the root, so
//! duplicate ids collapse and reference cycles end at the first repeat.

use crate::config::Config;
use crate::extract;
use crate::item::{Item, Property, Value};
use crate::vocab::{self, ItemType};
use indexmap::IndexMap;
use mida_dom::{Document, DomTree, NodeId, template};
use std::collections::{HashMap, HashSet};

/// Which nodes make up an item
#[derive(Debug, Clone)]
pub struct Layout {
    pub(crate) root: NodeId,
    pub(crate) types: Vec<ItemType>,
    pub(crate) identity: Option<String>,
    /// Contributing nodes per property, in discovery order
    pub(crate) props: IndexMap<String, Vec<NodeId>>,
    pub(crate) node_props: HashMap<NodeId, Vec<String>>,
    /// Root plus every itemref target that was walked
    pub(crate) watched: Vec<NodeId>,
    pub(crate) ref_ids: HashSet<String>,
}

impl Layout {
    fn new(root: NodeId, types: Vec<ItemType>, identity: Option<String>) -> Self {
        Self {
            root,
            types,
            identity,
            props: IndexMap::new(),
            node_props: HashMap::new(),
            watched: vec![root],
            ref_ids: HashSet::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn item_type(&self) -> Option<&ItemType> {
        self.types.first()
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Property names in discovery order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.props.keys().map(String::as_str)
    }

    /// Nodes contributing to `name`
    pub fn nodes(&self, name: &str) -> &[NodeId] {
        self.props.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Property names a node contributes to
    pub fn contributions(&self, node: NodeId) -> Option<&[String]> {
        self.node_props.get(&node).map(Vec::as_slice)
    }

    pub fn references_id(&self, id: &str) -> bool {
        self.ref_ids.contains(id)
    }

    /// Whether `node` lies inside the root or a walked itemref target
    pub fn watches(&self, tree: &DomTree, node: NodeId) -> bool {
        self.watched.iter().any(|&w| tree.contains(w, node))
    }

    /// Whether any node the item depends on lies inside `subtree`
    pub fn depends_on_subtree(&self, tree: &DomTree, subtree: NodeId) -> bool {
        self.watched.iter().chain(self.node_props.keys()).any(|&n| tree.contains(subtree, n))
    }
}

/// Extracts items from a document
pub struct Builder<'d> {
    doc: &'d Document,
    config: &'d Config,
    /// Items currently being built, innermost last
    stack: Vec<NodeId>,
}

impl<'d> Builder<'d> {
    pub fn new(doc: &'d Document, config: &'d Config) -> Self {
        Self { doc, config, stack: Vec::new() }
    }

    /// Treat `root` as already being built, for reading single properties
    pub fn within(mut self, root: NodeId) -> Self {
        self.stack.push(root);
        self
    }

    /// Record which nodes contribute to which property of `root`
    pub fn layout(&self, root: NodeId) -> Layout {
        let tree = self.doc.tree();
        let layout = Layout::new(
            root,
            vocab::item_types(tree, root),
            vocab::identity(tree, root, self.doc.base_url()),
        );
        let mut walk = Walk { doc: self.doc, layout, visited: HashSet::from([root]) };
        walk.children(root);
        walk.refs(root);
        walk.layout
    }

    /// Build the full item rooted at a scoped node
    pub fn build(&mut self, root: NodeId) -> Item {
        tracing::trace!(%root, "extracting item");
        self.stack.push(root);
        let layout = self.layout(root);
        let item = self.item_from(&layout);
        self.stack.pop();
        item
    }

    /// Read every property of a layout
    pub fn item_from(&mut self, layout: &Layout) -> Item {
        let mut item = Item::new(layout.root, layout.types.clone(), layout.identity.clone());
        for (name, nodes) in &layout.props {
            if let Some(property) = self.property(nodes) {
                item.properties.insert(name.clone(), property);
            }
        }
        item
    }

    /// Values of a set of contributing nodes, promoted per contribution count
    pub fn property(&mut self, nodes: &[NodeId]) -> Option<Property> {
        Property::from_values(nodes.iter().filter_map(|&n| self.value(n)))
    }

    /// Value a single contributing node produces
    pub fn value(&mut self, node: NodeId) -> Option<Value> {
        let doc = self.doc;
        let tree = doc.tree();
        if !vocab::is_scope(tree, node) {
            return Some(Value::Text(extract::read(tree, node, self.config.trim_values)));
        }
        if !vocab::is_authoritative(tree, node) && tree.has_attr(node, vocab::ITEMID) {
            if let Some(identity) = vocab::identity(tree, node, doc.base_url()) {
                return Some(Value::Reference { node, identity });
            }
        }
        if self.stack.contains(&node) {
            tracing::debug!(%node, "nested item refers back to itself, omitted");
            return None;
        }
        Some(Value::Item(Box::new(self.build(node))))
    }
}

struct Walk<'d> {
    doc: &'d Document,
    layout: Layout,
    visited: HashSet<NodeId>,
}

impl Walk<'_> {
    fn children(&mut self, parent: NodeId) {
        let doc = self.doc;
        let tree = doc.tree();
        for child in tree.child_elements(parent) {
            self.visit(child);
        }
    }

    fn visit(&mut self, node: NodeId) {
        let doc = self.doc;
        let tree = doc.tree();
        if template::is_template(tree, node) {
            return;
        }
        if vocab::is_property(tree, node) {
            self.contribute(node);
        }
        if !vocab::is_scope(tree, node) {
            self.children(node);
        }
    }

    fn contribute(&mut self, node: NodeId) {
        if node == self.layout.root || self.layout.node_props.contains_key(&node) {
            return;
        }
        let names = vocab::property_names(self.doc.tree(), node);
        for name in &names {
            self.layout.props.entry(name.clone()).or_default().push(node);
        }
        self.layout.node_props.insert(node, names);
    }

    fn refs(&mut self, owner: NodeId) {
        let doc = self.doc;
        let tree = doc.tree();
        for id in vocab::itemref_ids(tree, owner) {
            let target = doc.get_element_by_id(&id);
            self.layout.ref_ids.insert(id);
            let Some(target) = target else { continue };
            if !self.visited.insert(target) {
                tracing::debug!(owner = %owner, %target, "itemref cycle, contribution omitted");
                continue;
            }
            if !vocab::is_live(tree, target) {
                continue;
            }
            self.layout.watched.push(target);

            let scoped = vocab::is_scope(tree, target);
            if vocab::is_property(tree, target) {
                self.contribute(target);
                if !scoped {
                    self.children(target);
                }
            } else if scoped {
                self.children(target);
                self.refs(target);
            } else {
                self.children(target);
            }
        }
    }
}
