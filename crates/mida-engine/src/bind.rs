//! Writing values into the tree
//!
//! [`Writer`] is the single path from data to markup. Live views use it for
//! property writes, the template renderer for binding clones, and reference
//! resolution for presenting a fetched item in its source node.

use crate::config::Config;
use crate::error::BindError;
use crate::extract;
use crate::template::interpolate;
use crate::vocab;
use mida_dom::{DomTree, NodeId, template};
use serde_json::Value as Json;

/// Binds JSON values to property nodes
pub struct Writer<'c> {
    config: &'c Config,
    interpolate: bool,
}

impl<'c> Writer<'c> {
    /// Writer for property writes: no placeholder substitution
    pub fn new(config: &'c Config) -> Self {
        Self { config, interpolate: false }
    }

    /// Writer for template instantiation
    pub fn for_templates(config: &'c Config) -> Self {
        Self { config, interpolate: true }
    }

    /// Write a property value across its contributing nodes
    ///
    /// An array fans out element by element. Values beyond the number of
    /// nodes are dropped; nodes beyond the number of values keep their
    /// content. A scalar goes to the first node.
    pub fn write_nodes(
        &self,
        tree: &mut DomTree,
        property: &str,
        nodes: &[NodeId],
        value: &Json,
    ) -> Result<(), BindError> {
        let Some(&first) = nodes.first() else {
            return Err(BindError::UnknownProperty(property.to_string()));
        };
        match value {
            Json::Array(values) => {
                if values.len() > nodes.len() {
                    tracing::warn!(
                        property,
                        values = values.len(),
                        nodes = nodes.len(),
                        "more values than nodes, extra values ignored"
                    );
                }
                for (&node, v) in nodes.iter().zip(values) {
                    self.write_node(tree, property, node, v)?;
                }
                Ok(())
            }
            _ => self.write_node(tree, property, first, value),
        }
    }

    /// Write one value into one property node
    pub fn write_node(
        &self,
        tree: &mut DomTree,
        property: &str,
        node: NodeId,
        value: &Json,
    ) -> Result<(), BindError> {
        if vocab::is_scope(tree, node) {
            return match value {
                Json::Object(_) => self.bind_scope(tree, node, value),
                _ => Err(BindError::NotWritable {
                    property: property.to_string(),
                    reason: "a nested item only accepts an object".to_string(),
                }),
            };
        }
        match value {
            Json::Object(_) | Json::Array(_) => Err(BindError::NotWritable {
                property: property.to_string(),
                reason: "a text property only accepts a scalar".to_string(),
            }),
            _ => Ok(extract::write(tree, node, &interpolate::display(value))?),
        }
    }

    /// Bind an object to every property node in a scope
    ///
    /// Names missing from `data` leave their nodes alone. An element whose
    /// `itemprop` ends with the array marker is cloned once per element of
    /// the value and then removed; the clones carry the bare name.
    pub fn bind_scope(
        &self,
        tree: &mut DomTree,
        scope: NodeId,
        data: &Json,
    ) -> Result<(), BindError> {
        if !data.is_object() {
            return Ok(());
        }
        if self.interpolate {
            interpolate::interpolate_scope(tree, scope, data, self.config)?;
        }

        let mut props = Vec::new();
        collect_props(tree, scope, self.config, &mut props);

        for node in props {
            let Some(raw) = tree.attr(node, vocab::ITEMPROP).map(|p| p.trim().to_string()) else {
                continue;
            };
            let marker = self.config.array_marker.as_str();
            match raw.strip_suffix(marker).filter(|_| !marker.is_empty()) {
                Some(bare) => {
                    let bare = bare.trim_end().to_string();
                    self.bind_array(tree, node, &bare, data.get(&bare))?;
                }
                None => {
                    let names = vocab::property_names(tree, node);
                    if let Some(value) = names.iter().find_map(|n| data.get(n)) {
                        self.bind_element(tree, &raw, node, value)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn bind_array(
        &self,
        tree: &mut DomTree,
        node: NodeId,
        name: &str,
        value: Option<&Json>,
    ) -> Result<(), BindError> {
        let items: Vec<&Json> = match value {
            None | Some(Json::Null) => Vec::new(),
            Some(Json::Array(items)) => items.iter().filter(|v| !v.is_null()).collect(),
            Some(Json::String(s)) if s.is_empty() => Vec::new(),
            Some(other) => vec![other],
        };

        if let Some(parent) = tree.parent(node) {
            for item in &items {
                let clone = tree.clone_subtree(node)?;
                tree.set_attr(clone, vocab::ITEMPROP, name)?;
                tree.insert_before(parent, clone, Some(node))?;
                self.bind_clone(tree, name, clone, item)?;
            }
        }
        tracing::trace!(property = name, clones = items.len(), "array binding");
        tree.remove(node)?;
        Ok(())
    }

    /// An object binds into the clone as its own scope; a scalar fills
    /// `{{.}}` placeholders, or the clone's content when it has none.
    fn bind_clone(
        &self,
        tree: &mut DomTree,
        name: &str,
        clone: NodeId,
        item: &Json,
    ) -> Result<(), BindError> {
        if item.is_object() && !is_reference(item) {
            return self.bind_scope(tree, clone, item);
        }
        if self.interpolate && interpolate::interpolate_scope(tree, clone, item, self.config)? > 0 {
            return Ok(());
        }
        self.bind_element(tree, name, clone, item)
    }

    fn bind_element(
        &self,
        tree: &mut DomTree,
        property: &str,
        node: NodeId,
        value: &Json,
    ) -> Result<(), BindError> {
        if vocab::is_scope(tree, node) {
            // References and scalars leave a nested scope as it is.
            if value.is_object() && !is_reference(value) {
                self.bind_scope(tree, node, value)?;
            }
            return Ok(());
        }
        let scalar = match value {
            Json::Array(items) => items.first().unwrap_or(&Json::Null),
            other => other,
        };
        if scalar.is_object() {
            return Ok(());
        }
        self.write_node(tree, property, node, scalar)
    }
}

/// `{"@id": ...}` and nothing else
fn is_reference(value: &Json) -> bool {
    value.as_object().is_some_and(|m| m.len() == 1 && m.contains_key(vocab::KEY_ID))
}

/// Property nodes bound directly to `scope`, in document order
fn collect_props(tree: &DomTree, scope: NodeId, config: &Config, out: &mut Vec<NodeId>) {
    for child in tree.child_elements(scope) {
        if template::is_template(tree, child) {
            continue;
        }
        if vocab::is_property(tree, child) {
            out.push(child);
        }
        if !vocab::is_scope(tree, child) && !interpolate::is_array_marked(tree, child, config) {
            collect_props(tree, child, config, out);
        }
    }
}
