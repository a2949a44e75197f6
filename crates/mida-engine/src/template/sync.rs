//! Auto-sync containers
//!
//! A container names a source item type (and optionally the id of an
//! element bounding where sources are looked for). Its first `<template>`
//! child is rendered once per matching item, and every reconcile diffs the
//! current sources against the rendered clones by source identity: new
//! sources get a clone, changed ones are re-rendered in place, vanished
//! ones are removed and unchanged clones are not touched.

use super::render::{Template, render_data};
use crate::builder::Builder;
use crate::config::Config;
use crate::error::RenderError;
use crate::vocab;
use mida_dom::{Document, DomTree, MutationRecord, NodeId, template};
use serde_json::Value as Json;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
struct Rendered {
    key: String,
    node: NodeId,
    data: Json,
}

/// What one reconcile did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
    pub moved: usize,
}

impl SyncStats {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Rendered clones kept in step with a live source set
#[derive(Debug, Clone)]
pub struct AutoSync {
    container: NodeId,
    template: Template,
    source_type: String,
    source_root: Option<String>,
    rendered: Vec<Rendered>,
}

impl AutoSync {
    /// Read the container's source predicate and template
    pub fn from_container(
        tree: &DomTree,
        container: NodeId,
        config: &Config,
    ) -> Result<Self, RenderError> {
        if tree.element(container).is_none() {
            return Err(RenderError::NotAnElement(container));
        }
        let source_type = tree.attr(container, &config.source_type_attr)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(RenderError::MissingSourceType(container))?
            .to_string();
        let source_root = tree.attr(container, &config.source_root_attr)
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        let template_node = template::find_template(tree, container)
            .ok_or(RenderError::EmptyTemplate(container))?;
        let template = Template::from_node(tree, template_node)?;
        Ok(Self { container, template, source_type, source_root, rendered: Vec::new() })
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    /// Rendered clones in order
    pub fn rendered(&self) -> Vec<NodeId> {
        self.rendered.iter().map(|r| r.node).collect()
    }

    pub fn len(&self) -> usize {
        self.rendered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }

    /// Whether a batch can change the source set
    ///
    /// Records inside the container are the sync's own output.
    pub fn is_relevant(&self, tree: &DomTree, records: &[MutationRecord]) -> bool {
        records.iter().any(|r| !tree.contains(self.container, r.target))
    }

    /// Matching items in document order: key, node and current data
    fn sources(&self, doc: &Document, config: &Config) -> Vec<(String, NodeId, Json)> {
        let tree = doc.tree();
        let root = self.source_root
            .as_deref()
            .and_then(|id| doc.get_element_by_id(id))
            .unwrap_or(tree.root());

        let mut builder = Builder::new(doc, config);
        let mut seen: HashSet<String> = HashSet::new();
        let mut sources = Vec::new();
        for node in std::iter::once(root).chain(tree.descendants(root)) {
            if !vocab::is_scope(tree, node)
                || !vocab::has_item_type(tree, node, &self.source_type)
                || tree.contains(self.container, node)
                || !vocab::is_live(tree, node)
            {
                continue;
            }
            let item = builder.build(node);
            let mut key = item.identity().map_or_else(|| format!("node:{node}"), str::to_string);
            if !seen.insert(key.clone()) {
                key = format!("{key}@{node}");
                seen.insert(key.clone());
            }
            sources.push((key, node, item.to_json()));
        }
        sources
    }

    /// Bring the rendered clones in line with the sources
    pub fn reconcile(
        &mut self,
        doc: &mut Document,
        config: &Config,
    ) -> Result<SyncStats, RenderError> {
        let sources = self.sources(doc, config);
        let mut stats = SyncStats::default();
        let tree = doc.tree_mut();

        let live: HashSet<&str> = sources.iter().map(|(k, _, _)| k.as_str()).collect();
        let mut previous: HashMap<String, Rendered> = HashMap::new();
        for r in self.rendered.drain(..) {
            if live.contains(r.key.as_str()) {
                previous.insert(r.key.clone(), r);
            } else {
                tree.remove(r.node)?;
                stats.removed += 1;
            }
        }

        let mut next = Vec::with_capacity(sources.len());
        for (key, _, data) in sources {
            match previous.remove(&key) {
                Some(r) if r.data == data => next.push(r),
                Some(r) => {
                    let clone = render_data(tree, &data, &self.template, config)?;
                    if tree.parent(r.node).is_some() {
                        tree.replace(r.node, clone)?;
                    }
                    stats.updated += 1;
                    next.push(Rendered { key, node: clone, data });
                }
                None => {
                    let clone = render_data(tree, &data, &self.template, config)?;
                    stats.inserted += 1;
                    next.push(Rendered { key, node: clone, data });
                }
            }
        }

        // Walk backwards so each clone only moves when it is out of place.
        let mut anchor: Option<NodeId> = None;
        for r in next.iter().rev() {
            let in_place = tree.get(r.node).is_some_and(|n| {
                n.parent == self.container && n.next_sibling == anchor.unwrap_or(NodeId::NONE)
            });
            if !in_place {
                let was_attached = tree.parent(r.node).is_some();
                tree.insert_before(self.container, r.node, anchor)?;
                if was_attached {
                    stats.moved += 1;
                }
            }
            anchor = Some(r.node);
        }
        self.rendered = next;

        if !stats.is_empty() {
            tracing::debug!(
                container = %self.container,
                inserted = stats.inserted,
                updated = stats.updated,
                removed = stats.removed,
                moved = stats.moved,
                "auto-sync reconciled"
            );
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <div id="people">
          <div id="ada" itemscope itemtype="https://schema.org/Person"><span itemprop="name">Ada</span></div>
          <div id="bo" itemscope itemtype="https://schema.org/Person"><span itemprop="name">Bo</span></div>
          <div id="x" itemscope itemtype="https://schema.org/Place"><span itemprop="name">Elsewhere</span></div>
        </div>
        <ul id="list" data-itemtype="https://schema.org/Person">
          <template><li itemscope><b itemprop="name"></b></li></template>
        </ul>
    "#;

    fn names(doc: &Document, sync: &AutoSync) -> Vec<String> {
        sync.rendered().iter().map(|&n| doc.tree().text_content(n)).collect()
    }

    #[test]
    fn test_initial_render_matches_type() {
        let mut doc = mida_html::parse(PAGE).unwrap();
        let config = Config::default();
        let list = doc.get_element_by_id("list").unwrap();
        let mut sync = AutoSync::from_container(doc.tree(), list, &config).unwrap();

        let stats = sync.reconcile(&mut doc, &config).unwrap();
        assert_eq!(stats.inserted, 2);
        assert_eq!(names(&doc, &sync), vec!["Ada", "Bo"]);
        assert!(sync.rendered().iter().all(|&n| doc.tree().parent(n) == Some(list)));
    }

    #[test]
    fn test_reconcile_diffs_by_identity() {
        let mut doc = mida_html::parse(PAGE).unwrap();
        let config = Config::default();
        let list = doc.get_element_by_id("list").unwrap();
        let mut sync = AutoSync::from_container(doc.tree(), list, &config).unwrap();
        sync.reconcile(&mut doc, &config).unwrap();
        let before = sync.rendered();

        let stats = sync.reconcile(&mut doc, &config).unwrap();
        assert!(stats.is_empty());
        assert_eq!(sync.rendered(), before);

        let bo = doc.get_element_by_id("bo").unwrap();
        let name = doc.tree().first_element_child(bo).unwrap();
        doc.tree.set_text_content(name, "Bob").unwrap();
        let ada = doc.get_element_by_id("ada").unwrap();
        doc.tree.remove(ada).unwrap();

        let stats = sync.reconcile(&mut doc, &config).unwrap();
        assert_eq!((stats.inserted, stats.updated, stats.removed), (0, 1, 1));
        assert_eq!(names(&doc, &sync), vec!["Bob"]);
    }

    #[test]
    fn test_missing_source_type() {
        let doc = mida_html::parse(r#"<ul id="l"><template><li></li></template></ul>"#).unwrap();
        let l = doc.get_element_by_id("l").unwrap();
        assert_eq!(
            AutoSync::from_container(doc.tree(), l, &Config::default()).unwrap_err(),
            RenderError::MissingSourceType(l)
        );
    }
}
