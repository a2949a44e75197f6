//! Collection registry
//!
//! Top-level authoritative items of a document: connected scoped elements
//! that are not themselves a property and carry an `id`. Entries are kept
//! in document order and indexed by `id`. Position and key are looked up
//! through separate methods, so an id such as `"0"` never shadows entry 0.

use crate::vocab;
use mida_dom::{DomTree, MutationRecord, MutationType, NodeId};
use std::collections::{HashMap, HashSet};

/// Entries added and removed by one batch
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectionChange {
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

impl CollectionChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Ordered, keyed set of top-level items
#[derive(Debug, Default, Clone)]
pub struct Collection {
    entries: Vec<NodeId>,
    keys: HashMap<String, NodeId>,
}

impl Collection {
    /// Scan a whole tree
    pub fn scan(tree: &DomTree) -> Self {
        let entries = tree.descendants(tree.root())
            .filter(|&n| Self::is_candidate(tree, n))
            .collect();
        let mut collection = Self { entries, keys: HashMap::new() };
        collection.rebuild_keys(tree);
        collection
    }

    /// Whether a node belongs in the collection
    pub fn is_candidate(tree: &DomTree, node: NodeId) -> bool {
        vocab::is_scope(tree, node)
            && !tree.has_attr(node, vocab::ITEMPROP)
            && vocab::is_authoritative(tree, node)
            && tree.is_connected(node)
            && vocab::is_live(tree, node)
    }

    /// Update from a batch of mutation records
    ///
    /// Only nodes named by the records (and the subtrees added or removed)
    /// are re-checked; untouched entries keep their place.
    pub fn apply(&mut self, tree: &DomTree, records: &[MutationRecord]) -> CollectionChange {
        let mut touched: Vec<NodeId> = Vec::new();
        let mut seen = HashSet::new();
        let mut touch = |n: NodeId, touched: &mut Vec<NodeId>| {
            if seen.insert(n) {
                touched.push(n);
            }
        };

        for record in records {
            match record.mutation_type {
                MutationType::ChildList => {
                    for &node in record.added_nodes.iter().chain(&record.removed_nodes) {
                        touch(node, &mut touched);
                        for d in tree.descendants(node) {
                            touch(d, &mut touched);
                        }
                    }
                }
                MutationType::Attributes => {
                    let name = record.attribute_name().unwrap_or("");
                    if matches!(name, vocab::ITEMSCOPE | vocab::ITEMPROP | vocab::ID) {
                        touch(record.target, &mut touched);
                    }
                }
                MutationType::CharacterData => {}
            }
        }

        let mut change = CollectionChange::default();
        for &node in &touched {
            let was = self.entries.iter().position(|&e| e == node);
            let now = Self::is_candidate(tree, node);
            match (was, now) {
                (Some(pos), true) => {
                    // Moved nodes are re-placed in document order.
                    self.entries.remove(pos);
                    self.insert_ordered(tree, node);
                }
                (Some(pos), false) => {
                    self.entries.remove(pos);
                    change.removed.push(node);
                }
                (None, true) => {
                    self.insert_ordered(tree, node);
                    change.added.push(node);
                }
                (None, false) => {}
            }
        }

        if !touched.is_empty() {
            self.rebuild_keys(tree);
        }
        if !change.is_empty() {
            tracing::debug!(
                added = change.added.len(),
                removed = change.removed.len(),
                "collection updated"
            );
        }
        change
    }

    fn insert_ordered(&mut self, tree: &DomTree, node: NodeId) {
        let pos = self.entries
            .iter()
            .position(|&e| tree.precedes(node, e))
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, node);
    }

    /// The first holder of an id in document order owns the key
    fn rebuild_keys(&mut self, tree: &DomTree) {
        self.keys.clear();
        for &node in &self.entries {
            if let Some(id) = tree.element(node).and_then(|e| e.id()) {
                self.keys.entry(id.to_string()).or_insert(node);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at a position
    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.entries.get(index).copied()
    }

    /// Entry owning an id
    pub fn get_by_key(&self, key: &str) -> Option<NodeId> {
        self.keys.get(key).copied()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.entries.contains(&node)
    }

    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.entries.iter().position(|&e| e == node)
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.iter().copied()
    }

    /// Keys in entry order
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<(&str, NodeId)> =
            self.keys.iter().map(|(k, &n)| (k.as_str(), n)).collect();
        keys.sort_by_key(|&(_, n)| self.position(n));
        keys.into_iter().map(|(k, _)| k).collect()
    }

    pub fn as_slice(&self) -> &[NodeId] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mida_dom::Document;

    fn parse(html: &str) -> Document {
        mida_html::parse(html).unwrap()
    }

    #[test]
    fn test_scan_picks_top_level_authoritative() {
        let doc = parse(r#"
            <div id="a" itemscope><div id="n" itemprop="x" itemscope></div></div>
            <div itemscope></div>
            <div id="b" itemscope></div>
            <template><div id="t" itemscope></div></template>
        "#);
        let c = Collection::scan(doc.tree());
        assert_eq!(c.len(), 2);
        assert_eq!(c.get(0), doc.get_element_by_id("a"));
        assert_eq!(c.get_by_key("b"), doc.get_element_by_id("b"));
        assert_eq!(c.get_by_key("n"), None);
    }

    #[test]
    fn test_numeric_ids_do_not_shadow_positions() {
        let doc = parse(r#"<div id="1" itemscope></div><div id="0" itemscope></div>"#);
        let c = Collection::scan(doc.tree());
        let first = doc.get_element_by_id("1").unwrap();
        let second = doc.get_element_by_id("0").unwrap();
        assert_eq!(c.get(0), Some(first));
        assert_eq!(c.get_by_key("0"), Some(second));
        assert_eq!(c.keys(), vec!["1", "0"]);
    }

    #[test]
    fn test_incremental_add_remove() {
        let mut doc = parse(r#"<div id="a" itemscope></div>"#);
        let mut c = Collection::scan(doc.tree());
        let body = doc.body();

        let wrapper = doc.tree.create_element("section");
        let item = doc.tree.create_element("div");
        doc.tree.set_attr(item, "itemscope", "").unwrap();
        doc.tree.set_attr(item, "id", "new").unwrap();
        doc.tree.append_child(wrapper, item).unwrap();
        let a = doc.get_element_by_id("a");
        doc.tree.insert_before(body, wrapper, a).unwrap();

        let records = doc.take_records();
        let change = c.apply(doc.tree(), &records);
        assert_eq!(change.added, vec![item]);
        assert_eq!(c.get(0), Some(item));
        assert_eq!(c.get_by_key("new"), Some(item));

        doc.tree.remove(wrapper).unwrap();
        let records = doc.take_records();
        let change = c.apply(doc.tree(), &records);
        assert_eq!(change.removed, vec![item]);
        assert_eq!(c.len(), 1);
        assert_eq!(c.get_by_key("new"), None);
    }

    #[test]
    fn test_duplicate_id_key_moves_to_next_holder() {
        let mut doc = parse(r#"<div id="d" itemscope></div><p id="d" itemscope></p>"#);
        let mut c = Collection::scan(doc.tree());
        let tree = doc.tree();
        let first = tree
            .descendants(NodeId::ROOT)
            .find(|&n| tree.is_element_named(n, "div"))
            .unwrap();
        let second = tree
            .descendants(NodeId::ROOT)
            .find(|&n| tree.is_element_named(n, "p"))
            .unwrap();
        assert_eq!(c.get_by_key("d"), Some(first));

        doc.tree.remove(first).unwrap();
        let records = doc.take_records();
        c.apply(doc.tree(), &records);
        assert_eq!(c.get_by_key("d"), Some(second));
    }

    #[test]
    fn test_attribute_changes_reclassify() {
        let mut doc = parse(r#"<div id="a" itemscope></div>"#);
        let mut c = Collection::scan(doc.tree());
        let a = doc.get_element_by_id("a").unwrap();

        doc.tree.set_attr(a, "itemprop", "x").unwrap();
        let records = doc.take_records();
        c.apply(doc.tree(), &records);
        assert!(c.is_empty());

        doc.tree.remove_attr(a, "itemprop").unwrap();
        let records = doc.take_records();
        c.apply(doc.tree(), &records);
        assert_eq!(c.get(0), Some(a));
    }
}
