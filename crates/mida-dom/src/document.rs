//! Document - High-level document API

use crate::events::{EventListener, Listeners};
use crate::{DomTree, MutationRecord, NodeId};

/// HTML Document
pub struct Document {
    /// The DOM tree
    pub tree: DomTree,
    /// Document URL
    url: String,
    /// Cached reference to <html> element
    html_element: NodeId,
    /// Cached reference to <head> element
    head_element: NodeId,
    /// Cached reference to <body> element
    body_element: NodeId,
    /// Event listeners by node
    listeners: Listeners,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("url", &self.url)
            .field("nodes", &self.tree.len())
            .finish()
    }
}

impl Document {
    /// Create a new document with html/head/body
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();
        tree.set_recording(false);

        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        // Fresh detached nodes under the document node cannot fail to insert.
        let _ = tree.append_child(tree.root(), html);
        let _ = tree.append_child(html, head);
        let _ = tree.append_child(html, body);
        tree.set_recording(true);

        Self {
            tree,
            url: url.to_string(),
            html_element: html,
            head_element: head,
            body_element: body,
            listeners: Listeners::default(),
        }
    }

    /// Create an empty document (no structure)
    pub fn empty(url: &str) -> Self {
        Self {
            tree: DomTree::new(),
            url: url.to_string(),
            html_element: NodeId::NONE,
            head_element: NodeId::NONE,
            body_element: NodeId::NONE,
            listeners: Listeners::default(),
        }
    }

    /// Locate html/head/body after the tree was filled by a parser
    pub fn finalize(&mut self) {
        self.html_element = self.tree.first_element_child(NodeId::ROOT).unwrap_or(NodeId::NONE);
        if !self.html_element.is_valid() {
            return;
        }
        for child in self.tree.child_elements(self.html_element) {
            match self.tree.local_name(child) {
                Some("head") => self.head_element = child,
                Some("body") => self.body_element = child,
                _ => {}
            }
        }
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Document URL without its fragment
    pub fn base_url(&self) -> &str {
        self.url.split('#').next().unwrap_or(&self.url)
    }

    /// Document node
    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Get <html> element
    pub fn document_element(&self) -> NodeId {
        self.html_element
    }

    /// Get <head> element
    pub fn head(&self) -> NodeId {
        self.head_element
    }

    /// Get <body> element
    pub fn body(&self) -> NodeId {
        self.body_element
    }

    /// First connected element with the given id, in document order
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        self.tree
            .descendants(self.tree.root())
            .find(|&n| self.tree.element(n).and_then(|e| e.id()) == Some(id))
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Access the DOM tree mutably
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// Drain pending mutation records
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        self.tree.take_records()
    }

    /// Register a listener for `event_type` on `node`
    pub fn add_event_listener(&mut self, node: NodeId, event_type: &str, listener: EventListener) {
        self.listeners.add(node, event_type, listener);
    }

    /// Drop every listener registered on `node`
    pub fn remove_event_listeners(&mut self, node: NodeId) {
        self.listeners.remove_node(node);
    }

    pub(crate) fn listeners(&self) -> &Listeners {
        &self.listeners
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_structure() {
        let mut doc = Document::new("https://example.com/page#top");
        assert!(doc.body().is_valid());
        assert_eq!(doc.tree().parent(doc.body()), Some(doc.document_element()));
        assert_eq!(doc.base_url(), "https://example.com/page");
        assert!(doc.take_records().is_empty());
    }

    #[test]
    fn test_get_element_by_id_skips_detached() {
        let mut doc = Document::new("about:blank");
        let body = doc.body();
        let a = doc.tree.create_element("div");
        doc.tree.set_attr(a, "id", "x").unwrap();
        assert_eq!(doc.get_element_by_id("x"), None);

        doc.tree.append_child(body, a).unwrap();
        assert_eq!(doc.get_element_by_id("x"), Some(a));
    }
}
