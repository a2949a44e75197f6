//! DOM Tree (arena-based allocation)
//!
//! Nodes are never freed: a removed node is only unlinked, so ids held by
//! observers stay valid and removed subtrees can still be inspected when
//! their mutation records are processed.

use crate::observer::{MutationQueue, MutationRecord};
use crate::{DomError, DomResult, ElementData, Node, NodeData, NodeId};

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
    queue: MutationQueue,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    /// Create a tree with preallocated node storage
    pub fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.max(1));
        nodes.push(Node::document());
        Self { nodes, queue: MutationQueue::default() }
    }

    /// The document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    ///
    /// Changes made through this reference are not recorded.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes in the arena, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound(id))
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(Node::element(name))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(Node::text(content.to_string()))
    }

    /// Create a detached comment
    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push(Node::comment(content.to_string()))
    }

    /// Create a detached doctype node
    pub fn create_doctype(&mut self, name: &str) -> NodeId {
        self.push(Node {
            data: NodeData::Doctype { name: name.to_string() },
            ..Node::document()
        })
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent.valid())
    }

    /// Iterate direct children
    pub fn children(&self, id: NodeId) -> Children<'_> {
        let next = self.get(id).map_or(NodeId::NONE, |n| n.first_child);
        Children { tree: self, next }
    }

    /// Iterate direct element children
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).filter(|(_, n)| n.is_element()).map(|(id, _)| id)
    }

    /// First element child
    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.child_elements(id).next()
    }

    /// Pre-order descendants, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let next = self.get(id).map_or(NodeId::NONE, |n| n.first_child);
        Descendants { tree: self, root: id, next }
    }

    /// Ancestors from the parent upward
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors { tree: self, next: self.get(id).map_or(NodeId::NONE, |n| n.parent) }
    }

    /// Whether `node` is `ancestor` or lies inside it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether the node is attached under the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        id == NodeId::ROOT || self.ancestors(id).any(|a| a == NodeId::ROOT)
    }

    fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path: Vec<NodeId> = self.ancestors(id).collect();
        path.reverse();
        path.push(id);
        path
    }

    /// Whether `a` comes before `b` in document order
    ///
    /// Nodes in unrelated detached trees are ordered by arena index.
    pub fn precedes(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return false;
        }
        let pa = self.path(a);
        let pb = self.path(b);
        let shared = pa.iter().zip(pb.iter()).take_while(|(x, y)| x == y).count();
        if shared == pa.len() {
            return true;
        }
        if shared == pb.len() {
            return false;
        }
        if shared == 0 {
            return pa[0] < pb[0];
        }
        let target = pb[shared];
        let mut cur = self.nodes[pa[shared].index()].next_sibling;
        while cur.is_valid() {
            if cur == target {
                return true;
            }
            cur = self.nodes[cur.index()].next_sibling;
        }
        false
    }

    // ------------------------------------------------------------------
    // Elements and attributes
    // ------------------------------------------------------------------

    /// Element data of a node
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    /// Local name of an element
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    /// Check an element's local name
    pub fn is_element_named(&self, id: NodeId, name: &str) -> bool {
        self.local_name(id) == Some(name)
    }

    /// Get an attribute value
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.get_attr(name))
    }

    /// Check attribute presence
    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_attr(name))
    }

    /// Set an attribute; unchanged values are not recorded
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let elem = self.get_mut(id)
            .ok_or(DomError::NotFound(id))?
            .as_element_mut()
            .ok_or(DomError::NotAnElement(id))?;
        if elem.get_attr(name) == Some(value) {
            return Ok(());
        }
        let old = elem.set_attr(name, value.to_string());
        self.queue.push(MutationRecord::attribute(id, name, old));
        Ok(())
    }

    /// Remove an attribute
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> DomResult<Option<String>> {
        let elem = self.get_mut(id)
            .ok_or(DomError::NotFound(id))?
            .as_element_mut()
            .ok_or(DomError::NotAnElement(id))?;
        let old = elem.remove_attr(name);
        if old.is_some() {
            self.queue.push(MutationRecord::attribute(id, name, old.clone()));
        }
        Ok(old)
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Text(t)) | Some(NodeData::Comment(t)) => t.clone(),
            Some(_) => self.descendants(id)
                .filter_map(|d| self.nodes[d.index()].as_text())
                .collect(),
            None => String::new(),
        }
    }

    /// Replace character data of a text node
    pub fn set_text(&mut self, id: NodeId, content: &str) -> DomResult<()> {
        let node = self.get_mut(id).ok_or(DomError::NotFound(id))?;
        match &mut node.data {
            NodeData::Text(t) | NodeData::Comment(t) => {
                if t != content {
                    let old = std::mem::replace(t, content.to_string());
                    self.queue.push(MutationRecord::character_data(id, old));
                }
                Ok(())
            }
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    /// Replace all children with a single text node
    ///
    /// A lone text child is updated in place so only a character data
    /// record is produced.
    pub fn set_text_content(&mut self, id: NodeId, content: &str) -> DomResult<()> {
        let node = self.node(id)?;
        if node.is_text() {
            return self.set_text(id, content);
        }
        let first = node.first_child;
        if first.is_valid() && first == node.last_child && self.nodes[first.index()].is_text() {
            return self.set_text(first, content);
        }

        let removed: Vec<NodeId> = self.children(id).map(|(c, _)| c).collect();
        for child in &removed {
            self.unlink(*child);
        }
        let mut added = Vec::new();
        if !content.is_empty() {
            let text = self.create_text(content);
            self.link_before(id, text, NodeId::NONE);
            added.push(text);
        }
        if !added.is_empty() || !removed.is_empty() {
            self.queue.push(MutationRecord::child_list(id, added, removed));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    fn check_insert(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let parent_node = self.node(parent)?;
        self.node(child)?;
        let can_have_children =
            matches!(parent_node.data, NodeData::Element(_) | NodeData::Document);
        if !can_have_children || child == NodeId::ROOT || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    /// Unlink a node from its parent without recording
    fn unlink(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let n = &self.nodes[id.index()];
            (n.parent, n.prev_sibling, n.next_sibling)
        };
        if !parent.is_valid() {
            return;
        }
        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else {
            self.nodes[parent.index()].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else {
            self.nodes[parent.index()].last_child = prev;
        }
        let n = &mut self.nodes[id.index()];
        n.parent = NodeId::NONE;
        n.prev_sibling = NodeId::NONE;
        n.next_sibling = NodeId::NONE;
    }

    /// Link a detached node before `reference` (or at the end) without recording
    fn link_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        let prev = if reference.is_valid() {
            self.nodes[reference.index()].prev_sibling
        } else {
            self.nodes[parent.index()].last_child
        };
        {
            let c = &mut self.nodes[child.index()];
            c.parent = parent;
            c.prev_sibling = prev;
            c.next_sibling = reference;
        }
        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
        if reference.is_valid() {
            self.nodes[reference.index()].prev_sibling = child;
        } else {
            self.nodes[parent.index()].last_child = child;
        }
    }

    /// Append a child node, moving it if it is already attached
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference`, or append when `reference` is `None`
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<NodeId> {
        self.check_insert(parent, child)?;
        let reference = match reference {
            Some(r) if r == child => self.nodes[child.index()].next_sibling,
            Some(r) => {
                if self.parent(r) != Some(parent) {
                    return Err(DomError::NotAChild(r));
                }
                r
            }
            None => NodeId::NONE,
        };
        if let Some(old_parent) = self.parent(child) {
            self.unlink(child);
            self.queue.push(MutationRecord::child_list(old_parent, Vec::new(), vec![child]));
        }
        self.link_before(parent, child, reference);
        self.queue.push(MutationRecord::child_list(parent, vec![child], Vec::new()));
        Ok(child)
    }

    /// Detach a node from its parent; the node stays in the arena
    pub fn remove(&mut self, id: NodeId) -> DomResult<()> {
        self.node(id)?;
        if let Some(parent) = self.parent(id) {
            self.unlink(id);
            self.queue.push(MutationRecord::child_list(parent, Vec::new(), vec![id]));
        }
        Ok(())
    }

    /// Put `new` where `old` is
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> DomResult<()> {
        let parent = self.parent(old).ok_or(DomError::NotAChild(old))?;
        self.insert_before(parent, new, Some(old))?;
        self.remove(old)
    }

    /// Deep-clone a subtree; the clone is detached and not recorded
    pub fn clone_subtree(&mut self, id: NodeId) -> DomResult<NodeId> {
        let data = self.node(id)?.data.clone();
        let copy = self.push(Node { data, ..Node::document() });
        let children: Vec<NodeId> = self.children(id).map(|(c, _)| c).collect();
        for child in children {
            let child_copy = self.clone_subtree(child)?;
            self.link_before(copy, child_copy, NodeId::NONE);
        }
        Ok(copy)
    }

    // ------------------------------------------------------------------
    // Mutation records
    // ------------------------------------------------------------------

    /// Drain all pending mutation records as one batch
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        self.queue.take()
    }

    /// Number of records waiting to be drained
    pub fn pending_records(&self) -> usize {
        self.queue.len()
    }

    /// Turn recording on or off (used while building a tree from markup)
    pub fn set_recording(&mut self, recording: bool) {
        self.queue.set_paused(!recording);
    }
}

/// Iterator over children
pub struct Children<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.valid()?;
        let node = self.tree.get(id)?;
        self.next = node.next_sibling;
        Some((id, node))
    }
}

/// Pre-order iterator over descendants
pub struct Descendants<'a> {
    tree: &'a DomTree,
    root: NodeId,
    next: NodeId,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next.valid()?;
        let node = self.tree.get(current)?;
        self.next = if node.first_child.is_valid() {
            node.first_child
        } else {
            let mut n = current;
            loop {
                if n == self.root {
                    break NodeId::NONE;
                }
                let Some(node) = self.tree.get(n) else { break NodeId::NONE };
                if node.next_sibling.is_valid() {
                    break node.next_sibling;
                }
                n = node.parent;
                if !n.is_valid() {
                    break NodeId::NONE;
                }
            }
        };
        Some(current)
    }
}

/// Iterator walking up the parent chain
pub struct Ancestors<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next.valid()?;
        self.next = self.tree.get(id).map_or(NodeId::NONE, |n| n.parent);
        Some(id)
    }
}
