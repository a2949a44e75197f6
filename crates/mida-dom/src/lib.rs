//! mida DOM - Document tree
//!
//! Arena-based document tree the binding engine runs on. Every mutation
//! is recorded so observers can pick up changes in batches.

mod node;
mod tree;
mod document;
mod operations;
pub mod observer;
pub mod events;
pub mod forms;
pub mod template;

pub use node::{Node, NodeData, ElementData, Attribute};
pub use tree::{DomTree, Children, Descendants, Ancestors};
pub use document::Document;
pub use operations::{DomError, DomResult};
pub use observer::{MutationRecord, MutationType};
pub use events::{DomEvent, EventListener, dispatch_event};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check that this id points at a node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Raw arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// `None` for the sentinel, `Some(self)` otherwise
    #[inline]
    pub fn valid(self) -> Option<NodeId> {
        if self.is_valid() { Some(self) } else { None }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
