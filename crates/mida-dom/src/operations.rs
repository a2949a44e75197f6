//! DOM Node Operations
//!
//! Errors for appendChild, insertBefore, removeChild and friends.

use crate::NodeId;

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Node not found
    #[error("node {0} not found")]
    NotFound(NodeId),
    /// Hierarchy error (e.g., inserting an ancestor into its descendant)
    #[error("hierarchy request error: cannot insert {child} into {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },
    /// Reference node is not a child of the parent
    #[error("node {0} is not a child of the given parent")]
    NotAChild(NodeId),
    /// Operation needs an element
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),
}
