//! Mutation records
//!
//! The tree appends one record per mutation. Nothing is delivered
//! synchronously: observers drain the queue with [`DomTree::take_records`]
//! and see every write since the previous drain as one batch.
//!
//! [`DomTree::take_records`]: crate::DomTree::take_records

use crate::NodeId;

/// Mutation type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Attributes,
    CharacterData,
    ChildList,
}

/// Mutation record
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
}

impl MutationRecord {
    /// Attribute change on `target`
    pub fn attribute(target: NodeId, name: &str, old_value: Option<String>) -> Self {
        Self {
            mutation_type: MutationType::Attributes,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            attribute_name: Some(name.to_string()),
            old_value,
        }
    }

    /// Children added to or removed from `target`
    pub fn child_list(target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) -> Self {
        Self {
            mutation_type: MutationType::ChildList,
            target,
            added_nodes: added,
            removed_nodes: removed,
            attribute_name: None,
            old_value: None,
        }
    }

    /// Text node content changed
    pub fn character_data(target: NodeId, old_value: String) -> Self {
        Self {
            mutation_type: MutationType::CharacterData,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            attribute_name: None,
            old_value: Some(old_value),
        }
    }

    /// Attribute name for attribute records
    pub fn attribute_name(&self) -> Option<&str> {
        self.attribute_name.as_deref()
    }
}

/// Pending records plus an on/off switch
#[derive(Debug, Default)]
pub(crate) struct MutationQueue {
    records: Vec<MutationRecord>,
    paused: bool,
}

impl MutationQueue {
    pub(crate) fn push(&mut self, record: MutationRecord) {
        if !self.paused {
            self.records.push(record);
        }
    }

    pub(crate) fn take(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }
}
