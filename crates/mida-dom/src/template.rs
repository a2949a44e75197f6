//! HTML Template Element
//!
//! The children of a `<template>` element are inert content: they are kept
//! in the tree but do not belong to the rendered document. Consumers skip
//! them when scanning and clone them when instantiating.

use crate::{DomTree, NodeId};

/// Check whether a node is a `<template>` element
pub fn is_template(tree: &DomTree, node: NodeId) -> bool {
    tree.is_element_named(node, "template")
}

/// Whether the node sits inside some template's inert content
pub fn is_inert(tree: &DomTree, node: NodeId) -> bool {
    tree.ancestors(node).any(|a| is_template(tree, a))
}

/// The element a template instantiates: its first element child
pub fn template_root(tree: &DomTree, template: NodeId) -> Option<NodeId> {
    tree.first_element_child(template)
}

/// First `<template>` child of a container
pub fn find_template(tree: &DomTree, container: NodeId) -> Option<NodeId> {
    tree.child_elements(container).find(|&c| is_template(tree, c))
}
