//! Reading and writing the content a property node carries
//!
//! Which attribute (or the text, or the control state) holds the value
//! depends on the element kind. Reads and writes share one mapping.

use mida_dom::{DomResult, DomTree, NodeId, forms};

/// Where an element keeps its property value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Attr(&'static str),
    /// `datetime` when present, text otherwise
    Time,
    Control,
    Text,
}

/// Value slot for an element
pub fn slot(tree: &DomTree, node: NodeId) -> Slot {
    match tree.local_name(node).unwrap_or("") {
        "meta" => Slot::Attr("content"),
        "a" | "area" | "link" => Slot::Attr("href"),
        "audio" | "embed" | "iframe" | "img" | "source" | "track" | "video" => Slot::Attr("src"),
        "object" => Slot::Attr("data"),
        "data" | "meter" => Slot::Attr("value"),
        "time" => Slot::Time,
        "input" | "select" | "textarea" => Slot::Control,
        _ => Slot::Text,
    }
}

/// Current value of a non-scoped property node
pub fn read(tree: &DomTree, node: NodeId, trim: bool) -> String {
    let raw = match slot(tree, node) {
        Slot::Attr(name) => tree.attr(node, name).unwrap_or("").to_string(),
        Slot::Time => match tree.attr(node, "datetime") {
            Some(dt) => dt.to_string(),
            None => tree.text_content(node),
        },
        Slot::Control => forms::control_value(tree, node).unwrap_or_default(),
        Slot::Text => tree.text_content(node),
    };
    if trim { raw.trim().to_string() } else { raw }
}

/// Store a value into a non-scoped property node
pub fn write(tree: &mut DomTree, node: NodeId, value: &str) -> DomResult<()> {
    match slot(tree, node) {
        Slot::Attr(name) => tree.set_attr(node, name, value),
        Slot::Time if tree.has_attr(node, "datetime") => tree.set_attr(node, "datetime", value),
        Slot::Time | Slot::Text => tree.set_text_content(node, value),
        Slot::Control => forms::set_control_value(tree, node, value),
    }
}
