//! Placeholder substitution
//!
//! `{{ path.to.value }}` in attribute values and text nodes is replaced by
//! a dotted-path lookup into the bound data. Array indices are allowed as
//! path segments; missing paths render as the empty string.

use crate::config::Config;
use crate::vocab;
use mida_dom::{DomResult, DomTree, NodeData, NodeId, template};
use serde_json::Value as Json;

/// Follow a dotted path; `.` or an empty path is the data itself
pub fn lookup<'v>(data: &'v Json, path: &str) -> Option<&'v Json> {
    let path = path.trim();
    if path.is_empty() || path == "." {
        return Some(data);
    }
    path.split('.').try_fold(data, |current, segment| match current {
        Json::Object(map) => map.get(segment),
        Json::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Text form of a value inside markup
pub fn display(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        Json::Null => String::new(),
        Json::Bool(_) | Json::Number(_) => value.to_string(),
        Json::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(", "),
        Json::Object(map) => map.get(vocab::KEY_ID).map(display).unwrap_or_default(),
    }
}

/// Replace every placeholder in `text`; `None` when there is nothing to do
pub fn substitute(text: &str, data: &Json, open: &str, close: &str) -> Option<String> {
    if open.is_empty() || !text.contains(open) {
        return None;
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(open) {
        out.push_str(&rest[..start]);
        let after = &rest[start + open.len()..];
        let Some(end) = after.find(close) else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        if let Some(value) = lookup(data, &after[..end]) {
            out.push_str(&display(value));
        }
        rest = &after[end + close.len()..];
    }
    out.push_str(rest);
    Some(out)
}

enum Edit {
    Attr(NodeId, String, String),
    Text(NodeId, String),
}

/// Substitute placeholders in the region bound to `scope`
///
/// The region is the scope element and everything under it except nested
/// scopes, array-marked elements and templates, which get their own data.
/// Returns the number of attributes and text nodes changed.
pub fn interpolate_scope(
    tree: &mut DomTree,
    scope: NodeId,
    data: &Json,
    config: &Config,
) -> DomResult<usize> {
    let mut region = vec![scope];
    collect_region(tree, scope, config, &mut region);

    let (open, close) = (config.placeholder_open.as_str(), config.placeholder_close.as_str());
    let mut edits = Vec::new();
    for node in region {
        match tree.get(node).map(|n| &n.data) {
            Some(NodeData::Element(elem)) => {
                for attr in &elem.attrs {
                    if let Some(value) = substitute(&attr.value, data, open, close) {
                        edits.push(Edit::Attr(node, attr.name.clone(), value));
                    }
                }
            }
            Some(NodeData::Text(text)) => {
                if let Some(value) = substitute(text, data, open, close) {
                    edits.push(Edit::Text(node, value));
                }
            }
            _ => {}
        }
    }

    let count = edits.len();
    for edit in edits {
        match edit {
            Edit::Attr(node, name, value) => tree.set_attr(node, &name, &value)?,
            Edit::Text(node, value) => tree.set_text(node, &value)?,
        }
    }
    Ok(count)
}

fn collect_region(tree: &DomTree, node: NodeId, config: &Config, out: &mut Vec<NodeId>) {
    for (child, data) in tree.children(node) {
        if data.is_text() {
            out.push(child);
            continue;
        }
        if !data.is_element()
            || vocab::is_scope(tree, child)
            || template::is_template(tree, child)
            || is_array_marked(tree, child, config)
        {
            continue;
        }
        out.push(child);
        collect_region(tree, child, config, out);
    }
}

pub(crate) fn is_array_marked(tree: &DomTree, node: NodeId, config: &Config) -> bool {
    !config.array_marker.is_empty()
        && tree
            .attr(node, vocab::ITEMPROP)
            .is_some_and(|p| p.trim_end().ends_with(&config.array_marker))
}
