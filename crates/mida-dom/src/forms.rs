//! Form controls
//!
//! Reading and writing the current value of input/select/textarea elements,
//! and collecting a form's entries for submission-style normalization.
//! Control state lives in attributes (`value`, `checked`, `selected`), so
//! every change goes through the tree and is recorded.

use crate::{DomResult, DomTree, NodeId};

/// Input types that never contribute an entry
const SKIPPED_INPUT_TYPES: &[&str] = &["button", "submit", "reset", "image", "file"];

/// Check if a node is a form control
pub fn is_control(tree: &DomTree, node: NodeId) -> bool {
    matches!(tree.local_name(node), Some("input" | "select" | "textarea"))
}

/// Lowercase input type, `text` by default
pub fn input_type(tree: &DomTree, node: NodeId) -> String {
    tree.attr(node, "type")
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "text".to_string())
}

fn is_checkable(tree: &DomTree, node: NodeId) -> bool {
    tree.is_element_named(node, "input")
        && matches!(input_type(tree, node).as_str(), "checkbox" | "radio")
}

/// Whether a checkbox or radio is checked
pub fn is_checked(tree: &DomTree, node: NodeId) -> bool {
    tree.has_attr(node, "checked")
}

/// Value of an `<option>`: its `value` attribute or its text
pub fn option_value(tree: &DomTree, option: NodeId) -> String {
    match tree.attr(option, "value") {
        Some(v) => v.to_string(),
        None => tree.text_content(option).trim().to_string(),
    }
}

fn options(tree: &DomTree, select: NodeId) -> Vec<NodeId> {
    tree.descendants(select)
        .filter(|&n| tree.is_element_named(n, "option"))
        .collect()
}

/// Values of the selected options of a `<select>`
///
/// A single-choice select with nothing marked selected falls back to its
/// first option, as browsers display it.
pub fn selected_values(tree: &DomTree, select: NodeId) -> Vec<String> {
    let opts = options(tree, select);
    let selected: Vec<String> = opts.iter()
        .filter(|&&o| tree.has_attr(o, "selected"))
        .map(|&o| option_value(tree, o))
        .collect();
    if selected.is_empty() && !tree.has_attr(select, "multiple") {
        return opts.first().map(|&o| vec![option_value(tree, o)]).unwrap_or_default();
    }
    selected
}

/// Current value of a control
pub fn control_value(tree: &DomTree, node: NodeId) -> Option<String> {
    match tree.local_name(node)? {
        "input" => {
            if is_checkable(tree, node) {
                Some(tree.attr(node, "value").unwrap_or("on").to_string())
            } else {
                Some(tree.attr(node, "value").unwrap_or("").to_string())
            }
        }
        "select" => selected_values(tree, node).into_iter().next(),
        "textarea" => Some(tree.text_content(node)),
        _ => None,
    }
}

/// Set the value of a control
///
/// Checkboxes and radios become checked when `value` equals their own
/// value (or is `true`/`on`), and unchecked otherwise.
pub fn set_control_value(tree: &mut DomTree, node: NodeId, value: &str) -> DomResult<()> {
    let name = tree.local_name(node).map(str::to_string);
    match name.as_deref() {
        Some("input") if is_checkable(tree, node) => {
            let own = tree.attr(node, "value").unwrap_or("on").to_string();
            set_checked(tree, node, value == own || value == "true" || value == "on")
        }
        Some("input") => tree.set_attr(node, "value", value),
        Some("select") => set_selected_values(tree, node, &[value.to_string()]),
        Some("textarea") => tree.set_text_content(node, value),
        _ => tree.set_text_content(node, value),
    }
}

/// Check or uncheck a checkbox/radio
pub fn set_checked(tree: &mut DomTree, node: NodeId, checked: bool) -> DomResult<()> {
    if checked {
        tree.set_attr(node, "checked", "")
    } else {
        tree.remove_attr(node, "checked").map(|_| ())
    }
}

/// Mark exactly the options whose values appear in `values` as selected
pub fn set_selected_values(tree: &mut DomTree, select: NodeId, values: &[String]) -> DomResult<()> {
    for option in options(tree, select) {
        let wanted = values.contains(&option_value(tree, option));
        if wanted {
            tree.set_attr(option, "selected", "")?;
        } else {
            tree.remove_attr(option, "selected")?;
        }
    }
    Ok(())
}

/// One form entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormEntry {
    pub name: String,
    pub value: String,
    /// Entry belongs to a multi-value control (checkbox group, select multiple)
    pub multiple: bool,
}

/// Form data in control order
#[derive(Debug, Clone, Default)]
pub struct FormData {
    entries: Vec<FormEntry>,
}

impl FormData {
    /// Create empty form data
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>, multiple: bool) {
        self.entries.push(FormEntry { name: name.into(), value: value.into(), multiple });
    }

    /// First value for a name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.value.as_str())
    }

    /// All values for a name
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries.iter().filter(|e| e.name == name).map(|e| e.value.as_str()).collect()
    }

    /// Entries in order
    pub fn iter(&self) -> impl Iterator<Item = &FormEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collect the entries of every named, enabled control under `form`
pub fn collect_form_data(tree: &DomTree, form: NodeId) -> FormData {
    let controls: Vec<NodeId> = tree.descendants(form)
        .filter(|&n| is_control(tree, n))
        .filter(|&n| tree.attr(n, "name").is_some_and(|name| !name.is_empty()))
        .filter(|&n| !tree.has_attr(n, "disabled"))
        .collect();

    let checkbox_count = |name: &str| {
        controls
            .iter()
            .filter(|&&c| tree.attr(c, "name") == Some(name) && input_type(tree, c) == "checkbox")
            .count()
    };

    let mut data = FormData::new();
    for &control in &controls {
        let Some(name) = tree.attr(control, "name") else { continue };
        match tree.local_name(control) {
            Some("input") => {
                let kind = input_type(tree, control);
                if SKIPPED_INPUT_TYPES.contains(&kind.as_str()) {
                    continue;
                }
                if is_checkable(tree, control) && !is_checked(tree, control) {
                    continue;
                }
                let multiple = kind == "checkbox" && checkbox_count(name) > 1;
                if let Some(value) = control_value(tree, control) {
                    data.append(name, value, multiple);
                }
            }
            Some("select") => {
                let multiple = tree.has_attr(control, "multiple");
                for value in selected_values(tree, control) {
                    data.append(name, value, multiple);
                }
            }
            _ => {
                if let Some(value) = control_value(tree, control) {
                    data.append(name, value, false);
                }
            }
        }
    }
    data
}
