//! Data sources for validation and rendering
//!
//! Everything is normalized into one flat JSON object first. Form fields
//! follow submission rules: a single control gives a scalar, checkbox
//! groups, `select multiple` and names ending in the array marker give
//! arrays, and empty or unchecked fields are absent.

use crate::config::Config;
use crate::item::Item;
use mida_dom::{Document, DomTree, NodeId, forms};
use serde_json::{Map, Value as Json};

/// Input to validation and rendering
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    Item(&'a Item),
    Object(&'a Json),
    Form(&'a Document, NodeId),
}

impl Source<'_> {
    /// Flat property map of the source
    pub fn to_object(&self, config: &Config) -> Map<String, Json> {
        match self {
            Self::Item(item) => match item.to_json() {
                Json::Object(map) => map,
                _ => Map::new(),
            },
            Self::Object(Json::Object(map)) => map.clone(),
            Self::Object(_) => Map::new(),
            Self::Form(doc, form) => normalize_form(doc.tree(), *form, config),
        }
    }
}

/// Normalize the controls under `form`
pub fn normalize_form(tree: &DomTree, form: NodeId, config: &Config) -> Map<String, Json> {
    let marker = config.array_marker.as_str();
    let mut map = Map::new();
    for entry in forms::collect_form_data(tree, form).iter() {
        let (key, marked) = match entry.name.strip_suffix(marker) {
            Some(bare) if !marker.is_empty() => (bare.to_string(), true),
            _ => (entry.name.clone(), false),
        };
        if entry.value.is_empty() {
            continue;
        }
        let value = Json::String(entry.value.clone());
        match map.get_mut(&key) {
            Some(Json::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Json::Array(vec![first, value]);
            }
            None if marked || entry.multiple => {
                map.insert(key, Json::Array(vec![value]));
            }
            None => {
                map.insert(key, value);
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_normalization() {
        let doc = mida_html::parse(r#"
            <form id="f">
              <input name="name" value="Ada">
              <input name="nickname" value="">
              <input type="checkbox" name="tags" value="a" checked>
              <input type="checkbox" name="tags" value="b">
              <input type="checkbox" name="tags" value="c" checked>
              <input type="checkbox" name="agree" value="yes" checked>
              <input name="emails[]" value="a@b.test">
              <select name="langs" multiple>
                <option selected>en</option><option>fr</option><option selected>de</option>
              </select>
              <input name="disabled" value="x" disabled>
            </form>
        "#).unwrap();
        let form = doc.get_element_by_id("f").unwrap();
        let data = normalize_form(doc.tree(), form, &Config::default());
        assert_eq!(Json::Object(data), json!({
            "name": "Ada",
            "tags": ["a", "c"],
            "agree": "yes",
            "emails": ["a@b.test"],
            "langs": ["en", "de"]
        }));
    }

    #[test]
    fn test_non_object_is_empty() {
        let value = json!([1, 2]);
        assert!(Source::Object(&value).to_object(&Config::default()).is_empty());
    }
}
