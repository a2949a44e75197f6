//! Microdata attribute vocabulary
//!
//! Attribute names and the small token-level helpers every other module
//! reads them through.

use mida_dom::{DomTree, NodeId, template};
use url::Url;

pub const ITEMSCOPE: &str = "itemscope";
pub const ITEMTYPE: &str = "itemtype";
pub const ITEMPROP: &str = "itemprop";
pub const ITEMID: &str = "itemid";
pub const ITEMREF: &str = "itemref";
pub const ID: &str = "id";

/// Reserved serialization keys
pub const KEY_TYPE: &str = "@type";
pub const KEY_CONTEXT: &str = "@context";
pub const KEY_ID: &str = "@id";

/// Attributes that change which nodes make up an item
const STRUCTURAL: &[&str] = &[ITEMSCOPE, ITEMTYPE, ITEMPROP, ITEMID, ITEMREF, ID];

/// Whether changing `name` can change the shape of an item
pub fn is_structural_attr(name: &str) -> bool {
    STRUCTURAL.contains(&name)
}

/// Whether a node marks a scope root
pub fn is_scope(tree: &DomTree, node: NodeId) -> bool {
    tree.has_attr(node, ITEMSCOPE)
}

/// Whether a node declares at least one property name
pub fn is_property(tree: &DomTree, node: NodeId) -> bool {
    tree.attr(node, ITEMPROP).is_some_and(|p| !p.trim().is_empty())
}

/// Whether a node takes part in microdata at all
pub fn is_microdata(tree: &DomTree, node: NodeId) -> bool {
    tree.element(node)
        .is_some_and(|e| e.has_attr(ITEMSCOPE) || e.has_attr(ITEMPROP) || e.id().is_some())
}

/// Whether the node or anything under it takes part in microdata
pub fn subtree_has_microdata(tree: &DomTree, node: NodeId) -> bool {
    is_microdata(tree, node) || tree.descendants(node).any(|d| is_microdata(tree, d))
}

/// Property names declared by a node, in attribute order, duplicates removed
pub fn property_names(tree: &DomTree, node: NodeId) -> Vec<String> {
    unique_tokens(tree.attr(node, ITEMPROP).unwrap_or(""))
}

/// Element ids named by a node's `itemref`, duplicates collapsed
pub fn itemref_ids(tree: &DomTree, node: NodeId) -> Vec<String> {
    unique_tokens(tree.attr(node, ITEMREF).unwrap_or(""))
}

fn unique_tokens(value: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in value.split_ascii_whitespace() {
        if !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }
    tokens
}

/// Element is neither inside a `<template>` nor a `<template>` itself
pub fn is_live(tree: &DomTree, node: NodeId) -> bool {
    !template::is_template(tree, node) && !template::is_inert(tree, node)
}

/// One `itemtype` URL split into vocabulary prefix and short name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemType {
    url: String,
    context: String,
    name: String,
}

impl ItemType {
    /// Parse an absolute type URL; anything else is not a type
    pub fn parse(raw: &str) -> Option<Self> {
        let url = raw.trim();
        Url::parse(url).ok()?;
        let cut = url.rfind(['/', '#'])? + 1;
        let name = &url[cut..];
        if name.is_empty() {
            return None;
        }
        Some(Self {
            url: url.to_string(),
            context: url[..cut].to_string(),
            name: name.to_string(),
        })
    }

    /// Full type URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Vocabulary prefix (everything up to the short name)
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Short type name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Item types declared on a node; malformed URLs are dropped
pub fn item_types(tree: &DomTree, node: NodeId) -> Vec<ItemType> {
    tree.attr(node, ITEMTYPE)
        .map(|t| t.split_ascii_whitespace().filter_map(ItemType::parse).collect())
        .unwrap_or_default()
}

/// Whether a node declares `type_url` among its item types
pub fn has_item_type(tree: &DomTree, node: NodeId, type_url: &str) -> bool {
    tree.attr(node, ITEMTYPE)
        .is_some_and(|t| t.split_ascii_whitespace().any(|u| u == type_url))
}

/// Resolve `reference` against `base`, falling back to parsing it alone
pub fn resolve_url(base: &str, reference: &str) -> Option<Url> {
    match Url::parse(base) {
        Ok(base) => base.join(reference.trim()).ok(),
        Err(_) => Url::parse(reference.trim()).ok(),
    }
}

/// Identity of a scoped node
///
/// `itemid` resolved against the base URL wins; otherwise an element `id`
/// makes the node authoritative and yields `base#id`. Unparsable ids give
/// no identity.
pub fn identity(tree: &DomTree, node: NodeId, base: &str) -> Option<String> {
    if let Some(itemid) = tree.attr(node, ITEMID) {
        return resolve_url(base, itemid).map(String::from);
    }
    let id = tree.element(node)?.id()?;
    let mut url = Url::parse(base).ok()?;
    url.set_fragment(Some(id));
    Some(url.into())
}

/// Whether a scoped node is the canonical source of its own data
pub fn is_authoritative(tree: &DomTree, node: NodeId) -> bool {
    tree.element(node).and_then(|e| e.id()).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_type_parts() {
        let t = ItemType::parse(" https://schema.org/Person ").unwrap();
        assert_eq!(t.url(), "https://schema.org/Person");
        assert_eq!(t.context(), "https://schema.org/");
        assert_eq!(t.name(), "Person");

        let hashed = ItemType::parse("https://vocab.test/terms#Book").unwrap();
        assert_eq!(hashed.name(), "Book");
        assert_eq!(hashed.context(), "https://vocab.test/terms#");
    }

    #[test]
    fn test_malformed_types_dropped() {
        assert!(ItemType::parse("Person").is_none());
        assert!(ItemType::parse("https://schema.org/").is_none());
    }

    #[test]
    fn test_tokens_are_sets() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        tree.set_attr(div, ITEMREF, "a  b a\tc").unwrap();
        tree.set_attr(div, ITEMPROP, "name name").unwrap();
        assert_eq!(itemref_ids(&tree, div), vec!["a", "b", "c"]);
        assert_eq!(property_names(&tree, div), vec!["name"]);
    }

    #[test]
    fn test_identity_rules() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        tree.set_attr(div, ITEMSCOPE, "").unwrap();
        assert_eq!(identity(&tree, div, "https://a.test/page"), None);

        tree.set_attr(div, ID, "me").unwrap();
        assert_eq!(
            identity(&tree, div, "https://a.test/page").as_deref(),
            Some("https://a.test/page#me")
        );

        tree.set_attr(div, ITEMID, "/people/1#p").unwrap();
        assert_eq!(
            identity(&tree, div, "https://a.test/page").as_deref(),
            Some("https://a.test/people/1#p")
        );

        tree.set_attr(div, ITEMID, "http://[bad").unwrap();
        assert_eq!(identity(&tree, div, "https://a.test/page"), None);
    }
}
