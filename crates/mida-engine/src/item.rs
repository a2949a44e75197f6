//! Item model
//!
//! Plain extracted data: an [`Item`] owns its properties and no longer
//! refers back to the tree except through node ids.

use crate::vocab::{ItemType, KEY_CONTEXT, KEY_ID, KEY_TYPE};
use indexmap::IndexMap;
use mida_dom::NodeId;
use serde_json::{Map, Value as Json};

/// One property value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Extracted text or attribute content
    Text(String),
    /// Nested item with its own data in this document
    Item(Box<Item>),
    /// Scoped node known only by the identity of its canonical location
    Reference { node: NodeId, identity: String },
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            Self::Item(item) => Some(item),
            _ => None,
        }
    }

    /// JSON form; references serialize as `{"@id": identity}`
    pub fn to_json(&self) -> Json {
        match self {
            Self::Text(t) => Json::String(t.clone()),
            Self::Item(item) => item.to_json(),
            Self::Reference { identity, .. } => {
                let mut map = Map::new();
                map.insert(KEY_ID.to_string(), Json::String(identity.clone()));
                Json::Object(map)
            }
        }
    }
}

/// Value(s) of one property name
///
/// A single contribution stays scalar; a second one promotes the property
/// to a sequence in discovery order.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    One(Value),
    Many(Vec<Value>),
}

impl Property {
    /// Add a contribution, promoting to a sequence when needed
    pub fn push(self, value: Value) -> Self {
        match self {
            Self::One(first) => Self::Many(vec![first, value]),
            Self::Many(mut values) => {
                values.push(value);
                Self::Many(values)
            }
        }
    }

    /// Build from contributions in order; `None` when there are none
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Option<Self> {
        values.into_iter().fold(None, |acc, v| match acc {
            None => Some(Self::One(v)),
            Some(p) => Some(p.push(v)),
        })
    }

    pub fn values(&self) -> &[Value] {
        match self {
            Self::One(v) => std::slice::from_ref(v),
            Self::Many(vs) => vs,
        }
    }

    /// First contribution; `None` only for an empty `Many`
    pub fn first(&self) -> Option<&Value> {
        self.values().first()
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    /// Scalar text, when the property holds exactly one text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::One(v) => v.as_text(),
            Self::Many(_) => None,
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            Self::One(v) => v.to_json(),
            Self::Many(vs) => Json::Array(vs.iter().map(Value::to_json).collect()),
        }
    }
}

/// Structured entity extracted from a scoped subtree
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub(crate) node: NodeId,
    pub(crate) types: Vec<ItemType>,
    pub(crate) identity: Option<String>,
    pub(crate) properties: IndexMap<String, Property>,
}

impl Item {
    pub(crate) fn new(node: NodeId, types: Vec<ItemType>, identity: Option<String>) -> Self {
        Self { node, types, identity, properties: IndexMap::new() }
    }

    /// Scope root the item was extracted from
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// All declared types; the first is primary
    pub fn types(&self) -> &[ItemType] {
        &self.types
    }

    /// Primary type
    pub fn item_type(&self) -> Option<&ItemType> {
        self.types.first()
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> &IndexMap<String, Property> {
        &self.properties
    }

    /// Reserved keys that apply to this item, then property names
    pub fn keys(&self) -> Vec<String> {
        reserved_keys(self.item_type(), self.identity())
            .chain(self.properties.keys().cloned())
            .collect()
    }

    /// Plain JSON object with reserved keys first
    pub fn to_json(&self) -> Json {
        let mut map = reserved_map(self.item_type(), self.identity());
        for (name, property) in &self.properties {
            map.insert(name.clone(), property.to_json());
        }
        Json::Object(map)
    }
}

pub(crate) fn reserved_keys(
    item_type: Option<&ItemType>,
    identity: Option<&str>,
) -> impl Iterator<Item = String> {
    let mut keys = Vec::with_capacity(3);
    if item_type.is_some() {
        keys.push(KEY_TYPE.to_string());
        keys.push(KEY_CONTEXT.to_string());
    }
    if identity.is_some() {
        keys.push(KEY_ID.to_string());
    }
    keys.into_iter()
}

pub(crate) fn reserved_map(
    item_type: Option<&ItemType>,
    identity: Option<&str>,
) -> Map<String, Json> {
    let mut map = Map::new();
    if let Some(t) = item_type {
        map.insert(KEY_TYPE.to_string(), Json::String(t.name().to_string()));
        map.insert(KEY_CONTEXT.to_string(), Json::String(t.context().to_string()));
    }
    if let Some(id) = identity {
        map.insert(KEY_ID.to_string(), Json::String(id.to_string()));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_single_value_stays_scalar() {
        let p = Property::from_values([text("a")]).unwrap();
        assert!(!p.is_many());
        assert_eq!(p.to_json(), json!("a"));
    }

    #[test]
    fn test_promotion_keeps_order() {
        let p = Property::from_values([text("a"), text("b"), text("c")]).unwrap();
        assert!(p.is_many());
        assert_eq!(p.to_json(), json!(["a", "b", "c"]));
        assert_eq!(p.first(), Some(&text("a")));
        assert!(Property::from_values(Vec::new()).is_none());
        let empty = Property::Many(Vec::new());
        assert_eq!(empty.first(), None);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_item_json_reserved_keys() {
        let mut item = Item::new(
            NodeId::ROOT,
            vec![ItemType::parse("https://schema.org/Person").unwrap()],
            Some("https://a.test/#p".into()),
        );
        item.properties.insert("name".into(), Property::One(text("Ada")));
        item.properties.insert("knows".into(), Property::One(Value::Reference {
            node: NodeId::ROOT,
            identity: "https://b.test/#q".into(),
        }));

        assert_eq!(item.keys(), vec!["@type", "@context", "@id", "name", "knows"]);
        assert_eq!(item.to_json(), json!({
            "@type": "Person",
            "@context": "https://schema.org/",
            "@id": "https://a.test/#p",
            "name": "Ada",
            "knows": {"@id": "https://b.test/#q"}
        }));
    }
}
