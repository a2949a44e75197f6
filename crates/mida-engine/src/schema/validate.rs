//! Cardinality and type checks

use super::{Schema, SchemaKind};
use crate::vocab::{self, ItemType};
use serde::Serialize;
use serde_json::{Map, Value as Json};
use url::Url;

/// Which constraint a value broke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationKind {
    Cardinality,
    Type,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cardinality => "cardinality",
            Self::Type => "type",
        }
    }
}

/// One failed constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub property: String,
    pub kind: ViolationKind,
    /// The constraint, in schema notation (`1`, `0..1`, `URL`, ...)
    pub expected: String,
    pub schema: String,
}

/// Outcome of validating a source
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// Normalized data with `@type` and `@context` attached
    Valid(Json),
    Invalid(Vec<Violation>),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn data(&self) -> Option<&Json> {
        match self {
            Self::Valid(data) => Some(data),
            Self::Invalid(_) => None,
        }
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Valid(_) => &[],
            Self::Invalid(v) => v,
        }
    }
}

/// Attach `@type` and `@context` from the schema URL when absent
pub(crate) fn tag(mut data: Map<String, Json>, schema_url: &str) -> Json {
    if let Some(t) = ItemType::parse(schema_url) {
        if !data.contains_key(vocab::KEY_TYPE) {
            data.insert(vocab::KEY_TYPE.to_string(), Json::String(t.name().to_string()));
        }
        if !data.contains_key(vocab::KEY_CONTEXT) {
            data.insert(vocab::KEY_CONTEXT.to_string(), Json::String(t.context().to_string()));
        }
    }
    Json::Object(data)
}

pub(crate) fn check(schema: &Schema, data: Map<String, Json>) -> Validation {
    let strict = schema.kind == SchemaKind::Strict;
    let mut violations = Vec::new();
    for (name, def) in schema.definitions.borrow().iter() {
        let value = data.get(name);
        let count = count_values(value);
        if strict && !def.cardinality.allows(count) {
            violations.push(Violation {
                property: name.clone(),
                kind: ViolationKind::Cardinality,
                expected: def.cardinality.to_string(),
                schema: schema.url.clone(),
            });
            continue;
        }
        let Some(value_type) = def.value_type.as_deref() else { continue };
        if present_values(value).any(|v| !type_matches(value_type, v)) {
            violations.push(Violation {
                property: name.clone(),
                kind: ViolationKind::Type,
                expected: value_type.to_string(),
                schema: schema.url.clone(),
            });
        }
    }

    if violations.is_empty() {
        Validation::Valid(tag(data, &schema.url))
    } else {
        tracing::debug!(schema = %schema.url, violations = violations.len(), "validation failed");
        Validation::Invalid(violations)
    }
}

fn is_blank(value: &Json) -> bool {
    match value {
        Json::Null => true,
        Json::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn present_values(value: Option<&Json>) -> Box<dyn Iterator<Item = &Json> + '_> {
    match value {
        None => Box::new(std::iter::empty()),
        Some(Json::Array(items)) => Box::new(items.iter().filter(|v| !is_blank(v))),
        Some(v) if is_blank(v) => Box::new(std::iter::empty()),
        Some(v) => Box::new(std::iter::once(v)),
    }
}

/// Absent, null and empty values count as zero
fn count_values(value: Option<&Json>) -> usize {
    present_values(value).count()
}

fn is_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 10
        && b[4] == b'-'
        && b[7] == b'-'
        && [0, 1, 2, 3, 5, 6, 8, 9].iter().all(|&i| b[i].is_ascii_digit())
}

fn type_matches(value_type: &str, value: &Json) -> bool {
    match value_type {
        "Text" => !value.is_object() && !value.is_array(),
        "URL" => value.as_str().is_some_and(|s| Url::parse(s.trim()).is_ok()),
        "Number" => match value {
            Json::Number(_) => true,
            Json::String(s) => s.trim().parse::<f64>().is_ok(),
            _ => false,
        },
        "Boolean" => match value {
            Json::Bool(_) => true,
            Json::String(s) => matches!(s.trim(), "true" | "false"),
            _ => false,
        },
        "Date" => value.as_str().is_some_and(|s| s.trim().len() == 10 && is_date(s.trim())),
        "DateTime" => value.as_str().is_some_and(|s| {
            let s = s.trim();
            is_date(s) && s.as_bytes().get(10) == Some(&b'T')
        }),
        type_url => match value {
            Json::Object(map) => {
                let expected = ItemType::parse(type_url);
                match (map.get(vocab::KEY_TYPE).and_then(Json::as_str), expected) {
                    (Some(actual), Some(expected)) => actual == expected.name(),
                    _ => true,
                }
            }
            Json::String(s) => Url::parse(s.trim()).is_ok(),
            _ => false,
        },
    }
}
