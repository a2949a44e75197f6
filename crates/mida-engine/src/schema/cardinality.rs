//! Cardinality constraints

use std::fmt;

/// Allowed number of values for a property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cardinality {
    pub min: usize,
    /// `None` is unbounded
    pub max: Option<usize>,
}

impl Cardinality {
    pub const EXACTLY_ONE: Self = Self { min: 1, max: Some(1) };
    pub const OPTIONAL: Self = Self { min: 0, max: Some(1) };
    pub const ANY: Self = Self { min: 0, max: None };

    /// Parse `1`, `0..1`, `0..*`, `*`, `m..n` or `m..*`
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text == "*" {
            return Some(Self::ANY);
        }
        match text.split_once("..") {
            None => {
                let n = text.parse().ok()?;
                Some(Self { min: n, max: Some(n) })
            }
            Some((min, max)) => {
                let min = min.trim().parse().ok()?;
                let max = match max.trim() {
                    "*" | "n" => None,
                    m => Some(m.parse().ok()?),
                };
                if max.is_some_and(|m| m < min) {
                    return None;
                }
                Some(Self { min, max })
            }
        }
    }

    pub fn allows(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|m| count <= m)
    }

    pub fn is_required(&self) -> bool {
        self.min > 0
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Self::ANY
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (min, Some(max)) if min == max => write!(f, "{min}"),
            (min, Some(max)) => write!(f, "{min}..{max}"),
            (min, None) => write!(f, "{min}..*"),
        }
    }
}
