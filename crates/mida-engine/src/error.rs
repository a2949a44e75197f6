//! Error types
//!
//! Structural problems in the tree never surface here: malformed types or
//! identities, missing itemref targets and itemref cycles degrade silently.
//! Validation failures are values, not errors.

use mida_dom::{DomError, NodeId};
use mida_net::NetError;

/// Writes through a live item
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindError {
    #[error("no node contributes property `{0}`")]
    UnknownProperty(String),

    #[error("property `{property}` cannot take this value: {reason}")]
    NotWritable { property: String, reason: String },

    #[error("node {0} is not an item")]
    NotAnItem(NodeId),

    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Fetching the canonical location of a referenced item
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("node {0} is not an item")]
    NotAnItem(NodeId),

    #[error("item has no itemid to fetch")]
    MissingItemId,

    #[error("itemid `{0}` is not a valid URL")]
    InvalidItemId(String),

    #[error("itemid `{0}` has no fragment naming the item")]
    MissingFragment(String),

    #[error("fragment #{fragment} not found in {url}")]
    FragmentNotFound { url: String, fragment: String },

    #[error("fetching {url} failed with HTTP status {status}")]
    Http { url: String, status: u16 },

    #[error("fetching {url} failed: {source}")]
    Net { url: String, #[source] source: NetError },

    #[error("could not read {url}: {message}")]
    Parse { url: String, message: String },

    #[error(transparent)]
    Bind(#[from] BindError),
}

/// Schema loading and the loading precondition of validation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("schema {url} has not finished loading")]
    NotLoaded { url: String },

    #[error("failed to fetch schema {url}: {source}")]
    Fetch { url: String, #[source] source: NetError },

    #[error("failed to parse schema {url}: {message}")]
    Parse { url: String, message: String },
}

impl SchemaError {
    /// Short machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotLoaded { .. } => "not-loaded",
            Self::Fetch { .. } => "fetch",
            Self::Parse { .. } => "parse",
        }
    }

    /// URL of the schema involved
    pub fn url(&self) -> &str {
        match self {
            Self::NotLoaded { url } | Self::Fetch { url, .. } | Self::Parse { url, .. } => url,
        }
    }
}

/// Template instantiation and auto-sync setup
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("template {0} has no element to instantiate")]
    EmptyTemplate(NodeId),

    #[error("container {0} does not name a source item type")]
    MissingSourceType(NodeId),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Dom(#[from] DomError),
}
