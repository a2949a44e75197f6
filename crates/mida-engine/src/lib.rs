//! mida Engine
//!
//! Live microdata binding for HTML documents.
//!
//! # Features
//! - Item extraction with `itemref` resolution and cycle safety
//! - Live item views: cached reads, writes through the tree
//! - Collection of top-level items kept current at each flush
//! - Schema loading (coalesced, cached) with strict and permissive validation
//! - Template rendering and auto-synced containers
//!
//! # Example
//! ```rust,ignore
//! use mida_engine::{Binder, Config};
//!
//! let mut binder = Binder::new(Config::default(), fetcher);
//! let id = binder.attach(mida_engine::html::parse(markup)?);
//! let scope = binder.scope(id).unwrap();
//! let person = scope.item_by_id("ada").unwrap();
//! person.set("name", &"Ada Lovelace".into())?;
//! scope.flush();
//! ```

mod config;
mod error;
pub mod vocab;
mod item;
pub mod extract;
mod builder;
mod bind;
mod live;
mod collection;
mod source;
pub mod schema;
pub mod notify;
pub mod template;
mod scope;
mod binder;
mod reference;

pub use config::Config;
pub use error::{BindError, FetchError, RenderError, SchemaError};
pub use vocab::ItemType;
pub use item::{Item, Property, Value};
pub use builder::{Builder, Layout};
pub use bind::Writer;
pub use live::LiveItem;
pub use collection::{Collection, CollectionChange};
pub use source::{Source, normalize_form};
pub use schema::{
    Cardinality, LoadReport, Schema, SchemaKind, SchemaRegistry, SchemaState, Validation, Violation,
    ViolationKind,
};
pub use notify::Notification;
pub use template::{AutoSync, SyncStats, Template, render, render_data};
pub use scope::Scope;
pub use binder::{Binder, ScopeId};

// Re-export sub-crates for advanced usage
pub use mida_dom as dom;
pub use mida_html as html;
pub use mida_net as net;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
