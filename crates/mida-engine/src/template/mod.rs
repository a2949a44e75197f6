//! Templates
//!
//! [`render`] instantiates a template against a source. [`AutoSync`] keeps
//! a container's rendered clones reconciled with the items of one type.

pub mod interpolate;
mod render;
mod sync;

pub use render::{Template, render, render_data};
pub use sync::{AutoSync, SyncStats};
