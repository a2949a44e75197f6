//! Notifications for host listeners
//!
//! Each notification becomes a bubbling [`DomEvent`] whose detail is the
//! serialized payload.

use crate::error::SchemaError;
use crate::schema::{LoadReport, Violation, ViolationKind};
use mida_dom::{DomEvent, NodeId};
use serde::Serialize;

pub const SCHEMAS_LOADED: &str = "schemasloaded";
pub const SCHEMA_ERROR: &str = "schemaerror";
pub const INVALID_DATA: &str = "invaliddata";

/// Event payloads emitted by the schema system
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Notification {
    SchemasLoaded {
        loaded: usize,
        failed: usize,
        total: usize,
    },
    SchemaError {
        #[serde(rename = "schemaURL")]
        schema_url: String,
        error: String,
        message: String,
    },
    InvalidData {
        property: String,
        #[serde(rename = "type")]
        kind: ViolationKind,
        expected: String,
        schema: String,
    },
}

impl Notification {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SchemasLoaded { .. } => SCHEMAS_LOADED,
            Self::SchemaError { .. } => SCHEMA_ERROR,
            Self::InvalidData { .. } => INVALID_DATA,
        }
    }

    pub fn loaded(report: &LoadReport) -> Self {
        Self::SchemasLoaded { loaded: report.loaded, failed: report.failed, total: report.total }
    }

    pub fn schema_error(err: &SchemaError) -> Self {
        Self::SchemaError {
            schema_url: err.url().to_string(),
            error: err.kind().to_string(),
            message: err.to_string(),
        }
    }

    pub fn invalid(violation: &Violation) -> Self {
        Self::InvalidData {
            property: violation.property.clone(),
            kind: violation.kind,
            expected: violation.expected.clone(),
            schema: violation.schema.clone(),
        }
    }

    /// Bubbling event targeted at `target`
    pub fn to_event(&self, target: NodeId) -> DomEvent {
        let detail = serde_json::to_value(self).unwrap_or_default();
        DomEvent::custom(self.event_type(), target, detail)
    }
}
