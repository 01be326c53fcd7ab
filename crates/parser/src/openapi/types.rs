//! OpenAPI document types
//!
//! Only the parts needed to reach schema definitions are modeled; paths and
//! operations are ignored.

use crate::schema::RawSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// OpenAPI or Swagger document root
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// Swagger version (e.g., "2.0")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swagger: Option<String>,

    /// OpenAPI version (e.g., "3.0.0")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openapi: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Info>,

    /// Swagger 2.0 definitions
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: BTreeMap<String, RawSchema>,

    /// OpenAPI 3 reusable components
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

/// API information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    pub title: String,

    /// Kubernetes release (e.g., "v1.30.2")
    pub version: String,
}

/// Reusable components
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub schemas: BTreeMap<String, RawSchema>,
}

impl OpenApiDocument {
    /// Schema definitions keyed by dotted identifier
    pub fn schemas(&self) -> &BTreeMap<String, RawSchema> {
        match &self.components {
            Some(components) if self.definitions.is_empty() => &components.schemas,
            _ => &self.definitions,
        }
    }
}
