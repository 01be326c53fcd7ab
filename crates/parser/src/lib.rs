//! Schema importers for Kubernetes type definitions
//!
//! This crate compiles Kubernetes schemas into the shared type model
//! (`TypeModel`).
//!
//! ## Import Strategy
//!
//! Two sources are supported:
//! - OpenAPI documents published by the API server (`openapi`)
//! - CustomResourceDefinition manifests (`crd`)
//!
//! Both feed the same work-list importer:
//! - Named definitions are registered on first reference and parsed later
//! - Nested objects become anonymous types named after their property
//! - Annotations can delete, retype or rename individual properties
//! - In CRDs, objects shaped like well-known Kubernetes types are replaced
//!   by references to them

mod annotations;
pub mod crd;
mod importer;
mod inference;
pub mod openapi;
mod schema;
mod short_names;

pub use annotations::{Annotations, PropertyOverride, PropertyPatch, TypeOverrides};
pub use crd::CrdParser;
pub use importer::{is_namespaced_kind, Importer, CLUSTER_SCOPED_KINDS};
pub use inference::{Signature, SignatureMatcher, SIGNATURES};
pub use openapi::OpenApiParser;
pub use schema::{AdditionalProperties, GroupVersionKind, RawSchema, SchemaNode, StringFormat};
pub use short_names::ShortNameIndex;

use kube_typegen_common::{GeneratorConfig, Result, TypeModel};
use std::path::Path;

/// Compile the requested types of an OpenAPI document
///
/// # Arguments
/// * `schema` - Path to the OpenAPI JSON/YAML document
/// * `types` - Short names or full keys; empty imports every definition
/// * `annotations` - Per-property overrides
pub fn import_openapi<S: AsRef<str>>(
    schema: &Path,
    types: &[S],
    annotations: Annotations,
) -> Result<TypeModel> {
    let parser = OpenApiParser::from_file(schema)?.with_annotations(annotations);
    if types.is_empty() {
        parser.parse()
    } else {
        parser.parse_types(types)
    }
}

/// Compile every CRD found under the given files or directories
pub fn import_crds<P: AsRef<Path>>(
    sources: &[P],
    annotations: Annotations,
    config: GeneratorConfig,
) -> Result<TypeModel> {
    CrdParser::from_paths(sources)?
        .with_annotations(annotations)
        .with_config(config)
        .parse()
}
