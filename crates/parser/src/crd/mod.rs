//! CustomResourceDefinition importer
//!
//! Loads CRD manifests from files or directories and compiles the schema of
//! each CRD's preferred version into a type model, one group per API group.
//! Nested objects matching well-known Kubernetes signatures are replaced by
//! references to the canonical types.
//!
//! ## Usage
//! ```rust,ignore
//! use kube_typegen_parser::crd::CrdParser;
//!
//! let parser = CrdParser::from_path("crds/")?;
//! let model = parser.parse()?;
//! ```

mod loader;
mod parser;
mod types;

pub use loader::{load_crds, parse_documents};
pub use parser::CrdParser;
pub use types::*;
