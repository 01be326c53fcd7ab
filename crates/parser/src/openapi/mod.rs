//! Kubernetes OpenAPI document importer
//!
//! Reads the definitions published by the API server (Swagger 2.0
//! `definitions` or OpenAPI 3 `components.schemas`) and compiles them, or a
//! requested subset, into a finalized type model.
//!
//! ## OpenAPI Sources
//! - From a cluster: `kubectl get --raw /openapi/v2 > swagger.json`
//! - From GitHub: `https://github.com/kubernetes/kubernetes/blob/master/api/openapi-spec/swagger.json`
//!
//! ## Usage
//! ```rust,ignore
//! use kube_typegen_parser::openapi::OpenApiParser;
//!
//! let parser = OpenApiParser::from_file("swagger.json")?;
//! let model = parser.parse_types(&["Deployment"])?;
//! ```

mod parser;
mod types;

pub use parser::OpenApiParser;
pub use types::*;
