//! Common types and utilities for kube-typegen
//!
//! This crate contains the type model shared by the importers and emitters:
//! naming utilities, qualified-name parsing, the type arena with its groups,
//! the group finalizer, and the generator configuration.

mod config;
mod finalize;
pub mod model;
pub mod naming;
mod qualified_name;

pub use config::{GeneratorConfig, InferenceConfig};
pub use finalize::{ordering_index, FinalizedGroup};
pub use model::{
    ApiResourceInfo, ApiType, GroupKey, Primitive, Property, QualifiedRef, TypeExpr, TypeId,
    TypeKind, TypeModel, WellKnown,
};
pub use qualified_name::{compare_versions, strip_ref_prefix, QualifiedName, GROUP_PREFIXES};

use thiserror::Error;

/// Errors that can occur while compiling schemas into the type model
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Unknown API group for schema identifier: {0}")]
    UnknownGroup(String),

    #[error("Requested type not found: {0}")]
    UnknownTypeRequested(String),

    #[error("Unsupported schema shape in {context}: {detail}")]
    UnsupportedSchemaShape { context: String, detail: String },

    #[error("Unsupported format '{format}' for type '{type_}'")]
    UnsupportedFormat { type_: String, format: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, GeneratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GeneratorError::UnknownGroup("com.example.v1.Foo".to_string());
        assert_eq!(
            err.to_string(),
            "Unknown API group for schema identifier: com.example.v1.Foo"
        );

        let err = GeneratorError::UnsupportedSchemaShape {
            context: "Foo.bar".to_string(),
            detail: "no type".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported schema shape in Foo.bar: no type");
    }
}
