//! Per-property override annotations
//!
//! Annotation files map a type key to per-property overrides:
//!
//! ```yaml
//! meta.v1.ObjectMeta:
//!   managedFields: false          # delete the property
//! Certificate:
//!   secretTemplate: "#/definitions/io.k8s.api.core.v1.SecretReference"
//!   renewBefore:
//!     type: string
//!     snake_name: renew_before_duration
//!   issuerRef:
//!     type_name: IssuerReference
//! ```
//!
//! Type keys are matched as `group.version.Name` first, then by the type's
//! full name, then by its short name.

use crate::schema::RawSchema;
use kube_typegen_common::{GeneratorError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A parsed override for one property
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyOverride {
    /// Drop the property
    Delete,
    /// Replace the schema and/or rename
    Patch(PropertyPatch),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyPatch {
    /// Replacement schema; the original description is kept
    pub schema: Option<RawSchema>,

    /// Emitted field name
    pub snake_name: Option<String>,

    /// Name for the anonymous type the property declares
    pub type_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawOverride {
    Flag(bool),
    Ref(String),
    Detailed(OverrideSpec),
}

#[derive(Debug, Default, Deserialize)]
struct OverrideSpec {
    #[serde(rename = "$ref", default)]
    ref_path: Option<String>,

    #[serde(rename = "type", default)]
    schema_type: Option<String>,

    #[serde(default)]
    items: Option<RawSchema>,

    #[serde(default)]
    snake_name: Option<String>,

    #[serde(default)]
    type_name: Option<String>,
}

impl RawOverride {
    /// `true` keeps the property untouched and yields no override
    fn into_override(self) -> Option<PropertyOverride> {
        match self {
            RawOverride::Flag(true) => None,
            RawOverride::Flag(false) => Some(PropertyOverride::Delete),
            RawOverride::Ref(path) => Some(PropertyOverride::Patch(PropertyPatch {
                schema: Some(RawSchema::reference(&path)),
                ..PropertyPatch::default()
            })),
            RawOverride::Detailed(spec) => Some(PropertyOverride::Patch(spec.into_patch())),
        }
    }
}

impl OverrideSpec {
    fn into_patch(self) -> PropertyPatch {
        let schema = match (self.ref_path, self.schema_type, self.items) {
            (Some(path), Some(t), _) if t == "array" => Some(RawSchema {
                schema_type: Some(t),
                items: Some(Box::new(RawSchema::reference(&path))),
                ..RawSchema::default()
            }),
            (Some(path), _, _) => Some(RawSchema::reference(&path)),
            (None, Some(t), items) => Some(RawSchema {
                schema_type: Some(t),
                items: items.map(Box::new),
                ..RawSchema::default()
            }),
            (None, None, Some(items)) => Some(RawSchema {
                schema_type: Some("array".to_string()),
                items: Some(Box::new(items)),
                ..RawSchema::default()
            }),
            (None, None, None) => None,
        };

        PropertyPatch {
            schema,
            snake_name: self.snake_name,
            type_name: self.type_name,
        }
    }
}

/// Overrides of one type, keyed by property name
pub type TypeOverrides = BTreeMap<String, PropertyOverride>;

/// All loaded overrides, keyed by type
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    types: BTreeMap<String, TypeOverrides>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a single annotations document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut annotations = Self::new();
        annotations.merge_yaml(content)?;
        Ok(annotations)
    }

    /// Load a file, or every YAML/JSON file below a directory
    pub fn load(path: &Path) -> Result<Self> {
        let mut annotations = Self::new();

        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    GeneratorError::Parse(format!("Failed to walk {}: {}", path.display(), e))
                })?;
                if entry.file_type().is_file() && is_annotation_file(entry.path()) {
                    annotations.merge_file(entry.path())?;
                }
            }
        } else {
            annotations.merge_file(path)?;
        }

        debug!(types = annotations.types.len(), "Loaded annotations");
        Ok(annotations)
    }

    fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).map_err(|e| {
            GeneratorError::Parse(format!(
                "Failed to read annotations file {}: {}",
                path.display(),
                e
            ))
        })?;
        self.merge_yaml(&content).map_err(|e| {
            GeneratorError::Parse(format!(
                "Failed to parse annotations file {}: {}",
                path.display(),
                e
            ))
        })
    }

    fn merge_yaml(&mut self, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Ok(());
        }
        let raw: BTreeMap<String, BTreeMap<String, RawOverride>> = serde_yaml::from_str(content)?;

        for (type_key, properties) in raw {
            let entry = self.types.entry(type_key.clone()).or_default();
            for (property, raw_override) in properties {
                if let Some(parsed) = raw_override.into_override() {
                    if entry.insert(property.clone(), parsed).is_some() {
                        warn!(
                            "Override for {}.{} defined more than once; last one wins",
                            type_key, property
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Overrides for the first key that has any
    pub fn for_type<S: AsRef<str>>(&self, keys: &[S]) -> Option<&TypeOverrides> {
        keys.iter().find_map(|key| self.types.get(key.as_ref()))
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn is_annotation_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml") | Some("json")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_forms() {
        let annotations = Annotations::from_yaml(
            r##"
meta.v1.ObjectMeta:
  managedFields: false
  name: true
Certificate:
  secretTemplate: "#/definitions/io.k8s.api.core.v1.SecretReference"
  renewBefore:
    type: string
    snake_name: renew_before_duration
  issuerRef:
    type_name: IssuerReference
  volumes:
    type: array
    $ref: "#/definitions/io.k8s.api.core.v1.Volume"
"##,
        )
        .unwrap();

        let meta = annotations.for_type(&["meta.v1.ObjectMeta"]).unwrap();
        assert_eq!(meta.get("managedFields"), Some(&PropertyOverride::Delete));
        assert!(!meta.contains_key("name"));

        let cert = annotations.for_type(&["x.Certificate", "Certificate"]).unwrap();
        match cert.get("secretTemplate") {
            Some(PropertyOverride::Patch(patch)) => {
                let schema = patch.schema.as_ref().unwrap();
                assert_eq!(
                    schema.ref_path.as_deref(),
                    Some("#/definitions/io.k8s.api.core.v1.SecretReference")
                );
            }
            other => panic!("unexpected override: {:?}", other),
        }

        match cert.get("renewBefore") {
            Some(PropertyOverride::Patch(patch)) => {
                assert_eq!(
                    patch.schema.as_ref().unwrap().schema_type.as_deref(),
                    Some("string")
                );
                assert_eq!(patch.snake_name.as_deref(), Some("renew_before_duration"));
            }
            other => panic!("unexpected override: {:?}", other),
        }

        match cert.get("issuerRef") {
            Some(PropertyOverride::Patch(patch)) => {
                assert!(patch.schema.is_none());
                assert_eq!(patch.type_name.as_deref(), Some("IssuerReference"));
            }
            other => panic!("unexpected override: {:?}", other),
        }

        match cert.get("volumes") {
            Some(PropertyOverride::Patch(patch)) => {
                let schema = patch.schema.as_ref().unwrap();
                assert_eq!(schema.schema_type.as_deref(), Some("array"));
                assert!(schema.items.as_ref().unwrap().ref_path.is_some());
            }
            other => panic!("unexpected override: {:?}", other),
        }
    }

    #[test]
    fn test_for_type_key_order() {
        let annotations =
            Annotations::from_yaml("Spec:\n  a: false\nFooSpec:\n  b: false\n").unwrap();
        let found = annotations.for_type(&["FooSpec", "Spec"]).unwrap();
        assert!(found.contains_key("b"));
        assert!(annotations.for_type(&["Missing"]).is_none());
    }

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.yaml"), "Foo:\n  x: false\n").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/b.yml"), "Bar:\n  y: false\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "not: [yaml").unwrap();

        let annotations = Annotations::load(dir.path()).unwrap();
        assert!(annotations.for_type(&["Foo"]).is_some());
        assert!(annotations.for_type(&["Bar"]).is_some());
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "Foo: [1, 2").unwrap();
        assert!(matches!(
            Annotations::load(&path),
            Err(GeneratorError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_document() {
        assert!(Annotations::from_yaml("").unwrap().is_empty());
    }
}
