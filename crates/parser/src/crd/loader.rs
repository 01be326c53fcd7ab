//! Loading CRD manifests from files and directories

use super::types::CustomResourceDefinition;
use kube_typegen_common::{GeneratorError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

const CRD_KIND: &str = "CustomResourceDefinition";
const LIST_KINDS: &[&str] = &["List", "CustomResourceDefinitionList"];

/// Load CRDs from a manifest file or recursively from a directory
///
/// Inside a directory, files that fail to parse are reported and skipped.
pub fn load_crds(path: &Path) -> Result<Vec<CustomResourceDefinition>> {
    if !path.is_dir() {
        return load_file(path);
    }

    let mut crds = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            GeneratorError::Parse(format!("Failed to walk {}: {}", path.display(), e))
        })?;
        if !entry.file_type().is_file() || !is_manifest(entry.path()) {
            continue;
        }

        match load_file(entry.path()) {
            Ok(found) => crds.extend(found),
            Err(e) => warn!("Skipping {}: {}", entry.path().display(), e),
        }
    }
    Ok(crds)
}

fn load_file(path: &Path) -> Result<Vec<CustomResourceDefinition>> {
    let content = fs::read_to_string(path).map_err(|e| {
        GeneratorError::Parse(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let crds = parse_documents(&content)?;
    debug!("Loaded {} CRDs from {}", crds.len(), path.display());
    Ok(crds)
}

/// Parse every CRD out of a (possibly multi-document) YAML or JSON string
///
/// Documents of other kinds are skipped; `List` documents are unpacked.
pub fn parse_documents(content: &str) -> Result<Vec<CustomResourceDefinition>> {
    let mut crds = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = serde_yaml::Value::deserialize(document)?;
        collect(value, &mut crds)?;
    }
    Ok(crds)
}

fn collect(value: serde_yaml::Value, crds: &mut Vec<CustomResourceDefinition>) -> Result<()> {
    if value.is_null() {
        return Ok(());
    }

    let kind = value
        .get("kind")
        .and_then(|k| k.as_str())
        .unwrap_or_default()
        .to_string();

    if kind == CRD_KIND {
        crds.push(serde_yaml::from_value(value)?);
    } else if LIST_KINDS.contains(&kind.as_str()) {
        if let Some(serde_yaml::Value::Sequence(items)) = value.get("items") {
            for item in items.clone() {
                collect(item, crds)?;
            }
        }
    } else {
        debug!("Skipping document of kind '{}'", kind);
    }
    Ok(())
}

fn is_manifest(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml") | Some("json")
    )
}
