//! OpenAPI document parser

use super::types::OpenApiDocument;
use crate::annotations::Annotations;
use crate::importer::Importer;
use crate::short_names::ShortNameIndex;
use kube_typegen_common::{GeneratorError, Result, TypeModel};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Kubernetes OpenAPI document parser
pub struct OpenApiParser {
    /// Loaded document
    document: OpenApiDocument,

    /// Per-property overrides applied while importing
    annotations: Annotations,
}

impl OpenApiParser {
    /// Load a document from a JSON (or YAML) file
    ///
    /// # Example
    /// ```rust,ignore
    /// let parser = OpenApiParser::from_file("swagger.json")?;
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            GeneratorError::Parse(format!(
                "Failed to read OpenAPI file {}: {}",
                path.display(),
                e
            ))
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    /// Parse a document from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let document: OpenApiDocument = serde_json::from_str(json)
            .map_err(|e| GeneratorError::Parse(format!("Failed to parse OpenAPI JSON: {}", e)))?;
        Ok(Self::from_document(document))
    }

    /// Parse a document from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let document: OpenApiDocument = serde_yaml::from_str(yaml)
            .map_err(|e| GeneratorError::Parse(format!("Failed to parse OpenAPI YAML: {}", e)))?;
        Ok(Self::from_document(document))
    }

    pub fn from_document(document: OpenApiDocument) -> Self {
        Self {
            document,
            annotations: Annotations::new(),
        }
    }

    /// Apply per-property overrides while importing
    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }

    /// Short name index over every definition
    pub fn short_names(&self) -> Result<ShortNameIndex> {
        ShortNameIndex::build(self.document.schemas().keys())
    }

    /// Compile every definition of the document
    pub fn parse(&self) -> Result<TypeModel> {
        let schemas = self.document.schemas();
        info!("Importing {} definitions", schemas.len());

        let mut importer = Importer::new(&self.annotations).with_definitions(schemas);
        for key in schemas.keys() {
            importer.import_ref(key)?;
        }
        importer.finish()
    }

    /// Compile the requested types and everything they reference
    ///
    /// Types may be given by short name (`Deployment`) or full key.
    pub fn parse_types<S: AsRef<str>>(&self, requested: &[S]) -> Result<TypeModel> {
        let schemas = self.document.schemas();
        let index = self.short_names()?;

        let mut importer = Importer::new(&self.annotations).with_definitions(schemas);
        for name in requested {
            let key = index.resolve(name.as_ref())?;
            debug!("Resolved {} to {}", name.as_ref(), key);
            importer.import_ref(key)?;
        }

        let model = importer.finish()?;
        info!(
            "Imported {} types for {} requested",
            model.len(),
            requested.len()
        );
        Ok(model)
    }

    /// Get reference to the underlying document
    pub fn document(&self) -> &OpenApiDocument {
        &self.document
    }
}
