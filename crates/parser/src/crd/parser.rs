//! CRD parser

use super::loader::{load_crds, parse_documents};
use super::types::CustomResourceDefinition;
use crate::annotations::Annotations;
use crate::importer::Importer;
use crate::inference::SignatureMatcher;
use kube_typegen_common::{
    ApiResourceInfo, GeneratorConfig, GroupKey, Result, TypeKind, TypeModel,
};
use std::path::Path;
use tracing::{info, warn};

/// CustomResourceDefinition parser
pub struct CrdParser {
    crds: Vec<CustomResourceDefinition>,
    annotations: Annotations,
    config: GeneratorConfig,
}

impl CrdParser {
    /// Load CRDs from a manifest file or directory
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(load_crds(path.as_ref())?))
    }

    /// Load CRDs from several files or directories
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut crds = Vec::new();
        for path in paths {
            crds.extend(load_crds(path.as_ref())?);
        }
        Ok(Self::new(crds))
    }

    /// Parse CRDs from a (possibly multi-document) YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(Self::new(parse_documents(content)?))
    }

    pub fn new(crds: Vec<CustomResourceDefinition>) -> Self {
        Self {
            crds,
            annotations: Annotations::new(),
            config: GeneratorConfig::default(),
        }
    }

    /// Apply per-property overrides while importing
    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn crds(&self) -> &[CustomResourceDefinition] {
        &self.crds
    }

    /// Compile every loaded CRD into a finalized model
    pub fn parse(&self) -> Result<TypeModel> {
        let mut importer = Importer::new(&self.annotations)
            .with_inference(SignatureMatcher::new(self.config.inference.clone()))
            .with_canonical_metadata();

        let mut crds: Vec<&CustomResourceDefinition> = self.crds.iter().collect();
        crds.sort_by(|a, b| {
            (&a.spec.group, &a.spec.names.kind).cmp(&(&b.spec.group, &b.spec.names.kind))
        });

        let mut imported = 0;
        for crd in crds {
            let names = &crd.spec.names;
            let Some(version) = crd.preferred_version() else {
                warn!(
                    "CRD {}/{} has no served version with a schema, skipping",
                    crd.spec.group, names.kind
                );
                continue;
            };
            let Some(validation) = &version.schema else {
                continue;
            };

            if let Some(storage) = crd.storage_version() {
                if storage.name != version.name {
                    warn!(
                        "CRD {}/{}: using version {} but storage version is {}",
                        crd.spec.group, names.kind, version.name, storage.name
                    );
                }
            }

            let info = ApiResourceInfo {
                api_version: format!("{}/{}", crd.spec.group, version.name),
                kind: names.kind.clone(),
                scoped: crd.is_namespaced(),
                plural: Some(names.plural.clone()),
            };
            importer.register_root(
                GroupKey::new(&crd.spec.group, None),
                &names.kind,
                TypeKind::ApiResource(info),
                &validation.open_api_v3_schema,
            );
            imported += 1;
        }

        let model = importer.finish()?;
        info!("Imported {} CRDs into {} types", imported, model.len());
        Ok(model)
    }
}
