//! CustomResourceDefinition manifest types

use crate::schema::RawSchema;
use kube_typegen_common::compare_versions;
use serde::{Deserialize, Serialize};

/// `apiextensions.k8s.io/v1` CustomResourceDefinition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomResourceDefinition {
    #[serde(default)]
    pub api_version: String,

    pub kind: String,

    #[serde(default)]
    pub metadata: CrdMetadata,

    pub spec: CrdSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrdMetadata {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdSpec {
    /// API group (e.g., "cert-manager.io")
    pub group: String,

    pub names: CrdNames,

    /// "Namespaced" or "Cluster"
    pub scope: String,

    #[serde(default)]
    pub versions: Vec<CrdVersion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdNames {
    pub kind: String,

    pub plural: String,

    #[serde(default)]
    pub singular: Option<String>,

    #[serde(default)]
    pub list_kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrdVersion {
    pub name: String,

    #[serde(default = "default_true")]
    pub served: bool,

    #[serde(default)]
    pub storage: bool,

    #[serde(default)]
    pub schema: Option<CrdValidation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrdValidation {
    #[serde(rename = "openAPIV3Schema")]
    pub open_api_v3_schema: RawSchema,
}

fn default_true() -> bool {
    true
}

impl CustomResourceDefinition {
    pub fn is_namespaced(&self) -> bool {
        self.spec.scope == "Namespaced"
    }

    /// Most stable served version that carries a schema
    pub fn preferred_version(&self) -> Option<&CrdVersion> {
        self.spec
            .versions
            .iter()
            .filter(|v| v.served && v.schema.is_some())
            .max_by(|a, b| compare_versions(&a.name, &b.name))
    }

    pub fn storage_version(&self) -> Option<&CrdVersion> {
        self.spec.versions.iter().find(|v| v.storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CRD: &str = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: widgets.example.com
spec:
  group: example.com
  names:
    kind: Widget
    plural: widgets
  scope: Cluster
  versions:
    - name: v1alpha1
      served: true
      storage: true
      schema:
        openAPIV3Schema:
          type: object
    - name: v1
      served: true
      storage: false
      schema:
        openAPIV3Schema:
          type: object
    - name: v2
      served: false
      schema:
        openAPIV3Schema:
          type: object
"#;

    #[test]
    fn test_preferred_version() {
        let crd: CustomResourceDefinition = serde_yaml::from_str(CRD).unwrap();
        assert!(!crd.is_namespaced());
        assert_eq!(crd.preferred_version().unwrap().name, "v1");
        assert_eq!(crd.storage_version().unwrap().name, "v1alpha1");
    }
}
