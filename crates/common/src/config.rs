//! Generator configuration loaded from YAML
//!
//! All keys are optional; a missing file section falls back to defaults.
//!
//! ```yaml
//! api_module: k8s_models
//! inference:
//!   enabled: true
//!   max_unknown_fields: 1
//!   disabled: [Container]
//! ```

use crate::{GeneratorError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root structure for generator configuration files
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Module path emitted code uses to reach canonical Kubernetes types
    pub api_module: String,

    /// CRD structural inference settings
    pub inference: InferenceConfig,
}

/// CRD structural type inference settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Whether nested CRD objects are matched against known signatures
    pub enabled: bool,

    /// Properties outside a signature's field set still accepted as a match
    pub max_unknown_fields: usize,

    /// Signature names that are never substituted
    pub disabled: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_module: "k8s_models".to_string(),
            inference: InferenceConfig::default(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_unknown_fields: 0,
            disabled: Vec::new(),
        }
    }
}

impl InferenceConfig {
    /// Whether the named signature may be used
    pub fn allows(&self, signature: &str) -> bool {
        self.enabled && !self.disabled.iter().any(|d| d == signature)
    }
}

impl GeneratorConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GeneratorError::Parse(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::from_yaml(&content).map_err(|e| {
            GeneratorError::Parse(format!("Failed to parse config YAML from {:?}: {}", path, e))
        })
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}
