//! Source generation for finalized type models
//!
//! This crate renders a finalized `TypeModel` through an [`Emitter`] and
//! writes the result as a module tree:
//! - one module per group (e.g., `apps_v1.rs`, `cert_manager_io.rs`)
//! - `base.rs` with the well-known aliases and resource traits
//! - `mod.rs` declaring all of the above

mod emitter;
mod rust;
mod templates;

pub use emitter::Emitter;
pub use rust::RustEmitter;

use kube_typegen_common::{GeneratorError, Result, TypeModel};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes every group of a model through an emitter
pub struct ModelGenerator<'m, E: Emitter> {
    model: &'m TypeModel,
    emitter: E,
}

impl<'m, E: Emitter> ModelGenerator<'m, E> {
    pub fn new(model: &'m TypeModel, emitter: E) -> Self {
        Self { model, emitter }
    }

    /// Generate all modules to a directory, returning the written paths
    pub fn generate_to_directory(&self, output_dir: &Path) -> Result<Vec<PathBuf>> {
        if let Some(pending) = self
            .model
            .group_keys()
            .find(|key| self.model.finalized(key).is_none())
        {
            return Err(GeneratorError::Generation(format!(
                "Group {} has not been finalized",
                pending
            )));
        }

        fs::create_dir_all(output_dir).map_err(|e| {
            GeneratorError::Generation(format!("Failed to create output directory: {}", e))
        })?;

        let extension = self.emitter.extension();
        let mut written = Vec::new();
        let mut modules = Vec::new();

        for (key, _) in self.model.finalized_groups() {
            let module = self.emitter.module_name(key);
            let source = self.emitter.emit_group(self.model, key)?;
            written.push(write_module(output_dir, &module, &extension, &source)?);
            debug!("Wrote module {} for group {}", module, key);
            modules.push(module);
        }

        let base = self.emitter.emit_base()?;
        written.push(write_module(output_dir, "base", &extension, &base)?);

        let index = self.emitter.emit_index(&modules)?;
        written.push(write_module(output_dir, "mod", &extension, &index)?);

        info!(
            "Generated {} modules in {}",
            modules.len(),
            output_dir.display()
        );
        Ok(written)
    }
}

fn write_module(dir: &Path, module: &str, extension: &str, source: &str) -> Result<PathBuf> {
    let path = dir.join(format!("{}.{}", module, extension));
    fs::write(&path, source).map_err(|e| {
        GeneratorError::Generation(format!("Failed to write {}: {}", path.display(), e))
    })?;
    Ok(path)
}

/// Generate Rust modules for a model (convenience function)
pub fn generate_rust(
    model: &TypeModel,
    api_module: &str,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let emitter = RustEmitter::new(api_module)?;
    ModelGenerator::new(model, emitter).generate_to_directory(output_dir)
}
