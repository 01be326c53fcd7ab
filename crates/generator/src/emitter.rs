//! Pluggable source emitters

use kube_typegen_common::{GroupKey, Result, TypeModel};

/// Renders a finalized [`TypeModel`] into source files of one target language
///
/// Every group becomes one module; a base module carries the well-known
/// aliases and an index module declares the others.
#[cfg_attr(test, mockall::automock)]
pub trait Emitter {
    /// Module (and file stem) a group is emitted into
    fn module_name(&self, group: &GroupKey) -> String;

    /// Render one finalized group
    fn emit_group(&self, model: &TypeModel, group: &GroupKey) -> Result<String>;

    /// Render the base module shared by all groups
    fn emit_base(&self) -> Result<String>;

    /// Render the index module declaring the given group modules
    fn emit_index(&self, modules: &[String]) -> Result<String>;

    /// File extension of emitted modules
    fn extension(&self) -> String;
}
