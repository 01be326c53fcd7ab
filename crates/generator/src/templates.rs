//! Template loading and management

use kube_typegen_common::{GeneratorError, Result};
use std::collections::HashMap;
use tera::{Tera, Value};

/// Load the Rust emitter templates
pub fn load_templates() -> Result<Tera> {
    let mut tera = Tera::default();

    tera.register_filter("doc", doc_filter);

    tera.add_raw_template("group.rs", include_str!("../templates/group.rs.tera"))
        .map_err(|e| {
            GeneratorError::Generation(format!("Failed to load group.rs template: {}", e))
        })?;

    tera.add_raw_template("base.rs", include_str!("../templates/base.rs.tera"))
        .map_err(|e| {
            GeneratorError::Generation(format!("Failed to load base.rs template: {}", e))
        })?;

    tera.add_raw_template("mod.rs", include_str!("../templates/mod.rs.tera"))
        .map_err(|e| {
            GeneratorError::Generation(format!("Failed to load mod.rs template: {}", e))
        })?;

    Ok(tera)
}

/// Filter rendering a description as `///` lines, each ending in a newline
///
/// `null` renders as nothing. `indent` sets the leading spaces.
fn doc_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = match value {
        Value::Null => return Ok(Value::String(String::new())),
        Value::String(s) => s,
        _ => return Err(tera::Error::msg("doc filter expects a string")),
    };

    let indent = " ".repeat(args.get("indent").and_then(Value::as_u64).unwrap_or(0) as usize);
    let mut out = String::new();
    for line in text.trim().lines() {
        let line = line.trim_end();
        if line.is_empty() {
            out.push_str(&format!("{}///\n", indent));
        } else {
            out.push_str(&format!("{}/// {}\n", indent, line));
        }
    }
    Ok(Value::String(out))
}
