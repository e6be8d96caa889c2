pub mod check;
pub mod normalize;
pub mod render;

pub use check::{check, CheckArgs};
pub use normalize::{normalize, NormalizeArgs};
pub use render::{excerpt, render, ExcerptArgs, RenderArgs};

use anyhow::{Context, Result};
use scribe_model::{deserialize_with, DeserializeReport, DocumentTree, NodeRegistry};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Read a stored document: any accepted JSON shape, or plain text
pub(crate) fn load_document(path: &Path) -> Result<(DocumentTree, DeserializeReport)> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    Ok(deserialize_with(&Value::String(content), NodeRegistry::global()))
}

/// Write to `output`, or stdout when none is given
pub(crate) fn emit(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, content).with_context(|| format!("Cannot write {}", path.display()))
        }
        None => {
            println!("{content}");
            Ok(())
        }
    }
}
