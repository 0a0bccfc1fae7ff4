pub mod analyze;
pub mod apply;
pub mod check_schema;
pub mod init;
pub mod render;

pub use analyze::{analyze, AnalyzeArgs};
pub use apply::{apply, ApplyArgs};
pub use check_schema::{check_schema, CheckSchemaArgs};
pub use init::{init, InitArgs};
pub use render::{render, RenderArgs};

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use stencil_model::Template;

/// `path` as given when absolute, otherwise relative to `cwd`
pub(crate) fn resolve(cwd: &str, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        PathBuf::from(cwd).join(path)
    }
}

pub(crate) fn load_template(path: &Path) -> Result<Template> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read template {}", path.display()))?;
    Template::from_json(&json).with_context(|| format!("Invalid template {}", path.display()))
}

pub(crate) fn load_json(path: &Path) -> Result<Value> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid JSON in {}", path.display()))
}

pub(crate) fn load_data(path: &Path) -> Result<Map<String, Value>> {
    match load_json(path)? {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow::anyhow!(
            "Data file {} must contain a JSON object",
            path.display()
        )),
    }
}

/// Output format shared by the reporting commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    Text,
    Json,
}

impl Format {
    pub(crate) fn parse(value: &str) -> Result<Self> {
        match value {
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            other => Err(anyhow::anyhow!("Invalid format: {}. Use: text or json", other)),
        }
    }
}
