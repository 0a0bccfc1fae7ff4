//! File-backed contract host: persists schema and example changes by
//! rewriting the template JSON file

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use stencil_model::{DataExample, Template};
use stencil_schema::{
    check_compatibility, extract_bound_expressions, CompatibilityReport, ContractHost,
    SaveOutcome, SchemaError, SchemaResult,
};
use tokio::sync::Mutex;
use tracing::debug;

pub struct FileHost {
    path: PathBuf,
    template: Mutex<Template>,
}

impl FileHost {
    pub fn new(path: impl Into<PathBuf>, template: Template) -> Self {
        Self {
            path: path.into(),
            template: Mutex::new(template),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn template(&self) -> Template {
        self.template.lock().await.clone()
    }

    async fn write(&self, template: &Template) -> SchemaResult<()> {
        let json = template.to_json_pretty()?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| SchemaError::Host(format!("{}: {}", self.path.display(), e)))?;
        debug!(path = %self.path.display(), "Wrote template");
        Ok(())
    }
}

#[async_trait]
impl ContractHost for FileHost {
    async fn save_schema(&self, schema: &Value, _force_update: bool) -> SchemaResult<SaveOutcome> {
        let mut template = self.template.lock().await;
        let mut updated = template.clone();
        updated.schema = Some(schema.clone());
        self.write(&updated).await?;
        *template = updated;

        Ok(SaveOutcome {
            success: true,
            warnings: Vec::new(),
        })
    }

    async fn save_data_examples(&self, examples: &[DataExample]) -> SchemaResult<()> {
        let mut template = self.template.lock().await;
        let mut updated = template.clone();
        updated.data_examples = examples.to_vec();
        self.write(&updated).await?;
        *template = updated;
        Ok(())
    }

    async fn update_data_example(&self, example: &DataExample) -> SchemaResult<()> {
        let mut template = self.template.lock().await;
        let mut updated = template.clone();
        updated.update_data_example(example.clone())?;
        self.write(&updated).await?;
        *template = updated;
        Ok(())
    }

    async fn delete_data_example(&self, id: &str) -> SchemaResult<()> {
        let mut template = self.template.lock().await;
        let mut updated = template.clone();
        updated.remove_data_example(id)?;
        self.write(&updated).await?;
        *template = updated;
        Ok(())
    }

    async fn validate_schema(
        &self,
        schema: &Value,
        examples: &[DataExample],
    ) -> SchemaResult<CompatibilityReport> {
        let template = self.template.lock().await;
        Ok(check_compatibility(
            template.schema.as_ref(),
            schema,
            examples,
            extract_bound_expressions(&template.blocks),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_saves_rewrite_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.json");
        let host = FileHost::new(&path, Template::new("t", "T"));

        host.save_schema(&json!({ "type": "object" }), false).await.unwrap();
        let example = DataExample::new("e1", "One", serde_json::Map::new());
        host.save_data_examples(&[example]).await.unwrap();

        let written = Template::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.schema, Some(json!({ "type": "object" })));
        assert_eq!(written.data_examples.len(), 1);

        host.delete_data_example("e1").await.unwrap();
        assert!(host.template().await.data_examples.is_empty());
        assert!(host.delete_data_example("e1").await.is_err());
    }
}
