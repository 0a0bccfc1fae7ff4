//! # Contract Editor
//!
//! Holds a template's data contract (JSON Schema + data examples) and gates
//! changes to it before they reach the host.
//!
//! ```text
//! save_schema(schema, force)
//!     └─ check_compatibility(current, schema, examples, expressions)
//!          ├─ compatible or force → host.save_schema → commit locally
//!          └─ otherwise           → SaveOutcome { success: false, warnings }
//! ```
//!
//! The editor performs no I/O itself; persistence goes through [`ContractHost`].

use crate::compat::{check_compatibility, CompatibilityReport};
use crate::error::{SchemaError, SchemaResult};
use crate::extract::extract_bound_expressions;
use crate::migrate::{migrate_examples, MigrationPlan};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use stencil_model::{DataExample, Template};
use tracing::{debug, info, instrument, warn};

/// Result of a schema save attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub success: bool,
    pub warnings: Vec<String>,
}

/// Persistence callbacks provided by the host application
#[async_trait]
pub trait ContractHost: Send + Sync {
    async fn save_schema(&self, schema: &Value, force_update: bool) -> SchemaResult<SaveOutcome>;

    async fn save_data_examples(&self, examples: &[DataExample]) -> SchemaResult<()>;

    async fn update_data_example(&self, example: &DataExample) -> SchemaResult<()>;

    async fn delete_data_example(&self, id: &str) -> SchemaResult<()>;

    /// Host-side compatibility check, for hosts with their own rules
    async fn validate_schema(
        &self,
        schema: &Value,
        examples: &[DataExample],
    ) -> SchemaResult<CompatibilityReport>;
}

pub struct ContractEditor<H> {
    host: H,
    schema: Option<Value>,
    examples: Vec<DataExample>,
    expressions: BTreeSet<String>,
}

impl<H: ContractHost> ContractEditor<H> {
    pub fn new(host: H, schema: Option<Value>, examples: Vec<DataExample>) -> Self {
        Self {
            host,
            schema,
            examples,
            expressions: BTreeSet::new(),
        }
    }

    /// Contract of `template`, with expressions bound from its blocks
    pub fn for_template(host: H, template: &Template) -> Self {
        Self {
            host,
            schema: template.schema.clone(),
            examples: template.data_examples.clone(),
            expressions: extract_bound_expressions(&template.blocks),
        }
    }

    pub fn from_json(host: H, json: &str) -> SchemaResult<Self> {
        Ok(Self::for_template(host, &Template::from_json(json)?))
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn schema(&self) -> Option<&Value> {
        self.schema.as_ref()
    }

    pub fn examples(&self) -> &[DataExample] {
        &self.examples
    }

    pub fn expressions(&self) -> &BTreeSet<String> {
        &self.expressions
    }

    /// Replace the expression paths checked on schema save
    pub fn set_expressions(&mut self, expressions: BTreeSet<String>) {
        self.expressions = expressions;
    }

    /// Compatibility of `schema` with the current contract
    pub fn check(&self, schema: &Value) -> CompatibilityReport {
        check_compatibility(self.schema.as_ref(), schema, &self.examples, &self.expressions)
    }

    /// Save a new schema.
    ///
    /// Refused with itemized warnings when the change breaks examples or
    /// removes paths the template uses, unless `force_update` is set.
    #[instrument(skip(self, schema))]
    pub async fn save_schema(&mut self, schema: Value, force_update: bool) -> SchemaResult<SaveOutcome> {
        if !schema.is_object() {
            return Err(SchemaError::InvalidSchema);
        }

        let report = self.check(&schema);
        let warnings = report.warnings();
        if !report.compatible && !force_update {
            info!(warnings = warnings.len(), "Schema save refused");
            return Ok(SaveOutcome {
                success: false,
                warnings,
            });
        }
        if !report.compatible {
            warn!(warnings = warnings.len(), "Forcing incompatible schema update");
        }

        let mut outcome = self.host.save_schema(&schema, force_update).await?;
        if outcome.success {
            self.schema = Some(schema);
            debug!("Schema saved");
        }
        outcome.warnings.extend(warnings);
        Ok(outcome)
    }

    /// Ask the host to check `schema` against the current examples
    pub async fn validate_with_host(&self, schema: &Value) -> SchemaResult<CompatibilityReport> {
        self.host.validate_schema(schema, &self.examples).await
    }

    #[instrument(skip(self, example), fields(example_id = %example.id))]
    pub async fn add_example(&mut self, example: DataExample) -> SchemaResult<()> {
        if self.example(&example.id).is_some() {
            return Err(SchemaError::DuplicateExample(example.id));
        }

        let mut examples = self.examples.clone();
        examples.push(example);
        self.host.save_data_examples(&examples).await?;
        self.examples = examples;
        Ok(())
    }

    #[instrument(skip(self, example), fields(example_id = %example.id))]
    pub async fn update_example(&mut self, example: DataExample) -> SchemaResult<()> {
        let index = self
            .examples
            .iter()
            .position(|e| e.id == example.id)
            .ok_or_else(|| SchemaError::ExampleNotFound(example.id.clone()))?;

        self.host.update_data_example(&example).await?;
        self.examples[index] = example;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_example(&mut self, id: &str) -> SchemaResult<DataExample> {
        let index = self
            .examples
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| SchemaError::ExampleNotFound(id.to_string()))?;

        self.host.delete_data_example(id).await?;
        Ok(self.examples.remove(index))
    }

    /// Apply a migration plan to the examples and persist them
    pub async fn apply_migrations(&mut self, plan: &MigrationPlan) -> SchemaResult<usize> {
        if plan.migrations.is_empty() {
            return Ok(0);
        }

        let migrated = migrate_examples(&self.examples, plan);
        self.host.save_data_examples(&migrated).await?;
        self.examples = migrated;
        Ok(plan.migrations.len())
    }

    pub fn example(&self, id: &str) -> Option<&DataExample> {
        self.examples.iter().find(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Host that records every call
    #[derive(Default)]
    struct RecordingHost {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingHost {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ContractHost for RecordingHost {
        async fn save_schema(&self, _schema: &Value, force_update: bool) -> SchemaResult<SaveOutcome> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("save_schema(force={})", force_update));
            Ok(SaveOutcome {
                success: true,
                warnings: Vec::new(),
            })
        }

        async fn save_data_examples(&self, examples: &[DataExample]) -> SchemaResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("save_data_examples({})", examples.len()));
            Ok(())
        }

        async fn update_data_example(&self, example: &DataExample) -> SchemaResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("update_data_example({})", example.id));
            Ok(())
        }

        async fn delete_data_example(&self, id: &str) -> SchemaResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("delete_data_example({})", id));
            Ok(())
        }

        async fn validate_schema(
            &self,
            schema: &Value,
            examples: &[DataExample],
        ) -> SchemaResult<CompatibilityReport> {
            Ok(check_compatibility(None, schema, examples, Vec::<String>::new()))
        }
    }

    fn example(id: &str, data: Value) -> DataExample {
        DataExample::new(id, id, data.as_object().cloned().unwrap_or_default())
    }

    fn editor() -> ContractEditor<RecordingHost> {
        ContractEditor::new(
            RecordingHost::default(),
            Some(json!({ "type": "object", "properties": { "total": { "type": "number" } } })),
            vec![example("a", json!({ "total": 1 }))],
        )
    }

    #[tokio::test]
    async fn test_incompatible_save_refused_without_force() {
        let mut editor = editor();
        let strict = json!({ "type": "object", "properties": { "total": { "type": "string" } } });

        let outcome = editor.save_schema(strict.clone(), false).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(editor.host().calls().is_empty());
        assert_ne!(editor.schema(), Some(&strict));

        let outcome = editor.save_schema(strict.clone(), true).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(editor.host().calls(), vec!["save_schema(force=true)"]);
        assert_eq!(editor.schema(), Some(&strict));
    }

    #[tokio::test]
    async fn test_example_ids_stay_unique() {
        let mut editor = editor();

        editor.add_example(example("b", json!({}))).await.unwrap();
        assert!(matches!(
            editor.add_example(example("b", json!({}))).await,
            Err(SchemaError::DuplicateExample(id)) if id == "b"
        ));
        assert!(matches!(
            editor.update_example(example("zzz", json!({}))).await,
            Err(SchemaError::ExampleNotFound(_))
        ));

        editor.update_example(example("b", json!({ "total": 2 }))).await.unwrap();
        let removed = editor.delete_example("a").await.unwrap();
        assert_eq!(removed.id, "a");

        assert_eq!(
            editor.host().calls(),
            vec![
                "save_data_examples(2)",
                "update_data_example(b)",
                "delete_data_example(a)",
            ]
        );
        assert_eq!(editor.examples().len(), 1);
    }

    #[tokio::test]
    async fn test_non_object_schema_rejected() {
        let mut editor = editor();
        assert!(matches!(
            editor.save_schema(json!(true), true).await,
            Err(SchemaError::InvalidSchema)
        ));
    }
}
