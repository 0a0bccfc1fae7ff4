//! Schema change compatibility check

use crate::error::{SchemaError, SchemaResult};
use crate::impact::detect_removed_paths;
use crate::migrate::{detect_migrations, MigrationPlan};
use crate::validate::{validate_data, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stencil_model::{DataExample, SchemaIssue};
use tracing::{debug, instrument};

/// Validation failures of one data example
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleIssue {
    pub example_id: String,
    pub example_name: String,
    pub errors: Vec<ValidationError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityReport {
    pub compatible: bool,
    pub example_issues: Vec<ExampleIssue>,
    pub removed_paths: Vec<SchemaIssue>,
    pub migrations: MigrationPlan,
}

impl CompatibilityReport {
    /// One human-readable line per problem
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for issue in &self.example_issues {
            for error in &issue.errors {
                warnings.push(format!("Example '{}': {}", issue.example_name, error));
            }
        }
        warnings.extend(self.removed_paths.iter().map(|issue| issue.message.clone()));
        warnings
    }
}

/// Check a schema change against the examples and the template's expressions.
///
/// The change is compatible when every example validates under `new_schema`
/// and no expression path loses its declaration. Migrations are proposed for
/// the examples that fail.
#[instrument(skip_all, fields(examples = examples.len()))]
pub fn check_compatibility<I>(
    old_schema: Option<&Value>,
    new_schema: &Value,
    examples: &[DataExample],
    expressions: I,
) -> CompatibilityReport
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let example_issues: Vec<ExampleIssue> = examples
        .iter()
        .filter_map(|example| {
            let errors = validate_data(new_schema, &Value::Object(example.data.clone()));
            (!errors.is_empty()).then(|| ExampleIssue {
                example_id: example.id.clone(),
                example_name: example.name.clone(),
                errors,
            })
        })
        .collect();

    let removed_paths = old_schema
        .map(|old| detect_removed_paths(old, new_schema, expressions))
        .unwrap_or_default();

    let failing: Vec<DataExample> = examples
        .iter()
        .filter(|example| example_issues.iter().any(|issue| issue.example_id == example.id))
        .cloned()
        .collect();
    let migrations = detect_migrations(new_schema, &failing);

    let compatible = example_issues.is_empty() && removed_paths.is_empty();
    debug!(
        compatible,
        example_issues = example_issues.len(),
        removed_paths = removed_paths.len(),
        "Checked schema compatibility"
    );

    CompatibilityReport {
        compatible,
        example_issues,
        removed_paths,
        migrations,
    }
}

/// Parse a JSON Schema document; the root must be an object
pub fn parse_schema(json: &str) -> SchemaResult<Value> {
    match serde_json::from_str(json)? {
        schema @ Value::Object(_) => Ok(schema),
        _ => Err(SchemaError::InvalidSchema),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn examples() -> Vec<DataExample> {
        let data = json!({ "customer": { "name": "Ada" }, "total": 10 });
        vec![DataExample::new("ex1", "Ada", data.as_object().unwrap().clone())]
    }

    fn schema_v1() -> Value {
        json!({
            "type": "object",
            "properties": {
                "customer": { "type": "object", "properties": { "name": { "type": "string" } } },
                "total": { "type": "number" }
            }
        })
    }

    #[test]
    fn test_additive_change_is_compatible() {
        let mut v2 = schema_v1();
        v2["properties"]["notes"] = json!({ "type": "string" });

        let report = check_compatibility(Some(&schema_v1()), &v2, &examples(), ["customer.name"]);
        assert!(report.compatible);
        assert!(report.warnings().is_empty());
        assert!(report.migrations.is_empty());
    }

    #[test]
    fn test_breaking_change_reports_examples_and_paths() {
        let v2 = json!({
            "type": "object",
            "required": ["currency"],
            "properties": {
                "total": { "type": "string" },
                "currency": { "type": "string" }
            }
        });

        let report = check_compatibility(
            Some(&schema_v1()),
            &v2,
            &examples(),
            ["customer.name", "total"],
        );

        assert!(!report.compatible);
        assert_eq!(report.example_issues.len(), 1);
        assert_eq!(report.example_issues[0].errors.len(), 2);
        assert_eq!(
            report.removed_paths,
            vec![SchemaIssue::removed("customer.name")]
        );
        assert_eq!(report.migrations.migrations.len(), 2);
        assert_eq!(report.warnings().len(), 3);
    }

    #[test]
    fn test_parse_schema_requires_object() {
        assert!(parse_schema(r#"{ "type": "object" }"#).is_ok());
        assert!(matches!(parse_schema("[1]"), Err(SchemaError::InvalidSchema)));
        assert!(matches!(parse_schema("{"), Err(SchemaError::Json(_))));
    }
}
