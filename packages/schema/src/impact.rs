//! Schema impact analysis: which expression paths a schema does not cover

use crate::paths::{normalize_array_path, path_matches_schema, schema_paths};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use stencil_model::SchemaIssue;
use tracing::debug;

/// How many expression paths resolve against a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionCoverage {
    pub total: usize,
    pub valid: usize,
    pub missing: Vec<String>,
    /// Percentage, rounded; 100 when there are no expressions
    pub coverage: u32,
}

fn normalized<I>(expressions: I) -> BTreeSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    expressions
        .into_iter()
        .map(|path| normalize_array_path(path.as_ref()))
        .collect()
}

/// A `missing` issue for every expression path the schema does not declare
pub fn analyze_schema_impact<I>(schema: &Value, expressions: I) -> Vec<SchemaIssue>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let declared = schema_paths(schema);
    let issues: Vec<SchemaIssue> = normalized(expressions)
        .into_iter()
        .filter(|path| !path_matches_schema(path, &declared))
        .map(SchemaIssue::missing)
        .collect();

    debug!(issues = issues.len(), "Analyzed schema impact");
    issues
}

/// A `removed` issue for every expression path that matched a path present in
/// `old_schema` but absent from `new_schema`
pub fn detect_removed_paths<I>(old_schema: &Value, new_schema: &Value, expressions: I) -> Vec<SchemaIssue>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let new_paths = schema_paths(new_schema);
    let removed: BTreeSet<String> = schema_paths(old_schema)
        .into_iter()
        .filter(|path| !new_paths.contains(path))
        .collect();
    if removed.is_empty() {
        return Vec::new();
    }

    normalized(expressions)
        .into_iter()
        .filter(|path| path_matches_schema(path, &removed))
        .map(SchemaIssue::removed)
        .collect()
}

pub fn get_expression_coverage<I>(schema: &Value, expressions: I) -> ExpressionCoverage
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let declared = schema_paths(schema);
    let paths = normalized(expressions);

    let missing: Vec<String> = paths
        .iter()
        .filter(|path| !path_matches_schema(path, &declared))
        .cloned()
        .collect();
    let total = paths.len();
    let valid = total - missing.len();
    let coverage = if total == 0 {
        100
    } else {
        (valid as f64 / total as f64 * 100.0).round() as u32
    };

    ExpressionCoverage {
        total,
        valid,
        missing,
        coverage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stencil_model::IssueKind;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "customer": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "email": { "type": "string" }
                    }
                },
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { "price": { "type": "number" } }
                    }
                }
            }
        })
    }

    #[test]
    fn test_missing_paths_reported() {
        let issues = analyze_schema_impact(&schema(), ["customer.name", "items[0].price", "vendor.id"]);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::Missing);
        assert_eq!(issues[0].path, "vendor.id");
    }

    #[test]
    fn test_removed_paths_reported() {
        let mut new_schema = schema();
        new_schema["properties"]["customer"]["properties"]
            .as_object_mut()
            .unwrap()
            .remove("email");

        let issues = detect_removed_paths(
            &schema(),
            &new_schema,
            ["customer.email", "customer.name"],
        );

        assert_eq!(issues, vec![SchemaIssue::removed("customer.email")]);
    }

    #[test]
    fn test_builtin_calls_are_not_data_paths() {
        use crate::extract::extract_expressions;
        use stencil_model::rich_text::{doc, expression_node, paragraph};
        use stencil_model::Block;

        let schema = json!({
            "type": "object",
            "properties": { "total": { "type": "number" } }
        });
        let blocks = vec![Block::text(
            "sum",
            doc(vec![paragraph(vec![expression_node("Math.round(total)")])]),
        )];
        let paths = extract_expressions(&blocks);

        assert_eq!(paths.iter().collect::<Vec<_>>(), vec!["total"]);
        assert!(analyze_schema_impact(&schema, &paths).is_empty());
        assert_eq!(get_expression_coverage(&schema, &paths).coverage, 100);
    }

    #[test]
    fn test_coverage_empty_is_full() {
        let coverage = get_expression_coverage(&schema(), Vec::<String>::new());
        assert_eq!(coverage.total, 0);
        assert_eq!(coverage.coverage, 100);
    }

    #[test]
    fn test_coverage_half() {
        let coverage = get_expression_coverage(&schema(), ["customer.name", "vendor.id"]);
        assert_eq!(coverage.total, 2);
        assert_eq!(coverage.valid, 1);
        assert_eq!(coverage.missing, vec!["vendor.id".to_string()]);
        assert_eq!(coverage.coverage, 50);
    }
}
