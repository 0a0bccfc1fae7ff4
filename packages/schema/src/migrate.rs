//! Data migrations proposed when example data no longer fits a schema
//!
//! ```text
//! detect_migrations(schema, examples)
//!     └─ per example: walk schema + data together
//!          ├─ wrong type, convertible   → convertType
//!          ├─ required field missing    → addField (default or zero value)
//!          ├─ field not allowed         → removeField
//!          └─ anything else             → unresolved issue
//! apply_all_migrations(data, migrations) → migrated copy
//! ```

use crate::json_types::{
    child_path, declared_types, index_path, json_type_name, number_value, parse_path, resolve,
    type_matches, value_at_mut, zero_value, ObjectView, Segment, MAX_DEPTH,
};
use crate::validate::check_keywords;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use stencil_model::DataExample;
use tracing::{debug, warn};

/// What a migration does at its path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MigrationAction {
    AddField { value: Value },
    RemoveField,
    ConvertType { from: String, to: String, value: Value },
}

/// A proposed change to one example's data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Migration {
    pub example_id: String,
    pub path: String,
    #[serde(flatten)]
    pub action: MigrationAction,
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            MigrationAction::AddField { value } => write!(f, "add '{}' = {}", self.path, value),
            MigrationAction::RemoveField => write!(f, "remove '{}'", self.path),
            MigrationAction::ConvertType { from, to, value } => {
                write!(f, "convert '{}' from {} to {} ({})", self.path, from, to, value)
            }
        }
    }
}

/// An incompatibility no migration can fix automatically
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedIssue {
    pub example_id: String,
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationPlan {
    pub migrations: Vec<Migration>,
    pub unresolved: Vec<UnresolvedIssue>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty() && self.unresolved.is_empty()
    }

    /// Every issue has a migration
    pub fn is_fully_migratable(&self) -> bool {
        self.unresolved.is_empty()
    }

    pub fn for_example<'a>(&'a self, example_id: &'a str) -> impl Iterator<Item = &'a Migration> {
        self.migrations
            .iter()
            .filter(move |migration| migration.example_id == example_id)
    }
}

pub fn detect_migrations(schema: &Value, examples: &[DataExample]) -> MigrationPlan {
    let mut plan = MigrationPlan::default();
    for example in examples {
        let data = Value::Object(example.data.clone());
        let mut detector = Detector {
            root: schema,
            example_id: &example.id,
            plan: &mut plan,
        };
        detector.walk(schema, &data, "", 0);
    }

    debug!(
        migrations = plan.migrations.len(),
        unresolved = plan.unresolved.len(),
        "Detected data migrations"
    );
    plan
}

struct Detector<'a> {
    root: &'a Value,
    example_id: &'a str,
    plan: &'a mut MigrationPlan,
}

impl Detector<'_> {
    fn migrate(&mut self, path: &str, action: MigrationAction) {
        self.plan.migrations.push(Migration {
            example_id: self.example_id.to_string(),
            path: path.to_string(),
            action,
        });
    }

    fn unresolved(&mut self, path: &str, message: String) {
        self.plan.unresolved.push(UnresolvedIssue {
            example_id: self.example_id.to_string(),
            path: path.to_string(),
            message,
        });
    }

    fn walk(&mut self, schema: &Value, value: &Value, path: &str, depth: usize) {
        if depth > MAX_DEPTH {
            warn!(path, "Schema nesting too deep, skipping migration detection");
            return;
        }
        let schema = resolve(self.root, schema);

        let types = declared_types(schema);
        let converted;
        let value = if types.is_empty() || types.iter().any(|ty| type_matches(value, ty)) {
            value
        } else {
            match convert(value, &types) {
                Some((to, result)) => {
                    self.migrate(
                        path,
                        MigrationAction::ConvertType {
                            from: json_type_name(value).to_string(),
                            to: to.to_string(),
                            value: result.clone(),
                        },
                    );
                    converted = result;
                    &converted
                }
                None => {
                    self.unresolved(
                        path,
                        format!(
                            "Cannot convert {} to {}",
                            json_type_name(value),
                            types.join(" | ")
                        ),
                    );
                    return;
                }
            }
        };

        let mut errors = Vec::new();
        check_keywords(schema, value, path, &mut errors);
        for error in errors {
            self.unresolved(path, error.message);
        }

        match value {
            Value::Object(map) => {
                let view = ObjectView::of(self.root, schema);
                for key in &view.required {
                    if !map.contains_key(*key) {
                        let default = view
                            .property(key)
                            .map(|sub| zero_value(self.root, sub))
                            .unwrap_or(Value::Null);
                        self.migrate(
                            &child_path(path, key),
                            MigrationAction::AddField { value: default },
                        );
                    }
                }
                for (key, child) in map {
                    let child_path = child_path(path, key);
                    match view.property(key) {
                        Some(sub) => self.walk(sub, child, &child_path, depth + 1),
                        None if view.closed => self.migrate(&child_path, MigrationAction::RemoveField),
                        None => {}
                    }
                }
            }
            Value::Array(items) => {
                if let Some(item_schema @ Value::Object(_)) = schema.get("items") {
                    for (index, item) in items.iter().enumerate() {
                        self.walk(item_schema, item, &index_path(path, index), depth + 1);
                    }
                }
            }
            _ => {}
        }
    }
}

/// First declared (non-null) type the value converts to
fn convert<'t>(value: &Value, types: &[&'t str]) -> Option<(&'t str, Value)> {
    types
        .iter()
        .filter(|ty| **ty != "null")
        .find_map(|ty| convert_to(value, ty).map(|converted| (*ty, converted)))
}

fn convert_to(value: &Value, target: &str) -> Option<Value> {
    match (value, target) {
        (Value::String(s), "number") => s.trim().parse::<f64>().ok().and_then(number_value),
        (Value::String(s), "integer") => s.trim().parse::<i64>().ok().map(Value::from),
        (Value::String(s), "boolean") => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        (Value::Number(n), "string") => Some(Value::String(n.to_string())),
        (Value::Bool(b), "string") => Some(Value::String(b.to_string())),
        (Value::Array(items), _) if items.len() == 1 => {
            let item = &items[0];
            if type_matches(item, target) {
                Some(item.clone())
            } else if item.is_array() {
                None
            } else {
                convert_to(item, target)
            }
        }
        (Value::Null | Value::Array(_) | Value::Object(_), "array") => None,
        (scalar, "array") => Some(Value::Array(vec![scalar.clone()])),
        _ => None,
    }
}

/// Apply one migration in place; returns whether the data changed
pub fn apply_migration(data: &mut Value, migration: &Migration) -> bool {
    let segments = parse_path(&migration.path);

    match &migration.action {
        MigrationAction::ConvertType { value, .. } => match value_at_mut(data, &segments) {
            Some(target) => {
                *target = value.clone();
                true
            }
            None => false,
        },
        MigrationAction::AddField { value } => match segments.split_last() {
            Some((Segment::Key(key), parent)) => value_at_mut(data, parent)
                .and_then(Value::as_object_mut)
                .filter(|object| !object.contains_key(key))
                .map(|object| object.insert(key.clone(), value.clone()))
                .is_some(),
            _ => false,
        },
        MigrationAction::RemoveField => match segments.split_last() {
            Some((Segment::Key(key), parent)) => value_at_mut(data, parent)
                .and_then(Value::as_object_mut)
                .and_then(|object| object.remove(key))
                .is_some(),
            _ => false,
        },
    }
}

/// Migrated copy of `data`; migrations whose path no longer exists are skipped
pub fn apply_all_migrations(data: &Value, migrations: &[Migration]) -> Value {
    let mut migrated = data.clone();
    for migration in migrations {
        if !apply_migration(&mut migrated, migration) {
            debug!(path = %migration.path, "Skipped migration that no longer applies");
        }
    }
    migrated
}

/// Apply a plan to every example it mentions
pub fn migrate_examples(examples: &[DataExample], plan: &MigrationPlan) -> Vec<DataExample> {
    examples
        .iter()
        .map(|example| {
            let migrations: Vec<Migration> = plan.for_example(&example.id).cloned().collect();
            if migrations.is_empty() {
                return example.clone();
            }
            let data = apply_all_migrations(&Value::Object(example.data.clone()), &migrations);
            DataExample {
                data: match data {
                    Value::Object(map) => map,
                    _ => example.data.clone(),
                },
                ..example.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn example(id: &str, data: Value) -> DataExample {
        match data {
            Value::Object(map) => DataExample::new(id, id, map),
            _ => panic!("example data must be an object"),
        }
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["total", "paid", "currency"],
            "additionalProperties": false,
            "properties": {
                "total": { "type": "number" },
                "paid": { "type": "boolean" },
                "currency": { "type": "string", "default": "EUR" },
                "tags": { "type": "array", "items": { "type": "string" } },
                "note": { "type": "string" }
            }
        })
    }

    #[test]
    fn test_detects_each_migration_kind() {
        let examples = vec![example(
            "inv",
            json!({ "total": "12.50", "paid": "TRUE", "tags": "urgent", "legacy": 1, "note": 7 }),
        )];

        let plan = detect_migrations(&schema(), &examples);
        assert!(plan.is_fully_migratable());

        let described: Vec<String> = plan.migrations.iter().map(|m| m.to_string()).collect();
        assert!(described.contains(&"add 'currency' = \"EUR\"".to_string()));
        assert!(described.contains(&"remove 'legacy'".to_string()));
        assert!(described.contains(&"convert 'total' from string to number (12.5)".to_string()));
        assert!(described.contains(&"convert 'paid' from string to boolean (true)".to_string()));
        assert!(described.contains(&"convert 'tags' from string to array ([\"urgent\"])".to_string()));
        assert!(described.contains(&"convert 'note' from integer to string (\"7\")".to_string()));
    }

    #[test]
    fn test_unconvertible_value_is_unresolved() {
        let examples = vec![example(
            "inv",
            json!({ "total": "lots", "paid": true, "currency": "USD" }),
        )];

        let plan = detect_migrations(&schema(), &examples);
        assert!(plan.migrations.is_empty());
        assert_eq!(plan.unresolved.len(), 1);
        assert_eq!(plan.unresolved[0].path, "total");
        assert!(!plan.is_fully_migratable());
    }

    #[test]
    fn test_applied_plan_validates() {
        let examples = vec![
            example("a", json!({ "total": [3], "paid": "false", "legacy": null })),
            example("b", json!({ "total": 1, "paid": true, "currency": "USD" })),
        ];

        let plan = detect_migrations(&schema(), &examples);
        let migrated = migrate_examples(&examples, &plan);

        assert_eq!(
            Value::Object(migrated[0].data.clone()),
            json!({ "total": 3, "paid": false, "currency": "EUR" })
        );
        assert_eq!(migrated[1], examples[1]);
        for example in &migrated {
            let data = Value::Object(example.data.clone());
            assert!(crate::validate_data(&schema(), &data).is_empty());
        }
    }

    #[test]
    fn test_nested_conversions_follow_parent_conversion() {
        let schema = json!({
            "properties": {
                "lines": { "type": "array", "items": { "type": "integer" } }
            }
        });
        let data = json!({ "lines": "4" });
        let plan = detect_migrations(&schema, &[example("x", data.clone())]);

        assert_eq!(
            apply_all_migrations(&data, &plan.migrations),
            json!({ "lines": [4] })
        );
    }

    #[test]
    fn test_migration_serializes_flat() {
        let migration = Migration {
            example_id: "inv".to_string(),
            path: "total".to_string(),
            action: MigrationAction::ConvertType {
                from: "string".to_string(),
                to: "number".to_string(),
                value: json!(12.5),
            },
        };

        assert_eq!(
            serde_json::to_value(&migration).unwrap(),
            json!({
                "exampleId": "inv",
                "path": "total",
                "type": "convertType",
                "from": "string",
                "to": "number",
                "value": 12.5
            })
        );
    }
}
