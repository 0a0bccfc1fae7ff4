//! JSON Schema validation of example data (keyword subset)
//!
//! Supported: `type` (single or list, including `integer`), `enum`,
//! `minimum`/`maximum`, `minLength`/`maxLength`, `properties`, `required`,
//! `additionalProperties: false`, `items`, `allOf`, `anyOf`, `oneOf` and
//! local `$ref`s. Unknown keywords are ignored.

use crate::json_types::{
    child_path, declared_types, index_path, json_type_name, resolve, type_matches, ObjectView,
    MAX_DEPTH,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// One validation failure; `path` is empty for the root value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

pub fn validate_data(schema: &Value, data: &Value) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    validate_node(schema, schema, data, "", &mut errors, 0);
    errors
}

fn validate_node(
    root: &Value,
    schema: &Value,
    value: &Value,
    path: &str,
    errors: &mut Vec<ValidationError>,
    depth: usize,
) {
    if depth > MAX_DEPTH {
        warn!(path, "Schema nesting too deep, skipping validation");
        return;
    }
    let schema = resolve(root, schema);

    // a type mismatch makes the nested keywords meaningless
    if !check_keywords(schema, value, path, errors) {
        return;
    }
    if let Some(members) = schema.get("allOf").and_then(Value::as_array) {
        for member in members {
            check_keywords(resolve(root, member), value, path, errors);
        }
    }

    if let Some(options) = schema.get("anyOf").and_then(Value::as_array) {
        if matching_options(root, options, value, depth) == 0 {
            errors.push(ValidationError::new(path, "Value does not match any allowed schema"));
        }
    }
    if let Some(options) = schema.get("oneOf").and_then(Value::as_array) {
        let matched = matching_options(root, options, value, depth);
        if matched != 1 {
            errors.push(ValidationError::new(
                path,
                format!("Value must match exactly one schema (matched {})", matched),
            ));
        }
    }

    match value {
        Value::Object(map) => {
            let view = ObjectView::of(root, schema);
            for key in &view.required {
                if !map.contains_key(*key) {
                    errors.push(ValidationError::new(
                        child_path(path, key),
                        "Required field is missing",
                    ));
                }
            }
            for (key, child) in map {
                let child_path = child_path(path, key);
                match view.property(key) {
                    Some(sub) => validate_node(root, sub, child, &child_path, errors, depth + 1),
                    None if view.closed => errors.push(ValidationError::new(
                        child_path,
                        "Field is not allowed by the schema",
                    )),
                    None => {}
                }
            }
        }
        Value::Array(items) => match schema.get("items") {
            Some(Value::Array(tuple)) => {
                for (index, (item, sub)) in items.iter().zip(tuple).enumerate() {
                    validate_node(root, sub, item, &index_path(path, index), errors, depth + 1);
                }
            }
            Some(item_schema @ Value::Object(_)) => {
                for (index, item) in items.iter().enumerate() {
                    validate_node(root, item_schema, item, &index_path(path, index), errors, depth + 1);
                }
            }
            _ => {}
        },
        _ => {}
    }
}

fn matching_options(root: &Value, options: &[Value], value: &Value, depth: usize) -> usize {
    options
        .iter()
        .filter(|option| {
            let mut errors = Vec::new();
            validate_node(root, option, value, "", &mut errors, depth + 1);
            errors.is_empty()
        })
        .count()
}

/// Value-level keywords of a single schema node.
/// Returns `false` when the value has the wrong type.
pub(crate) fn check_keywords(
    schema: &Value,
    value: &Value,
    path: &str,
    errors: &mut Vec<ValidationError>,
) -> bool {
    let types = declared_types(schema);
    if !types.is_empty() && !types.iter().any(|ty| type_matches(value, ty)) {
        errors.push(ValidationError::new(
            path,
            format!("Expected {}, found {}", types.join(" | "), json_type_name(value)),
        ));
        return false;
    }

    if let Some(options) = schema.get("enum").and_then(Value::as_array) {
        if !options.contains(value) {
            errors.push(ValidationError::new(
                path,
                format!("Value must be one of {}", Value::Array(options.clone())),
            ));
        }
    }

    if let Some(number) = value.as_f64() {
        if let Some(minimum) = schema.get("minimum").and_then(Value::as_f64) {
            if number < minimum {
                errors.push(ValidationError::new(
                    path,
                    format!("Value {} is less than minimum {}", number, minimum),
                ));
            }
        }
        if let Some(maximum) = schema.get("maximum").and_then(Value::as_f64) {
            if number > maximum {
                errors.push(ValidationError::new(
                    path,
                    format!("Value {} is greater than maximum {}", number, maximum),
                ));
            }
        }
    }

    if let Some(text) = value.as_str() {
        let length = text.chars().count() as u64;
        if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
            if length < min {
                errors.push(ValidationError::new(
                    path,
                    format!("String is shorter than {} characters", min),
                ));
            }
        }
        if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
            if length > max {
                errors.push(ValidationError::new(
                    path,
                    format!("String is longer than {} characters", max),
                ));
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["customer", "items"],
            "additionalProperties": false,
            "properties": {
                "customer": {
                    "type": "object",
                    "required": ["name"],
                    "properties": {
                        "name": { "type": "string", "minLength": 1 },
                        "tier": { "enum": ["gold", "silver"] }
                    }
                },
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "qty": { "type": "integer", "minimum": 1 },
                            "price": { "type": ["number", "null"] }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_valid_data() {
        let data = json!({
            "customer": { "name": "Ada", "tier": "gold" },
            "items": [{ "qty": 2, "price": 9.5 }, { "qty": 1, "price": null }]
        });
        assert!(validate_data(&schema(), &data).is_empty());
    }

    #[test]
    fn test_reports_each_violation_with_path() {
        let data = json!({
            "customer": { "tier": "bronze" },
            "items": [{ "qty": 0 }, { "qty": 1.5 }],
            "extra": true
        });

        let errors = validate_data(&schema(), &data);
        let mut paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        paths.sort_unstable();

        assert_eq!(
            paths,
            vec!["customer.name", "customer.tier", "extra", "items[0].qty", "items[1].qty"]
        );
        let qty = errors.iter().find(|e| e.path == "items[1].qty").unwrap();
        assert_eq!(qty.message, "Expected integer, found number");
    }

    #[test]
    fn test_root_type_mismatch() {
        let errors = validate_data(&schema(), &json!([1, 2]));
        assert_eq!(errors, vec![ValidationError::new("", "Expected object, found array")]);
    }

    #[test]
    fn test_any_of_and_one_of() {
        let schema = json!({
            "properties": {
                "id": { "anyOf": [{ "type": "string" }, { "type": "integer" }] },
                "kind": { "oneOf": [{ "type": "string" }, { "enum": ["a"] }] }
            }
        });

        assert!(validate_data(&schema, &json!({ "id": 4, "kind": "b" })).is_empty());

        let errors = validate_data(&schema, &json!({ "id": true, "kind": "a" }));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].path, "id");
        assert_eq!(errors[1].message, "Value must match exactly one schema (matched 2)");
    }
}
