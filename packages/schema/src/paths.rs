//! Expression path normalization and schema path matching

use crate::json_types::{lookup_ref, MAX_DEPTH};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn array_index() -> &'static Regex {
    static ARRAY_INDEX: OnceLock<Regex> = OnceLock::new();
    ARRAY_INDEX.get_or_init(|| Regex::new(r"\[\s*\d+\s*\]").expect("array index pattern is valid"))
}

/// Replace every concrete `[n]` index with the `[]` wildcard.
///
/// `items[0].price` and `items[ 7 ].price` both become `items[].price`.
pub fn normalize_array_path(path: &str) -> String {
    array_index().replace_all(path, "[]").into_owned()
}

/// First segment of a path, before any `.` or `[`
pub fn root_segment(path: &str) -> &str {
    path.split(['.', '[']).next().unwrap_or(path)
}

pub fn get_root_paths<I>(expressions: I) -> BTreeSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    expressions
        .into_iter()
        .map(|path| root_segment(path.as_ref()).to_string())
        .filter(|root| !root.is_empty())
        .collect()
}

/// Does `path` resolve against the declared schema paths?
///
/// Exact matches win. Otherwise the dotted path is shortened from the right
/// and each prefix is tried both as-is and as an array (`prefix[]`), so
/// `items.name` matches a schema that declares `items[]`.
pub fn path_matches_schema(path: &str, schema_paths: &BTreeSet<String>) -> bool {
    if schema_paths.contains(path) {
        return true;
    }

    let segments: Vec<&str> = path.split('.').collect();
    (1..=segments.len()).rev().any(|len| {
        let prefix = segments[..len].join(".");
        let bare = prefix.strip_suffix("[]").unwrap_or(&prefix);
        schema_paths.contains(&prefix) || schema_paths.contains(&format!("{}[]", bare))
    })
}

/// Every field path a JSON Schema declares.
///
/// Object properties contribute `a` and `a.b`; array items contribute `a[]`
/// and `a[].b`. `allOf`/`anyOf`/`oneOf` members are merged and local
/// `#/definitions/*` / `#/$defs/*` references are followed once per branch.
pub fn schema_paths(schema: &Value) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    let mut refs = Vec::new();
    collect_paths(schema, schema, "", &mut refs, &mut paths, 0);
    paths
}

fn collect_paths<'a>(
    root: &'a Value,
    node: &'a Value,
    prefix: &str,
    refs: &mut Vec<&'a str>,
    paths: &mut BTreeSet<String>,
    depth: usize,
) {
    if depth > MAX_DEPTH {
        return;
    }

    if let Some(reference) = node.get("$ref").and_then(Value::as_str) {
        if refs.contains(&reference) {
            return;
        }
        if let Some(target) = lookup_ref(root, reference) {
            refs.push(reference);
            collect_paths(root, target, prefix, refs, paths, depth + 1);
            refs.pop();
        }
    }

    for keyword in ["allOf", "anyOf", "oneOf"] {
        if let Some(members) = node.get(keyword).and_then(Value::as_array) {
            for member in members {
                collect_paths(root, member, prefix, refs, paths, depth + 1);
            }
        }
    }

    if let Some(properties) = node.get("properties").and_then(Value::as_object) {
        for (key, sub) in properties {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            paths.insert(path.clone());
            collect_paths(root, sub, &path, refs, paths, depth + 1);
        }
    }

    let item_schemas: Vec<&Value> = match node.get("items") {
        Some(Value::Array(tuple)) => tuple.iter().collect(),
        Some(items @ Value::Object(_)) => vec![items],
        _ => Vec::new(),
    };
    if !item_schemas.is_empty() {
        let path = format!("{}[]", prefix);
        if !prefix.is_empty() {
            paths.insert(path.clone());
        }
        for items in item_schemas {
            collect_paths(root, items, &path, refs, paths, depth + 1);
        }
    }
}
