//! Style resolution
//!
//! Block styles are stored camelCase with JSON values. Each rendered element
//! gets `merge(inherited, own)`; only inheritable properties flow on to the
//! children. The document styles seed the inherited set at the root.

use serde_json::Value;
use std::collections::BTreeMap;
use stencil_model::{merge_styles, Styles};

const INHERITED: &[&str] = &[
    "color",
    "direction",
    "fontFamily",
    "fontSize",
    "fontStyle",
    "fontVariant",
    "fontWeight",
    "letterSpacing",
    "lineHeight",
    "textAlign",
    "textIndent",
    "textTransform",
    "visibility",
    "whiteSpace",
    "wordSpacing",
];

const UNITLESS: &[&str] = &[
    "flex",
    "flexGrow",
    "flexShrink",
    "fontWeight",
    "lineHeight",
    "opacity",
    "order",
    "orphans",
    "widows",
    "zIndex",
];

pub fn is_inherited(property: &str) -> bool {
    INHERITED.contains(&property)
}

/// Inheritable subset of `styles`
pub fn inheritable(styles: &Styles) -> Styles {
    styles
        .iter()
        .filter(|(key, _)| is_inherited(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Styles for an element plus the set its children inherit
pub fn cascade(inherited: &Styles, own: &Styles) -> (Styles, Styles) {
    let computed = merge_styles(inherited, own);
    let passed_on = inheritable(&computed);
    (computed, passed_on)
}

/// `backgroundColor` → `background-color`
pub fn css_property(name: &str) -> String {
    if name.starts_with("--") {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

pub fn css_value(property: &str, value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if UNITLESS.contains(&property) => Some(n.to_string()),
        Value::Number(n) => Some(format!("{}px", n)),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Kebab-case CSS declarations for a style map
pub fn to_css(styles: &Styles) -> BTreeMap<String, String> {
    styles
        .iter()
        .filter_map(|(key, value)| css_value(key, value).map(|v| (css_property(key), v)))
        .collect()
}

/// `a: b; c: d` with properties in sorted order
pub fn inline_css(declarations: &BTreeMap<String, String>) -> String {
    declarations
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect::<Vec<_>>()
        .join("; ")
}
