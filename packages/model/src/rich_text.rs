//! Rich-text (ProseMirror-style JSON) helpers
//!
//! The engine treats text content as opaque JSON except for expression atoms:
//! `{"type": "expression", "attrs": {"expression": "<raw>"}}`.

use serde_json::{json, Value};

pub const EXPRESSION_NODE: &str = "expression";

pub fn empty_document() -> Value {
    json!({ "type": "doc", "content": [] })
}

/// Raw expressions of every expression atom, in document order
pub fn expression_atoms(content: &Value) -> Vec<String> {
    let mut atoms = Vec::new();
    collect_atoms(content, &mut atoms);
    atoms
}

fn collect_atoms(node: &Value, atoms: &mut Vec<String>) {
    match node {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some(EXPRESSION_NODE) {
                if let Some(raw) = expression_of(node) {
                    atoms.push(raw.to_string());
                }
            }
            if let Some(children) = map.get("content") {
                collect_atoms(children, atoms);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_atoms(item, atoms);
            }
        }
        _ => {}
    }
}

/// Raw expression of an expression atom node
pub fn expression_of(node: &Value) -> Option<&str> {
    node.get("attrs")
        .and_then(|attrs| attrs.get("expression"))
        .and_then(Value::as_str)
}

pub fn node_type(node: &Value) -> Option<&str> {
    node.get("type").and_then(Value::as_str)
}

pub fn children(node: &Value) -> &[Value] {
    node.get("content")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub fn doc(content: Vec<Value>) -> Value {
    json!({ "type": "doc", "content": content })
}

pub fn paragraph(content: Vec<Value>) -> Value {
    json!({ "type": "paragraph", "content": content })
}

pub fn heading(level: u8, content: Vec<Value>) -> Value {
    json!({ "type": "heading", "attrs": { "level": level }, "content": content })
}

pub fn text_node(text: &str) -> Value {
    json!({ "type": "text", "text": text })
}

pub fn marked_text(text: &str, marks: &[&str]) -> Value {
    let marks: Vec<Value> = marks.iter().map(|m| json!({ "type": m })).collect();
    json!({ "type": "text", "text": text, "marks": marks })
}

pub fn expression_node(raw: &str) -> Value {
    json!({ "type": EXPRESSION_NODE, "attrs": { "expression": raw } })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atoms_in_document_order() {
        let content = doc(vec![
            paragraph(vec![
                text_node("Dear "),
                expression_node("customer.name"),
                text_node(", total "),
                expression_node("total"),
            ]),
            heading(2, vec![expression_node("title")]),
        ]);

        assert_eq!(
            expression_atoms(&content),
            vec!["customer.name", "total", "title"]
        );
    }

    #[test]
    fn test_atom_without_expression_attr_is_ignored() {
        let content = doc(vec![json!({ "type": "expression", "attrs": {} })]);
        assert!(expression_atoms(&content).is_empty());
    }
}
