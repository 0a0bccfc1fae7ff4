//! JSON Schema keyword helpers shared by validation and migration

use serde_json::{Number, Value};

/// Bound on `$ref` / `allOf` indirection
pub(crate) const MAX_DEPTH: usize = 32;

/// Follow local `$ref`s (`#/definitions/*`, `#/$defs/*`)
pub(crate) fn resolve<'a>(root: &'a Value, mut node: &'a Value) -> &'a Value {
    for _ in 0..MAX_DEPTH {
        match node
            .get("$ref")
            .and_then(Value::as_str)
            .and_then(|reference| lookup_ref(root, reference))
        {
            Some(target) => node = target,
            None => break,
        }
    }
    node
}

pub(crate) fn lookup_ref<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    if pointer.starts_with("/definitions/") || pointer.starts_with("/$defs/") {
        root.pointer(pointer)
    } else {
        None
    }
}

/// `type` as a list (a single string or an array of strings)
pub(crate) fn declared_types(schema: &Value) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(ty)) => vec![ty.as_str()],
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn type_matches(value: &Value, ty: &str) -> bool {
    match ty {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => match value {
            Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
            _ => false,
        },
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Prefer an integer representation when the float is integral
pub(crate) fn number_value(f: f64) -> Option<Value> {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(Value::Number(Number::from(f as i64)))
    } else {
        Number::from_f64(f).map(Value::Number)
    }
}

/// Object keywords of a schema with `allOf` members merged in
pub(crate) struct ObjectView<'a> {
    pub properties: Vec<(&'a str, &'a Value)>,
    pub required: Vec<&'a str>,
    pub closed: bool,
}

impl<'a> ObjectView<'a> {
    pub fn of(root: &'a Value, schema: &'a Value) -> Self {
        let mut view = Self {
            properties: Vec::new(),
            required: Vec::new(),
            closed: false,
        };
        view.collect(root, schema, 0);
        view
    }

    fn collect(&mut self, root: &'a Value, schema: &'a Value, depth: usize) {
        let schema = resolve(root, schema);

        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (key, sub) in properties {
                if self.property(key).is_none() {
                    self.properties.push((key.as_str(), resolve(root, sub)));
                }
            }
        }
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for key in required.iter().filter_map(Value::as_str) {
                if !self.required.contains(&key) {
                    self.required.push(key);
                }
            }
        }
        if schema.get("additionalProperties") == Some(&Value::Bool(false)) {
            self.closed = true;
        }

        if depth < MAX_DEPTH {
            if let Some(members) = schema.get("allOf").and_then(Value::as_array) {
                for member in members {
                    self.collect(root, member, depth + 1);
                }
            }
        }
    }

    pub fn property(&self, key: &str) -> Option<&'a Value> {
        self.properties
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, schema)| *schema)
    }
}

/// Default for a missing field: the schema's `default`, else the zero value
/// of its first non-null type (objects get their required fields filled)
pub(crate) fn zero_value(root: &Value, schema: &Value) -> Value {
    zero_value_at(root, schema, 0)
}

fn zero_value_at(root: &Value, schema: &Value, depth: usize) -> Value {
    let schema = resolve(root, schema);
    if let Some(default) = schema.get("default") {
        return default.clone();
    }

    let ty = declared_types(schema)
        .into_iter()
        .find(|ty| *ty != "null")
        .unwrap_or("null");
    match ty {
        "string" => Value::String(String::new()),
        "number" | "integer" => Value::Number(Number::from(0)),
        "boolean" => Value::Bool(false),
        "array" => Value::Array(Vec::new()),
        "object" => {
            let view = ObjectView::of(root, schema);
            let mut object = serde_json::Map::new();
            if depth < MAX_DEPTH {
                for key in &view.required {
                    let value = view
                        .property(key)
                        .map(|sub| zero_value_at(root, sub, depth + 1))
                        .unwrap_or(Value::Null);
                    object.insert(key.to_string(), value);
                }
            }
            Value::Object(object)
        }
        _ => Value::Null,
    }
}

pub(crate) fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

pub(crate) fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

/// One step of a data path such as `items[0].price`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Key(String),
    Index(usize),
}

pub(crate) fn parse_path(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut key = String::new();
    let mut chars = path.chars();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !key.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut key)));
                }
            }
            '[' => {
                if !key.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut key)));
                }
                let digits: String = chars.by_ref().take_while(|c| *c != ']').collect();
                if let Ok(index) = digits.trim().parse() {
                    segments.push(Segment::Index(index));
                }
            }
            _ => key.push(c),
        }
    }
    if !key.is_empty() {
        segments.push(Segment::Key(key));
    }

    segments
}

pub(crate) fn value_at_mut<'a>(data: &'a mut Value, segments: &[Segment]) -> Option<&'a mut Value> {
    segments.iter().try_fold(data, |current, segment| match segment {
        Segment::Key(key) => current.as_object_mut()?.get_mut(key),
        Segment::Index(index) => current.as_array_mut()?.get_mut(*index),
    })
}
