//! Sparse style maps
//!
//! Styles are stored as camelCase CSS property names mapped to JSON values.
//! `BTreeMap` keeps iteration (and therefore rendered output) deterministic.

use serde_json::Value;
use std::collections::BTreeMap;

pub type Styles = BTreeMap<String, Value>;

/// Overlay `own` on top of `base`; own values win on conflict.
pub fn merge_styles(base: &Styles, own: &Styles) -> Styles {
    let mut merged = base.clone();
    for (key, value) in own {
        if value.is_null() {
            merged.remove(key);
        } else {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}
