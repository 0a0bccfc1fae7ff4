//! # Stencil Schema
//!
//! Expression/schema analysis for Stencil templates.
//!
//! ## Architecture
//!
//! ```text
//! Block tree ──► extract_expressions / extract_bound_expressions
//!                          │  (paths such as `items[0].price`)
//!                          ▼
//!                 normalize_array_path ──► `items[].price`
//!                          │
//! JSON Schema ──► schema_paths ──► path_matches_schema
//!                          │
//!          ┌───────────────┼──────────────────┐
//!          ▼               ▼                  ▼
//!   analyze_schema   detect_removed     get_expression
//!      _impact          _paths             _coverage
//!
//! Examples ──► validate_data ──► detect_migrations ──► apply_all_migrations
//!                    └──────────► check_compatibility ◄── ContractEditor
//! ```
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use stencil_model::Block;
//! use stencil_schema::{analyze_schema_impact, extract_bound_expressions};
//!
//! let blocks = vec![Block::repeat("rows", "items", "item", vec![
//!     Block::conditional("vip", "item.paid && customer.vip", vec![]),
//! ])];
//! let schema = json!({
//!     "type": "object",
//!     "properties": { "items": { "type": "array", "items": { "type": "object" } } }
//! });
//!
//! let paths = extract_bound_expressions(&blocks);
//! let issues = analyze_schema_impact(&schema, &paths);
//! assert_eq!(issues.len(), 1);
//! assert_eq!(issues[0].path, "customer.vip");
//! ```

mod compat;
mod contract;
mod error;
mod extract;
mod impact;
mod json_types;
mod migrate;
mod paths;
mod validate;

pub use compat::{check_compatibility, parse_schema, CompatibilityReport, ExampleIssue};
pub use contract::{ContractEditor, ContractHost, SaveOutcome};
pub use error::{SchemaError, SchemaResult};
pub use extract::{block_expressions, extract_bound_expressions, extract_expressions};
pub use impact::{
    analyze_schema_impact, detect_removed_paths, get_expression_coverage, ExpressionCoverage,
};
pub use migrate::{
    apply_all_migrations, apply_migration, detect_migrations, migrate_examples, Migration,
    MigrationAction, MigrationPlan, UnresolvedIssue,
};
pub use paths::{
    get_root_paths, normalize_array_path, path_matches_schema, root_segment, schema_paths,
};
pub use validate::{validate_data, ValidationError};
