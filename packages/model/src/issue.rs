use serde::{Deserialize, Serialize};

/// Kind of schema/expression incompatibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    /// Expression path not declared by the schema
    Missing,
    /// Expression path declared by the previous schema but not the new one
    Removed,
}

/// A schema issue surfaced to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaIssue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub path: String,
    pub message: String,
}

impl SchemaIssue {
    pub fn missing(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            kind: IssueKind::Missing,
            message: format!("Expression path '{}' is not defined in the schema", path),
            path,
        }
    }

    pub fn removed(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            kind: IssueKind::Removed,
            message: format!(
                "Expression path '{}' is used by the template but was removed from the schema",
                path
            ),
            path,
        }
    }
}
