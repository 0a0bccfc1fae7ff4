use thiserror::Error;

/// Errors raised while decoding or editing the data model
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to parse template: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("Duplicate data example id: {0}")]
    DuplicateExample(String),

    #[error("Data example not found: {0}")]
    ExampleNotFound(String),

    #[error("Slot not found: {0}")]
    SlotNotFound(String),

    #[error("Block not found: {0}")]
    BlockNotFound(String),

    #[error("Invalid merge in table {table_id}: {message}")]
    InvalidMerge { table_id: String, message: String },
}

pub type ModelResult<T> = Result<T, ModelError>;
