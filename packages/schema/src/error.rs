use stencil_model::ModelError;
use thiserror::Error;

/// Errors raised by the contract editor and its host port
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Data example already exists: {0}")]
    DuplicateExample(String),

    #[error("Data example not found: {0}")]
    ExampleNotFound(String),

    #[error("Schema must be a JSON object")]
    InvalidSchema,

    #[error("Host error: {0}")]
    Host(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SchemaResult<T> = Result<T, SchemaError>;
