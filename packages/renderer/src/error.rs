use thiserror::Error;

/// Errors produced while evaluating a single expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Syntax error at {position}: {message}")]
    Syntax { message: String, position: usize },

    #[error("{0} is not defined")]
    UnknownIdentifier(String),

    #[error("{0} is not a function")]
    UnknownFunction(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Evaluation timed out after {0} ms")]
    Timeout(u64),

    #[error("Context too large: {size} bytes exceeds limit of {limit} bytes")]
    ContextTooLarge { size: usize, limit: usize },

    #[error("Evaluation task failed: {0}")]
    Task(String),

    /// Raised by evaluators provided outside this crate
    #[error("{0}")]
    External(String),
}

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Data example not found: {0}")]
    ExampleNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RenderResult<T> = Result<T, RenderError>;
