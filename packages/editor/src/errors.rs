//! Error types for the editor

use crate::mutations::MutationError;
use stencil_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Mutation error: {0}")]
    Mutation(#[from] MutationError),

    #[error("Nothing to {0}")]
    EmptyHistory(&'static str),
}

pub type EditorResult<T> = Result<T, EditorError>;
