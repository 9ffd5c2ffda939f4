//! Error types for model description and evaluation.

use hf_core::{CoreError, EqId};
use thiserror::Error;

/// Errors raised while building a model or evaluating its callbacks.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid model: {what}")]
    Invalid { what: String },

    #[error("Table '{name}': {what}")]
    Table { name: String, what: String },

    #[error("Equation {equation}: {what}")]
    Eval { equation: EqId, what: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type ModelResult<T> = Result<T, ModelError>;
