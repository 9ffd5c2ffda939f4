//! Error types for simulation operations.

use hf_core::{CoreError, EqId, Real};
use hf_model::ModelError;
use hf_solver::SolverError;
use thiserror::Error;

/// Errors encountered while driving a hybrid model.
///
/// Every fatal condition unwinds to the `run_sim` caller; nothing is caught
/// and retried inside the engine.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Assertion {equation} violated at t={time}: {message}")]
    AssertionFailed {
        equation: EqId,
        time: Real,
        message: String,
    },

    #[error("Event iteration did not converge at t={time} after {iterations} iterations")]
    EventIteration { time: Real, iterations: u32 },

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Numeric error: {0}")]
    Core(#[from] CoreError),
}

pub type SimResult<T> = Result<T, SimError>;
