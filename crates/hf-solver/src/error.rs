//! Error types for solver operations.

use hf_core::{EqId, Real};
use hf_model::ModelError;
use thiserror::Error;

/// Errors that can occur while solving torn systems.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Convergence failed: {what}")]
    ConvergenceFailed { what: String },

    #[error("Singular system: {what}")]
    Singular { what: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },

    /// Failure wrapped with the identity of the failing torn system and the
    /// simulated time, the diagnostic the run aborts with.
    #[error("Linear system {equation} failed at t={time}: {source}")]
    LinearSystem {
        equation: EqId,
        time: Real,
        #[source]
        source: Box<SolverError>,
    },

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

pub type SolverResult<T> = Result<T, SolverError>;
