//! Hybrid simulation engine for hybridflow models.
//!
//! Provides:
//! - ordered equation evaluation (continuous and discrete passes)
//! - hysteresis relations, zero-crossing indicators, bounded event iteration
//! - one-shot initialization and parameter binding
//! - fixed-step ForwardEuler/RK4 integrators
//! - a simulation runner with bisection event localization and result
//!   recording

pub mod engine;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod init;
pub mod integrator;
pub mod sim;

// Re-exports for public API
pub use engine::Engine;
pub use error::{SimError, SimResult};
pub use evaluator::{AssertMode, PassKind, PassOutcome};
pub use integrator::{ForwardEuler, Integrator, OdeSystem, Rk4};
pub use sim::{IntegratorType, SimOptions, SimRecord, run_sim};
