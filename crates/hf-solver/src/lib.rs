//! Linear-system solving for torn equation groups.
//!
//! This crate adapts torn subsystem descriptions from `hf-model` onto a
//! dense LU-backed Newton iteration: residual callbacks write candidate
//! unknowns into the store, the system matrix comes from the analytic
//! seed-propagation Jacobian (or finite differences as a fallback), and a
//! converged solve leaves the solution applied in place. For the linear
//! systems a causalizing compiler emits, one Newton step with an exact
//! Jacobian suffices.

pub mod error;
pub mod jacobian;
pub mod linear;
pub mod newton;

pub use error::{SolverError, SolverResult};
pub use jacobian::{analytic_jacobian, finite_difference_jacobian};
pub use linear::{LinearSolveConfig, LinearSolveReport, solve_linear_system, solve_stats};
pub use newton::{NewtonConfig, NewtonResult, NewtonSystem, newton_solve};
