//! Newton solver with bound constraints.

use crate::error::{SolverError, SolverResult};
use hf_core::Real;
use nalgebra::{DMatrix, DVector};

/// Newton solver configuration.
#[derive(Clone, Debug)]
pub struct NewtonConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Absolute tolerance for residual norm
    pub abs_tol: Real,
    /// Relative tolerance for residual norm
    pub rel_tol: Real,
    /// Line search backtracking factor
    pub line_search_beta: Real,
    /// Maximum line search iterations
    pub max_line_search_iters: usize,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            abs_tol: 1e-10,
            rel_tol: 1e-9,
            line_search_beta: 0.5,
            max_line_search_iters: 20,
        }
    }
}

/// Newton iteration result.
#[derive(Debug)]
pub struct NewtonResult {
    /// Solution vector
    pub x: DVector<Real>,
    /// Final residual norm
    pub residual_norm: Real,
    /// Number of iterations
    pub iterations: usize,
    /// Converged flag
    pub converged: bool,
}

/// The system a Newton iteration operates on.
///
/// `residual` may carry side effects (writing candidate unknowns into a
/// store); `jacobian` must not disturb the state `residual` left behind.
pub trait NewtonSystem {
    fn dim(&self) -> usize;

    fn residual(&mut self, x: &[Real], res: &mut [Real]) -> SolverResult<()>;

    fn jacobian(&mut self, x: &[Real]) -> SolverResult<DMatrix<Real>>;

    /// Allowed range for unknown `i`; the line search backtracks out of
    /// violations.
    fn bounds(&self, _i: usize) -> (Real, Real) {
        (Real::NEG_INFINITY, Real::INFINITY)
    }
}

fn eval_residual<S: NewtonSystem>(sys: &mut S, x: &DVector<Real>) -> SolverResult<DVector<Real>> {
    let mut res = vec![0.0; sys.dim()];
    sys.residual(x.as_slice(), &mut res)?;
    Ok(DVector::from_vec(res))
}

fn within_bounds<S: NewtonSystem>(sys: &S, x: &DVector<Real>) -> bool {
    x.iter().enumerate().all(|(i, &v)| {
        let (lo, hi) = sys.bounds(i);
        v >= lo && v <= hi
    })
}

/// Newton solver with line search and bound constraints.
pub fn newton_solve<S: NewtonSystem>(
    sys: &mut S,
    x0: DVector<Real>,
    config: &NewtonConfig,
) -> SolverResult<NewtonResult> {
    let mut x = x0;
    let mut r = eval_residual(sys, &x)?;
    let mut r_norm = r.norm();
    let r0_norm = r_norm;

    for iter in 0..config.max_iterations {
        // Check convergence
        if r_norm < config.abs_tol || r_norm < config.rel_tol * r0_norm {
            return Ok(NewtonResult {
                x,
                residual_norm: r_norm,
                iterations: iter,
                converged: true,
            });
        }

        // Compute Jacobian
        let jac = sys.jacobian(x.as_slice())?;

        // Solve J * dx = -r
        let dx = jac
            .lu()
            .solve(&(-r.clone()))
            .ok_or_else(|| SolverError::Singular {
                what: format!("Jacobian factorization failed at iteration {iter}"),
            })?;

        // Line search with bound constraints
        let mut alpha = 1.0;
        let mut x_new = &x + alpha * &dx;
        let mut r_new = eval_residual(sys, &x_new)?;
        let mut r_new_norm = r_new.norm();

        for _ in 0..config.max_line_search_iters {
            if within_bounds(sys, &x_new) && r_new_norm < r_norm {
                break;
            }

            // Backtrack
            alpha *= config.line_search_beta;
            x_new = &x + alpha * &dx;
            r_new = eval_residual(sys, &x_new)?;
            r_new_norm = r_new.norm();
        }

        // Update solution
        x = x_new;
        r = r_new;
        r_norm = r_new_norm;

        // Check for stagnation
        if alpha < 1e-10 {
            return Err(SolverError::ConvergenceFailed {
                what: format!("Line search stagnated at iteration {iter}"),
            });
        }
    }

    if r_norm < config.abs_tol || r_norm < config.rel_tol * r0_norm {
        return Ok(NewtonResult {
            x,
            residual_norm: r_norm,
            iterations: config.max_iterations,
            converged: true,
        });
    }

    Err(SolverError::ConvergenceFailed {
        what: format!(
            "Maximum iterations {} reached, residual = {}",
            config.max_iterations, r_norm
        ),
    })
}
