//! Linear system solver adapter for torn subsystems.

use crate::error::{SolverError, SolverResult};
use crate::jacobian::{analytic_jacobian, finite_difference_jacobian};
use crate::newton::{NewtonConfig, NewtonSystem, newton_solve};
use hf_core::Real;
use hf_core::timing::{AccumulatingTimer, Timer};
use hf_model::{Context, LinearSystem};
use nalgebra::{DMatrix, DVector};
use tracing::trace;

/// Configuration for torn-system solves.
///
/// Exact-Jacobian linear systems converge in one Newton step; the small
/// iteration cap absorbs callback round-off without hiding a genuinely
/// inconsistent system. Retry policy beyond that belongs to the embedding
/// solver, not here.
#[derive(Clone, Debug)]
pub struct LinearSolveConfig {
    pub newton: NewtonConfig,
    /// Perturbation scale for the finite-difference fallback.
    pub fd_epsilon: Real,
}

impl Default for LinearSolveConfig {
    fn default() -> Self {
        Self {
            newton: NewtonConfig {
                max_iterations: 3,
                ..NewtonConfig::default()
            },
            fd_epsilon: 1e-8,
        }
    }
}

/// Outcome of a successful torn-system solve.
#[derive(Clone, Copy, Debug)]
pub struct LinearSolveReport {
    pub iterations: usize,
    pub residual_norm: Real,
}

static SOLVE_TIME: AccumulatingTimer = AccumulatingTimer::new();

/// Accumulated (total seconds, call count) across torn-system solves.
pub fn solve_stats() -> (f64, u64) {
    (SOLVE_TIME.total_seconds(), SOLVE_TIME.count())
}

/// A torn system viewed through the Newton iteration interface.
struct TornSystem<'a> {
    ctx: &'a mut Context,
    sys: &'a LinearSystem,
    fd_epsilon: Real,
}

impl NewtonSystem for TornSystem<'_> {
    fn dim(&self) -> usize {
        self.sys.dim()
    }

    fn residual(&mut self, x: &[Real], res: &mut [Real]) -> SolverResult<()> {
        (self.sys.residual)(self.ctx, x, res)?;
        Ok(())
    }

    fn jacobian(&mut self, x: &[Real]) -> SolverResult<DMatrix<Real>> {
        match &self.sys.jacobian {
            Some(meta) => analytic_jacobian(self.ctx, meta),
            None => {
                let x = DVector::from_column_slice(x);
                let eps = self.fd_epsilon;
                finite_difference_jacobian(self, &x, eps)
            }
        }
    }

    fn bounds(&self, i: usize) -> (Real, Real) {
        self.sys.bounds[i]
    }
}

/// Solve a torn linear subsystem in place.
///
/// The initial guess is the unknowns' current store values, so the previous
/// solution seeds the next one across evaluation passes. On success the
/// solution (and the system's local constraint variables) are left written
/// in the store; any failure carries the equation id and simulated time.
pub fn solve_linear_system(
    ctx: &mut Context,
    sys: &LinearSystem,
    config: &LinearSolveConfig,
) -> SolverResult<LinearSolveReport> {
    let time = ctx.time;
    let timer = Timer::start("linear_solve");

    let x0 = DVector::from_iterator(
        sys.dim(),
        sys.unknowns.iter().map(|&u| ctx.vars.real(u)),
    );

    let mut torn = TornSystem {
        ctx,
        sys,
        fd_epsilon: config.fd_epsilon,
    };

    let wrap = |e: SolverError| SolverError::LinearSystem {
        equation: sys.id,
        time,
        source: Box::new(e),
    };

    let result = newton_solve(&mut torn, x0, &config.newton).map_err(wrap)?;

    // the last accepted line-search point is the solution; re-run the
    // residual so the store holds exactly the returned x
    let mut res = vec![0.0; sys.dim()];
    torn.residual(result.x.as_slice(), &mut res).map_err(wrap)?;

    if let Some(elapsed) = timer.stop() {
        SOLVE_TIME.record(elapsed);
    }
    trace!(
        equation = %sys.id,
        time,
        iterations = result.iterations,
        residual = result.residual_norm,
        "torn system solved"
    );

    Ok(LinearSolveReport {
        iterations: result.iterations,
        residual_norm: result.residual_norm,
    })
}
