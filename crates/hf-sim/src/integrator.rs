//! Fixed-step time integrators.

use crate::error::SimResult;
use hf_core::Real;

/// The continuous system an integrator advances.
pub trait OdeSystem {
    /// Number of continuous states.
    fn dim(&self) -> usize;

    /// Evaluate dxdt = f(t, x).
    fn rhs(&mut self, t: Real, x: &[Real], dxdt: &mut [Real]) -> SimResult<()>;
}

/// Trait for time integrators.
pub trait Integrator {
    /// Advance state by one time step, returning the new state.
    fn step<S: OdeSystem>(&self, sys: &mut S, t: Real, x: &[Real], dt: Real)
    -> SimResult<Vec<Real>>;
}

fn axpy(x: &[Real], k: &[Real], scale: Real) -> Vec<Real> {
    x.iter().zip(k).map(|(&xi, &ki)| xi + scale * ki).collect()
}

/// Forward Euler (explicit, 1st order, one rhs call per step).
#[derive(Clone, Debug)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    fn step<S: OdeSystem>(
        &self,
        sys: &mut S,
        t: Real,
        x: &[Real],
        dt: Real,
    ) -> SimResult<Vec<Real>> {
        let mut k = vec![0.0; sys.dim()];
        sys.rhs(t, x, &mut k)?;
        Ok(axpy(x, &k, dt))
    }
}

/// Classical RK4 (Runge-Kutta 4th order) integrator.
#[derive(Clone, Debug)]
pub struct Rk4;

impl Integrator for Rk4 {
    fn step<S: OdeSystem>(
        &self,
        sys: &mut S,
        t: Real,
        x: &[Real],
        dt: Real,
    ) -> SimResult<Vec<Real>> {
        let n = sys.dim();
        let mut k1 = vec![0.0; n];
        let mut k2 = vec![0.0; n];
        let mut k3 = vec![0.0; n];
        let mut k4 = vec![0.0; n];

        sys.rhs(t, x, &mut k1)?;
        sys.rhs(t + 0.5 * dt, &axpy(x, &k1, 0.5 * dt), &mut k2)?;
        sys.rhs(t + 0.5 * dt, &axpy(x, &k2, 0.5 * dt), &mut k3)?;
        sys.rhs(t + dt, &axpy(x, &k3, dt), &mut k4)?;

        // x_new = x + (dt/6) * (k1 + 2*k2 + 2*k3 + k4)
        Ok(x.iter()
            .enumerate()
            .map(|(i, &xi)| xi + dt / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]))
            .collect())
    }
}
