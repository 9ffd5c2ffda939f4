//! Simulation runner and result recording.

use crate::engine::Engine;
use crate::error::{SimError, SimResult};
use crate::events::any_sign_change;
use crate::integrator::{ForwardEuler, Integrator, Rk4};
use hf_core::Real;
use hf_core::timing::Timer;
use tracing::{debug, info};

/// Integrator selection for simulation.
#[derive(Clone, Copy, Debug, Default)]
pub enum IntegratorType {
    /// 4th-order Runge-Kutta (default, 4 rhs calls per step).
    #[default]
    Rk4,
    /// Forward Euler (1st-order, 1 rhs call per step).
    ForwardEuler,
}

/// Options for simulation runs.
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Simulation start time (seconds)
    pub t_start: Real,
    /// Final simulation time (seconds)
    pub t_end: Real,
    /// Fixed time step (seconds)
    pub dt: Real,
    /// Maximum number of steps (safety limit)
    pub max_steps: usize,
    /// Record every N-th step (decimation); event points always record
    pub record_every: usize,
    /// Integrator type (default: RK4)
    pub integrator: IntegratorType,
    /// Escalate warning-level assertion violations to fatal errors
    pub strict_asserts: bool,
    /// Treat initial assertion violations as fatal
    pub strict_initial_asserts: bool,
    /// Bound on the discrete fixed point per event
    pub max_event_iterations: u32,
    /// Time resolution of zero-crossing localization (seconds)
    pub zc_time_tol: Real,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            t_start: 0.0,
            t_end: 1.0,
            dt: 1e-3,
            max_steps: 100_000,
            record_every: 10,
            integrator: IntegratorType::default(),
            strict_asserts: false,
            strict_initial_asserts: false,
            max_event_iterations: 20,
            zc_time_tol: 1e-9,
        }
    }
}

/// Record of simulation results: store snapshots at sampled times.
#[derive(Clone, Debug, Default)]
pub struct SimRecord {
    /// Time points (seconds)
    pub t: Vec<Real>,
    /// Real variable snapshots
    pub reals: Vec<Vec<Real>>,
    /// Boolean variable snapshots
    pub booleans: Vec<Vec<bool>>,
    /// Integer variable snapshots
    pub integers: Vec<Vec<i64>>,
    /// Number of handled events
    pub events: usize,
}

impl SimRecord {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn real_at(&self, sample: usize, var: usize) -> Real {
        self.reals[sample][var]
    }

    pub fn boolean_at(&self, sample: usize, var: usize) -> bool {
        self.booleans[sample][var]
    }

    fn push(&mut self, engine: &Engine) {
        let vars = &engine.context().vars;
        self.t.push(engine.time());
        self.reals.push(vars.reals().to_vec());
        self.booleans.push(vars.booleans().to_vec());
        self.integers.push(vars.integers().to_vec());
    }
}

fn validate(opts: &SimOptions) -> SimResult<()> {
    if opts.dt <= 0.0 {
        return Err(SimError::InvalidArg {
            what: "dt must be positive",
        });
    }
    if opts.t_end < opts.t_start {
        return Err(SimError::InvalidArg {
            what: "t_end must not precede t_start",
        });
    }
    if opts.max_steps == 0 {
        return Err(SimError::InvalidArg {
            what: "max_steps must be positive",
        });
    }
    if opts.record_every == 0 {
        return Err(SimError::InvalidArg {
            what: "record_every must be positive",
        });
    }
    if opts.zc_time_tol <= 0.0 {
        return Err(SimError::InvalidArg {
            what: "zc_time_tol must be positive",
        });
    }
    if opts.max_event_iterations == 0 {
        return Err(SimError::InvalidArg {
            what: "max_event_iterations must be positive",
        });
    }
    Ok(())
}

/// Re-integrate from (t0, x0) over `dt` and evaluate the continuous pass at
/// the endpoint.
fn advance(
    engine: &mut Engine,
    integrator: IntegratorType,
    t0: Real,
    x0: &[Real],
    dt: Real,
) -> SimResult<()> {
    let x_new = match integrator {
        IntegratorType::Rk4 => Rk4.step(engine, t0, x0, dt)?,
        IntegratorType::ForwardEuler => ForwardEuler.step(engine, t0, x0, dt)?,
    };
    engine.set_states(&x_new);
    engine.set_time(t0 + dt);
    engine.evaluate_continuous()
}

/// Bisect the step interval down to `zc_time_tol` to localize the earliest
/// indicator sign change in (t0, t0 + dt]. Leaves the engine evaluated just
/// past the crossing and returns that time.
fn locate_event(
    engine: &mut Engine,
    opts: &SimOptions,
    t0: Real,
    x0: &[Real],
    dt: Real,
    g_ref: &[Real],
) -> SimResult<Real> {
    let mut lo = 0.0;
    let mut hi = dt;
    let mut g_mid = vec![0.0; g_ref.len()];
    let floor = Real::EPSILON * t0.abs().max(1.0);

    while hi - lo > opts.zc_time_tol && hi - lo > floor {
        let mid = 0.5 * (lo + hi);
        advance(engine, opts.integrator, t0, x0, mid)?;
        engine.zero_crossing_indicators(&mut g_mid);
        if any_sign_change(g_ref, &g_mid) {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    advance(engine, opts.integrator, t0, x0, hi)?;
    Ok(t0 + hi)
}

/// Run a hybrid simulation with fixed-step integration and event handling.
///
/// Initialization runs first, then an initial discrete fixed point so the
/// model starts event-consistent. Each step integrates the continuous
/// states, watches the zero-crossing indicators, and on a sign change
/// localizes the crossing by bisection, resolves the discrete fixed point
/// there, and resumes from the event time.
pub fn run_sim(engine: &mut Engine, opts: &SimOptions) -> SimResult<SimRecord> {
    validate(opts)?;
    let timer = Timer::start("run_sim");

    engine.context_mut().strict_asserts = opts.strict_asserts;
    engine.initialize(opts.strict_initial_asserts)?;
    engine.set_time(opts.t_start);
    engine.evaluate_continuous()?;
    engine.event_iteration(opts.max_event_iterations)?;
    engine.latch_stored_relations();

    let nzc = engine.num_zero_crossings();
    let mut g_prev = vec![0.0; nzc];
    let mut g_now = vec![0.0; nzc];
    engine.zero_crossing_indicators(&mut g_prev);

    let mut record = SimRecord::default();
    record.push(engine);

    let mut step = 0usize;
    while engine.time() < opts.t_end && step < opts.max_steps {
        let t0 = engine.time();
        let dt = opts.dt.min(opts.t_end - t0);
        if dt < Real::EPSILON * t0.abs().max(1.0) {
            // remaining interval is below time resolution
            break;
        }
        let x0 = engine.states().to_vec();

        advance(engine, opts.integrator, t0, &x0, dt)?;
        engine.zero_crossing_indicators(&mut g_now);

        if any_sign_change(&g_prev, &g_now) {
            let t_event = locate_event(engine, opts, t0, &x0, dt, &g_prev)?;
            let iterations = engine.event_iteration(opts.max_event_iterations)?;
            engine.latch_stored_relations();
            engine.zero_crossing_indicators(&mut g_prev);
            debug!(time = t_event, iterations, "event handled");
            record.events += 1;
            record.push(engine);
            step += 1;
            continue;
        }

        g_prev.copy_from_slice(&g_now);
        step += 1;
        if step % opts.record_every == 0 {
            record.push(engine);
        }
    }

    // Always record final state
    if record.t.last() != Some(&engine.time()) {
        record.push(engine);
    }

    info!(
        steps = step,
        events = record.events,
        t_end = engine.time(),
        "simulation finished"
    );
    timer.stop_and_print();
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hf_model::ModelBuilder;

    #[test]
    fn sim_options_defaults() {
        let opts = SimOptions::default();
        assert_eq!(opts.dt, 1e-3);
        assert_eq!(opts.t_end, 1.0);
        assert_eq!(opts.max_steps, 100_000);
        assert_eq!(opts.record_every, 10);
        assert_eq!(opts.max_event_iterations, 20);
    }

    #[test]
    fn run_sim_rejects_bad_options() {
        let model = ModelBuilder::new("empty").build().unwrap();
        let mut engine = Engine::new(model).unwrap();

        let bad_dt = SimOptions {
            dt: 0.0,
            ..SimOptions::default()
        };
        assert!(matches!(
            run_sim(&mut engine, &bad_dt),
            Err(SimError::InvalidArg { .. })
        ));

        let bad_order = SimOptions {
            t_start: 2.0,
            t_end: 1.0,
            ..SimOptions::default()
        };
        assert!(matches!(
            run_sim(&mut engine, &bad_order),
            Err(SimError::InvalidArg { .. })
        ));
    }

    #[test]
    fn empty_model_runs_to_t_end() {
        let model = ModelBuilder::new("empty").build().unwrap();
        let mut engine = Engine::new(model).unwrap();
        let record = run_sim(&mut engine, &SimOptions::default()).unwrap();
        assert!(!record.is_empty());
        assert!((record.t.last().unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(record.events, 0);
    }
}
