//! The engine: a model plus its exclusively owned run context.
//!
//! `Engine` is the capability surface an integrator drives: continuous and
//! discrete evaluation, zero-crossing indicators, relation updates, and the
//! event-iteration fixed point. Several engines can run side by side in one
//! process; nothing is shared between them.

use crate::error::SimResult;
use crate::evaluator::{self, PassKind};
use crate::events;
use crate::init;
use crate::integrator::OdeSystem;
use hf_core::Real;
use hf_model::{Context, Model};
use hf_solver::LinearSolveConfig;

pub struct Engine {
    model: Model,
    ctx: Context,
    lin_cfg: LinearSolveConfig,
    discrete_reals: Vec<usize>,
}

impl Engine {
    /// Validate the model and set up a fresh context for it.
    pub fn new(model: Model) -> SimResult<Self> {
        model.validate()?;
        let ctx = Context::new(&model);
        let discrete_reals = model.discrete_real_indices();
        Ok(Self {
            model,
            ctx,
            lin_cfg: LinearSolveConfig::default(),
            discrete_reals,
        })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    pub fn set_linear_config(&mut self, cfg: LinearSolveConfig) {
        self.lin_cfg = cfg;
    }

    pub fn time(&self) -> Real {
        self.ctx.time
    }

    pub fn set_time(&mut self, t: Real) {
        self.ctx.time = t;
    }

    pub fn num_states(&self) -> usize {
        self.model.n_states
    }

    pub fn num_zero_crossings(&self) -> usize {
        self.model.zero_crossings.len()
    }

    pub fn states(&self) -> &[Real] {
        self.ctx.vars.states()
    }

    pub fn set_states(&mut self, xs: &[Real]) {
        self.ctx.vars.set_states(xs);
    }

    /// One-shot initialization pass; see [`init::initialize`].
    pub fn initialize(&mut self, strict_initial_asserts: bool) -> SimResult<()> {
        init::initialize(
            &self.model,
            &mut self.ctx,
            &self.lin_cfg,
            strict_initial_asserts,
        )
    }

    /// Continuous/algebraic pass: recompute algebraic variables from the
    /// current states and time. Idempotent; never fires when-clauses or
    /// touches pre-values.
    pub fn evaluate_continuous(&mut self) -> SimResult<()> {
        evaluator::run_pass(
            &self.model,
            &mut self.ctx,
            PassKind::Continuous,
            &self.lin_cfg,
            &self.discrete_reals,
        )?;
        Ok(())
    }

    /// Discrete pass: the full equation list with when-clauses armed.
    /// Returns whether any discrete variable changed against its pre-value.
    pub fn evaluate_discrete(&mut self) -> SimResult<bool> {
        let outcome = evaluator::run_pass(
            &self.model,
            &mut self.ctx,
            PassKind::Discrete,
            &self.lin_cfg,
            &self.discrete_reals,
        )?;
        Ok(outcome.discrete_changed)
    }

    /// Refresh relation booleans; see [`events::update_relations`].
    pub fn update_relations(&mut self, at_event: bool) -> bool {
        events::update_relations(&self.model, &mut self.ctx, at_event)
    }

    /// Fill the ±1 indicator array for the root finder.
    pub fn zero_crossing_indicators(&self, out: &mut [Real]) {
        events::zero_crossing_indicators(&self.model, &self.ctx, out);
    }

    /// Confirm current relation values as the hysteresis memory.
    pub fn latch_stored_relations(&mut self) {
        events::latch_stored_relations(&mut self.ctx);
    }

    /// Resolve the discrete side of an event to a bounded fixed point.
    pub fn event_iteration(&mut self, max_iterations: u32) -> SimResult<u32> {
        events::event_iteration(
            &self.model,
            &mut self.ctx,
            &self.lin_cfg,
            &self.discrete_reals,
            max_iterations,
        )
    }

    /// Capture current values as pre-values (event boundaries only).
    pub fn commit_pre(&mut self) {
        self.ctx.commit_pre();
    }
}

impl OdeSystem for Engine {
    fn dim(&self) -> usize {
        self.num_states()
    }

    fn rhs(&mut self, t: Real, x: &[Real], dxdt: &mut [Real]) -> SimResult<()> {
        self.ctx.time = t;
        self.ctx.vars.set_states(x);
        self.evaluate_continuous()?;
        dxdt.copy_from_slice(self.ctx.vars.ders());
        Ok(())
    }
}
