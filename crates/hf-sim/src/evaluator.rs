//! Ordered equation pass execution.
//!
//! A pass walks the model's fixed equation list in order. The continuous
//! pass is idempotent: it only recomputes algebraic variables and never
//! touches pre-values or fires when-clauses. The discrete pass additionally
//! evaluates when-clauses, gated on the rising edge of their condition
//! against the pre shadow. Assertions are checked at the end of every pass.

use crate::error::{SimError, SimResult};
use hf_core::EqId;
use hf_model::{AssertLevel, Context, EqKind, Equation, Model, ModelError};
use hf_solver::{LinearSolveConfig, solve_linear_system};
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassKind {
    Continuous,
    Discrete,
}

/// Result of one evaluation pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassOutcome {
    /// A discrete variable differs from its pre-value (discrete pass only).
    pub discrete_changed: bool,
}

/// Assertion checking policy for a pass.
#[derive(Clone, Copy, Debug)]
pub enum AssertMode {
    /// Initialization: everything is a warning unless explicitly strict.
    Initial { strict: bool },
    /// Runtime: `Error`-level assertions are fatal, warnings escalate under
    /// the run's strict flag.
    Runtime,
}

fn tag(e: ModelError, id: EqId) -> ModelError {
    match e {
        e @ ModelError::Eval { .. } => e,
        other => ModelError::Eval {
            equation: id,
            what: other.to_string(),
        },
    }
}

/// Evaluate a standalone equation list (parameter binding, initial
/// equations). When-clauses are rejected at model build and cannot appear.
pub fn run_list(
    equations: &[Equation],
    ctx: &mut Context,
    lin_cfg: &LinearSolveConfig,
) -> SimResult<()> {
    for eq in equations {
        match &eq.kind {
            EqKind::Assign(f) => f(ctx).map_err(|e| tag(e, eq.id))?,
            EqKind::Linear(sys) => {
                solve_linear_system(ctx, sys, lin_cfg)?;
            }
            EqKind::When(_) => {
                return Err(SimError::Model(ModelError::Invalid {
                    what: format!("when-clause {} in a one-shot list", eq.id),
                }));
            }
        }
    }
    Ok(())
}

/// Run one evaluation pass over the main equation list.
pub fn run_pass(
    model: &Model,
    ctx: &mut Context,
    pass: PassKind,
    lin_cfg: &LinearSolveConfig,
    discrete_reals: &[usize],
) -> SimResult<PassOutcome> {
    for eq in &model.equations {
        match &eq.kind {
            EqKind::Assign(f) => f(ctx).map_err(|e| tag(e, eq.id))?,
            EqKind::Linear(sys) => {
                solve_linear_system(ctx, sys, lin_cfg)?;
            }
            EqKind::When(w) => {
                if pass == PassKind::Discrete
                    && ctx.vars.boolean(w.condition)
                    && !ctx.vars.pre_boolean(w.condition)
                {
                    (w.effect)(ctx).map_err(|e| tag(e, eq.id))?;
                }
            }
        }
    }

    check_assertions(model, ctx, AssertMode::Runtime)?;

    let discrete_changed = pass == PassKind::Discrete && any_discrete_change(ctx, discrete_reals);
    Ok(PassOutcome { discrete_changed })
}

/// True if any discrete variable differs from its pre shadow.
pub fn any_discrete_change(ctx: &Context, discrete_reals: &[usize]) -> bool {
    let vars = &ctx.vars;
    if discrete_reals
        .iter()
        .any(|&i| vars.real(i) != vars.pre_real(i))
    {
        return true;
    }
    let n_bools = vars.booleans().len();
    if (0..n_bools).any(|i| vars.boolean(i) != vars.pre_boolean(i)) {
        return true;
    }
    let n_ints = vars.integers().len();
    (0..n_ints).any(|i| vars.integer(i) != vars.pre_integer(i))
}

/// Evaluate the model's assertion records.
///
/// A violated warning is logged once per assertion per run via the latch in
/// the context; fatal violations abort with equation id and simulated time.
pub fn check_assertions(model: &Model, ctx: &mut Context, mode: AssertMode) -> SimResult<()> {
    for (k, a) in model.assertions.iter().enumerate() {
        if (a.check)(ctx) {
            continue;
        }
        let fatal = match mode {
            AssertMode::Initial { strict } => strict,
            AssertMode::Runtime => a.level == AssertLevel::Error || ctx.strict_asserts,
        };
        if fatal {
            return Err(SimError::AssertionFailed {
                equation: a.id,
                time: ctx.time,
                message: (a.message)(ctx),
            });
        }
        if !ctx.assert_warned[k] {
            ctx.assert_warned[k] = true;
            warn!(
                equation = %a.id,
                time = ctx.time,
                "assertion violated: {}",
                (a.message)(ctx)
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hf_model::{AssertLevel, Assertion, ModelBuilder, RealAttributes, VarRole};

    fn toy_model(strict: AssertLevel) -> Model {
        let mut mb = ModelBuilder::new("toy");
        let y = mb.algebraic("y", RealAttributes::default());
        let q = mb.boolean("q", VarRole::Discrete, false);
        let trig = mb.boolean("trig", VarRole::Discrete, false);
        mb.assign(1, move |ctx| {
            ctx.vars.set_real(y, 2.0 * ctx.time);
            Ok(())
        });
        mb.when(2, trig, move |ctx| {
            ctx.vars.set_boolean(q, true);
            Ok(())
        });
        mb.assertion(Assertion::new(
            3,
            strict,
            move |ctx| ctx.vars.real(y) <= 10.0,
            move |ctx| format!("y = {} exceeds 10", ctx.vars.real(y)),
        ));
        mb.build().unwrap()
    }

    #[test]
    fn continuous_pass_is_idempotent_and_skips_whens() {
        let model = toy_model(AssertLevel::Warning);
        let mut ctx = Context::new(&model);
        let cfg = LinearSolveConfig::default();
        ctx.time = 1.0;
        ctx.vars.set_boolean(1, true); // trigger armed, but pass is continuous

        let dr = model.discrete_real_indices();
        run_pass(&model, &mut ctx, PassKind::Continuous, &cfg, &dr).unwrap();
        let y1 = ctx.vars.real(0);
        run_pass(&model, &mut ctx, PassKind::Continuous, &cfg, &dr).unwrap();
        assert_eq!(ctx.vars.real(0), y1);
        assert!(!ctx.vars.boolean(0), "when-clause fired in continuous pass");
    }

    #[test]
    fn when_fires_only_on_rising_edge() {
        let model = toy_model(AssertLevel::Warning);
        let mut ctx = Context::new(&model);
        let cfg = LinearSolveConfig::default();
        let dr = model.discrete_real_indices();

        // trig false -> no fire
        let out = run_pass(&model, &mut ctx, PassKind::Discrete, &cfg, &dr).unwrap();
        assert!(!out.discrete_changed);
        assert!(!ctx.vars.boolean(0));

        // rising edge fires exactly once
        ctx.vars.set_boolean(1, true);
        let out = run_pass(&model, &mut ctx, PassKind::Discrete, &cfg, &dr).unwrap();
        assert!(out.discrete_changed);
        assert!(ctx.vars.boolean(0));

        // committed edge does not re-fire
        ctx.commit_pre();
        ctx.vars.set_boolean(0, false);
        ctx.vars.set_boolean(0, true); // restore; still equal to pre
        let out = run_pass(&model, &mut ctx, PassKind::Discrete, &cfg, &dr).unwrap();
        assert!(!out.discrete_changed);
    }

    #[test]
    fn warning_assertion_is_latched_once() {
        let model = toy_model(AssertLevel::Warning);
        let mut ctx = Context::new(&model);
        let cfg = LinearSolveConfig::default();
        let dr = model.discrete_real_indices();
        ctx.time = 100.0; // y = 200 violates the bound

        run_pass(&model, &mut ctx, PassKind::Continuous, &cfg, &dr).unwrap();
        assert!(ctx.assert_warned[0]);
        // second violation passes silently through the latch
        run_pass(&model, &mut ctx, PassKind::Continuous, &cfg, &dr).unwrap();
    }

    #[test]
    fn strict_run_escalates_warnings() {
        let model = toy_model(AssertLevel::Warning);
        let mut ctx = Context::new(&model);
        ctx.strict_asserts = true;
        ctx.time = 100.0;
        let cfg = LinearSolveConfig::default();
        let dr = model.discrete_real_indices();

        let err = run_pass(&model, &mut ctx, PassKind::Continuous, &cfg, &dr).unwrap_err();
        assert!(matches!(err, SimError::AssertionFailed { .. }));
    }

    #[test]
    fn error_assertion_is_always_fatal() {
        let model = toy_model(AssertLevel::Error);
        let mut ctx = Context::new(&model);
        ctx.time = 100.0;
        let cfg = LinearSolveConfig::default();
        let dr = model.discrete_real_indices();

        let err = run_pass(&model, &mut ctx, PassKind::Continuous, &cfg, &dr).unwrap_err();
        match err {
            SimError::AssertionFailed { equation, time, .. } => {
                assert_eq!(equation.index(), 3);
                assert_eq!(time, 100.0);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn initial_mode_downgrades_errors_to_warnings() {
        let model = toy_model(AssertLevel::Error);
        let mut ctx = Context::new(&model);
        ctx.time = 100.0;
        ctx.vars.set_real(0, 50.0); // violated before any pass runs
        check_assertions(&model, &mut ctx, AssertMode::Initial { strict: false }).unwrap();
        let err =
            check_assertions(&model, &mut ctx, AssertMode::Initial { strict: true }).unwrap_err();
        assert!(matches!(err, SimError::AssertionFailed { .. }));
    }
}
