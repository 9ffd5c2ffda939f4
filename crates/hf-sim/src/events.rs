//! Event and zero-crossing management.
//!
//! Relations are evaluated with a hysteresis dead band against their stored
//! sign while the root finder hunts for a crossing, and by direct
//! comparison exactly at a confirmed event time. Zero-crossing expressions
//! expose a ±1 indicator per registered crossing; a sign change between two
//! evaluations is what the step loop reacts to. Simultaneous events are
//! resolved by iterating the discrete pass to a bounded fixed point.

use crate::error::{SimError, SimResult};
use crate::evaluator::{self, PassKind};
use hf_core::Real;
use hf_model::{Context, Model, RelOp, Relation};
use hf_solver::LinearSolveConfig;
use tracing::debug;

/// Hysteresis-protected relation value.
///
/// A relation that was true stays true until the margin clearly drops below
/// the band, and vice versa, so values sitting at the threshold cannot
/// chatter.
pub fn relation_hysteresis(rel: &Relation, ctx: &Context, stored: bool) -> bool {
    let lhs = (rel.lhs)(ctx);
    let rhs = (rel.rhs)(ctx);
    let band = ctx.hysteresis.band(lhs, rhs);
    match rel.op {
        RelOp::GreaterEq => {
            if stored {
                lhs >= rhs - band
            } else {
                lhs >= rhs + band
            }
        }
        RelOp::Greater => {
            if stored {
                lhs > rhs - band
            } else {
                lhs > rhs + band
            }
        }
        RelOp::LessEq => {
            if stored {
                lhs <= rhs + band
            } else {
                lhs <= rhs - band
            }
        }
        RelOp::Less => {
            if stored {
                lhs < rhs + band
            } else {
                lhs < rhs - band
            }
        }
    }
}

/// Plain comparison, used exactly at a confirmed event time.
pub fn relation_direct(rel: &Relation, ctx: &Context) -> bool {
    let lhs = (rel.lhs)(ctx);
    let rhs = (rel.rhs)(ctx);
    match rel.op {
        RelOp::GreaterEq => lhs >= rhs,
        RelOp::Greater => lhs > rhs,
        RelOp::LessEq => lhs <= rhs,
        RelOp::Less => lhs < rhs,
    }
}

/// Refresh the relation booleans equations read.
///
/// `at_event = false` follows the hysteresis path against the stored signs
/// (integrating across a crossing); `at_event = true` compares directly
/// (evaluating exactly at the crossing). Returns whether any relation
/// changed value.
pub fn update_relations(model: &Model, ctx: &mut Context, at_event: bool) -> bool {
    let mut changed = false;
    for (i, rel) in model.relations.iter().enumerate() {
        let new = if at_event {
            relation_direct(rel, ctx)
        } else {
            relation_hysteresis(rel, ctx, ctx.stored_relations[i])
        };
        if new != ctx.relations[i] {
            changed = true;
            ctx.relations[i] = new;
        }
    }
    changed
}

/// Fill the ±1 indicator array the root finder watches.
pub fn zero_crossing_indicators(model: &Model, ctx: &Context, out: &mut [Real]) {
    debug_assert_eq!(out.len(), model.zero_crossings.len());
    let bools: Vec<bool> = model
        .relations
        .iter()
        .enumerate()
        .map(|(i, rel)| relation_hysteresis(rel, ctx, ctx.stored_relations[i]))
        .collect();
    for (g, zc) in out.iter_mut().zip(&model.zero_crossings) {
        *g = if zc.expr.eval(&bools) { 1.0 } else { -1.0 };
    }
}

/// Confirm the current relation values as the new hysteresis memory.
pub fn latch_stored_relations(ctx: &mut Context) {
    ctx.stored_relations.copy_from_slice(&ctx.relations);
}

/// Any indicator flipped sign between two evaluations.
pub fn any_sign_change(prev: &[Real], now: &[Real]) -> bool {
    prev.iter().zip(now).any(|(&a, &b)| a * b < 0.0)
}

/// Resolve the discrete side of an event to a fixed point.
///
/// Each round updates relations by direct comparison, runs a discrete pass
/// (firing due when-clauses), refreshes relations that depend on freshly
/// written discrete variables, and commits pre-values. The round count is
/// bounded; exhaustion means an ill-posed or chattering discrete model.
pub fn event_iteration(
    model: &Model,
    ctx: &mut Context,
    lin_cfg: &LinearSolveConfig,
    discrete_reals: &[usize],
    max_iterations: u32,
) -> SimResult<u32> {
    for iter in 1..=max_iterations {
        update_relations(model, ctx, true);
        let outcome = evaluator::run_pass(model, ctx, PassKind::Discrete, lin_cfg, discrete_reals)?;
        // relations may depend on discrete variables written this pass
        // (e.g. a pre(nextTimeEvent) threshold)
        update_relations(model, ctx, true);
        let changed = outcome.discrete_changed || ctx.relations != ctx.relations_pre;
        ctx.commit_pre();
        if !changed {
            debug!(time = ctx.time, iterations = iter, "event iteration converged");
            return Ok(iter);
        }
    }
    Err(SimError::EventIteration {
        time: ctx.time,
        iterations: max_iterations,
    })
}
