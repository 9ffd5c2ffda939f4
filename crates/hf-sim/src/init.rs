//! One-shot initialization: parameter binding, resource construction,
//! initial equations, initial assertions.

use crate::error::SimResult;
use crate::evaluator::{self, AssertMode};
use hf_core::timing::Timer;
use hf_model::{Context, Model};
use hf_solver::LinearSolveConfig;
use tracing::{debug, info};

/// Run the initialization sequence exactly once before integration.
///
/// Order matters: derived parameters first (a table's shift time may be a
/// computed parameter), then external resources, then the initial
/// equations. Initial assertion violations are warnings unless
/// `strict_initial_asserts` is set, since many encode soft engineering
/// limits rather than hard invariants. Resource construction failures are
/// always fatal here, before any integration begins.
pub fn initialize(
    model: &Model,
    ctx: &mut Context,
    lin_cfg: &LinearSolveConfig,
    strict_initial_asserts: bool,
) -> SimResult<()> {
    let timer = Timer::start("initialize");
    info!(model = %model.name, "initializing");

    ctx.reset_run_state();
    model.apply_start_values(&mut ctx.vars);

    evaluator::run_list(&model.bind_parameters, ctx, lin_cfg)?;

    for binding in &model.tables {
        let table = (binding.build)(ctx)?;
        debug!(table = table.name(), "constructed external table");
        ctx.tables.push(table);
    }

    evaluator::run_list(&model.initial, ctx, lin_cfg)?;

    evaluator::check_assertions(model, ctx, AssertMode::Initial {
        strict: strict_initial_asserts,
    })?;

    ctx.commit_pre();
    timer.stop_and_print();
    Ok(())
}
