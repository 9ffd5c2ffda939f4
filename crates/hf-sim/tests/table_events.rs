//! Integration test: time-table driven discrete updates.
//!
//! A piecewise-constant table feeds a sampled output through the classic
//! `time >= pre(nextTimeEvent)` pattern: each firing reads the table value
//! and schedules the next breakpoint as a time event.

use hf_model::{
    Extrapolation, ModelBuilder, RealAttributes, RelOp, Smoothness, TableConfig, TimeEvents,
    TimeTable, VarRole, ZcExpr,
};
use hf_sim::{Engine, SimOptions, run_sim};

fn sampler_engine() -> (Engine, usize) {
    let mut mb = ModelBuilder::new("sampler");

    let y = mb.discrete_real("y", RealAttributes::default());
    let next_event = mb.discrete_real("nextTimeEvent", RealAttributes::default());
    let sample_now = mb.boolean("sample_now", VarRole::Discrete, false);

    let table_name = mb.string_parameter("tableName", "schedule");
    let table = mb.table(141, move |ctx| {
        TimeTable::new(TableConfig {
            name: ctx.vars.string_param(table_name).to_string(),
            rows: vec![vec![0.0, 0.0], vec![0.5, 2.0], vec![1.0, -1.0]],
            columns: vec![1],
            start_time: 0.0,
            shift_time: 0.0,
            smoothness: Smoothness::ConstantSegments,
            extrapolation: Extrapolation::HoldLastPoint,
            time_events: TimeEvents::Always,
        })
    });

    let r_te = mb.relation(
        RelOp::GreaterEq,
        |ctx| ctx.time,
        move |ctx| ctx.vars.pre_real(next_event),
        "time >= pre(nextTimeEvent)",
    );
    mb.zero_crossing(ZcExpr::Rel(r_te), "time >= pre(nextTimeEvent)");

    mb.assign(1, move |ctx| {
        let v = ctx.relation(r_te);
        ctx.vars.set_boolean(sample_now, v);
        Ok(())
    });
    mb.when(2, sample_now, move |ctx| {
        let t = ctx.time;
        let v = ctx.table(table).value_at(t, 0)?;
        ctx.vars.set_real(y, v);
        let ne = ctx.table(table).next_event_after(t);
        ctx.vars.set_real(next_event, ne);
        Ok(())
    });

    let engine = Engine::new(mb.build().unwrap()).unwrap();
    (engine, y)
}

#[test]
fn table_breakpoints_fire_as_time_events() {
    let (mut engine, y) = sampler_engine();
    let opts = SimOptions {
        t_end: 1.3,
        dt: 0.01,
        record_every: 1,
        ..SimOptions::default()
    };
    let record = run_sim(&mut engine, &opts).unwrap();

    // initial firing at t = 0 sampled the first segment
    assert_eq!(record.real_at(0, y), 0.0);

    // the two remaining breakpoints arrive as localized events
    assert_eq!(record.events, 2);

    let mut changes = Vec::new();
    for s in 1..record.len() {
        let prev = record.real_at(s - 1, y);
        let cur = record.real_at(s, y);
        if prev != cur {
            changes.push((record.t[s], cur));
        }
    }
    assert_eq!(changes.len(), 2);

    let (t1, v1) = changes[0];
    assert!((t1 - 0.5).abs() < 1e-6);
    assert_eq!(v1, 2.0);

    let (t2, v2) = changes[1];
    assert!((t2 - 1.0).abs() < 1e-6);
    assert_eq!(v2, -1.0);

    // holds the last value once the schedule is exhausted
    assert_eq!(record.real_at(record.len() - 1, y), -1.0);
}

#[test]
fn sampled_output_is_piecewise_constant_between_events() {
    let (mut engine, y) = sampler_engine();
    let opts = SimOptions {
        t_end: 0.4,
        dt: 0.01,
        record_every: 1,
        ..SimOptions::default()
    };
    let record = run_sim(&mut engine, &opts).unwrap();

    // no breakpoint inside (0, 0.4]: the sampled value never moves
    assert_eq!(record.events, 0);
    for s in 0..record.len() {
        assert_eq!(record.real_at(s, y), 0.0);
    }
    // no event means no commit: the pre shadow still holds the initial sample
    assert_eq!(engine.context().vars.pre_real(y), 0.0);
}