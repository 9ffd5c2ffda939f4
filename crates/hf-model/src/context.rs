//! The per-run simulation context.
//!
//! One `Context` is exclusively owned by one simulation run; several runs in
//! the same process (parameter sweeps) each carry their own. There is no
//! process-wide state.

use crate::model::Model;
use crate::store::VariableStore;
use crate::table::TimeTable;
use hf_core::Real;

/// Hysteresis dead band applied to relation evaluation: relative width
/// scaled by operand magnitude, with an absolute floor.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hysteresis {
    pub rel: Real,
    pub abs: Real,
}

impl Default for Hysteresis {
    fn default() -> Self {
        Self {
            rel: 1e-10,
            abs: 1e-12,
        }
    }
}

impl Hysteresis {
    /// Band width for the given operand magnitudes.
    pub fn band(&self, lhs: Real, rhs: Real) -> Real {
        (self.rel * lhs.abs().max(rhs.abs())).max(self.abs)
    }
}

/// Mutable run state threaded through every evaluation callback.
pub struct Context {
    pub time: Real,
    pub vars: VariableStore,
    /// External resources, constructed at initialization, dropped with the
    /// context.
    pub tables: Vec<TimeTable>,
    /// Current relation booleans, as used by equations.
    pub relations: Vec<bool>,
    /// Relation booleans as of the last committed event boundary.
    pub relations_pre: Vec<bool>,
    /// Hysteresis memory: relation state last confirmed by the root finder.
    pub stored_relations: Vec<bool>,
    /// Per-assertion "already warned" latches, reset at run start.
    pub assert_warned: Vec<bool>,
    /// Escalate warning-level assertion violations to fatal errors.
    pub strict_asserts: bool,
    pub hysteresis: Hysteresis,
}

impl Context {
    /// Fresh context for a model, with start values applied.
    pub fn new(model: &Model) -> Self {
        let mut vars = VariableStore::new(&model.dims());
        model.apply_start_values(&mut vars);
        vars.commit_pre();
        let n_rel = model.relations.len();
        Self {
            time: 0.0,
            vars,
            tables: Vec::new(),
            relations: vec![false; n_rel],
            relations_pre: vec![false; n_rel],
            stored_relations: vec![false; n_rel],
            assert_warned: vec![false; model.assertions.len()],
            strict_asserts: false,
            hysteresis: Hysteresis::default(),
        }
    }

    /// Current boolean value of relation `i`.
    pub fn relation(&self, i: usize) -> bool {
        self.relations[i]
    }

    /// Relation value as of the last committed event boundary.
    pub fn pre_relation(&self, i: usize) -> bool {
        self.relations_pre[i]
    }

    pub fn table(&self, i: usize) -> &TimeTable {
        &self.tables[i]
    }

    /// Capture current variables and relations as the new pre-values.
    pub fn commit_pre(&mut self) {
        self.vars.commit_pre();
        self.relations_pre.copy_from_slice(&self.relations);
    }

    /// Clear cross-run state before a run: warning latches, relation
    /// memories, and previously constructed resources.
    pub fn reset_run_state(&mut self) {
        self.assert_warned.fill(false);
        self.relations.fill(false);
        self.relations_pre.fill(false);
        self.stored_relations.fill(false);
        self.tables.clear();
    }
}
