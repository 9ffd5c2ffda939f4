//! Flat variable storage with pre-event shadow copies.
//!
//! Real variables are laid out as `[states | derivatives | algebraic]`, the
//! derivative of state `i` living at `n_states + i`. Discrete and state
//! variables carry a "pre" shadow captured by [`VariableStore::commit_pre`];
//! the evaluator only commits at discrete event boundaries, never during a
//! continuous step.

use crate::model::ModelDims;
use hf_core::Real;

#[derive(Clone, Debug)]
pub struct VariableStore {
    reals: Vec<Real>,
    bools: Vec<bool>,
    ints: Vec<i64>,
    reals_pre: Vec<Real>,
    bools_pre: Vec<bool>,
    ints_pre: Vec<i64>,
    real_params: Vec<Real>,
    bool_params: Vec<bool>,
    int_params: Vec<i64>,
    string_params: Vec<String>,
    n_states: usize,
}

impl VariableStore {
    /// Zero-initialized store sized for the given model dimensions.
    pub fn new(dims: &ModelDims) -> Self {
        Self {
            reals: vec![0.0; dims.n_reals],
            bools: vec![false; dims.n_bools],
            ints: vec![0; dims.n_ints],
            reals_pre: vec![0.0; dims.n_reals],
            bools_pre: vec![false; dims.n_bools],
            ints_pre: vec![0; dims.n_ints],
            real_params: vec![0.0; dims.n_real_params],
            bool_params: vec![false; dims.n_bool_params],
            int_params: vec![0; dims.n_int_params],
            string_params: vec![String::new(); dims.n_string_params],
            n_states: dims.n_states,
        }
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    // --- current values ---

    pub fn real(&self, i: usize) -> Real {
        self.reals[i]
    }

    pub fn set_real(&mut self, i: usize, v: Real) {
        self.reals[i] = v;
    }

    pub fn boolean(&self, i: usize) -> bool {
        self.bools[i]
    }

    pub fn set_boolean(&mut self, i: usize, v: bool) {
        self.bools[i] = v;
    }

    pub fn integer(&self, i: usize) -> i64 {
        self.ints[i]
    }

    pub fn set_integer(&mut self, i: usize, v: i64) {
        self.ints[i] = v;
    }

    // --- states and derivatives ---

    pub fn state(&self, i: usize) -> Real {
        debug_assert!(i < self.n_states);
        self.reals[i]
    }

    pub fn set_state(&mut self, i: usize, v: Real) {
        debug_assert!(i < self.n_states);
        self.reals[i] = v;
    }

    pub fn der(&self, i: usize) -> Real {
        debug_assert!(i < self.n_states);
        self.reals[self.n_states + i]
    }

    pub fn set_der(&mut self, i: usize, v: Real) {
        debug_assert!(i < self.n_states);
        self.reals[self.n_states + i] = v;
    }

    pub fn states(&self) -> &[Real] {
        &self.reals[..self.n_states]
    }

    pub fn set_states(&mut self, xs: &[Real]) {
        debug_assert_eq!(xs.len(), self.n_states);
        self.reals[..self.n_states].copy_from_slice(xs);
    }

    pub fn ders(&self) -> &[Real] {
        &self.reals[self.n_states..2 * self.n_states]
    }

    // --- pre-event shadows ---

    pub fn pre_real(&self, i: usize) -> Real {
        self.reals_pre[i]
    }

    pub fn pre_boolean(&self, i: usize) -> bool {
        self.bools_pre[i]
    }

    pub fn pre_integer(&self, i: usize) -> i64 {
        self.ints_pre[i]
    }

    /// Capture the current values as the new pre-values.
    ///
    /// Called at discrete event boundaries only.
    pub fn commit_pre(&mut self) {
        self.reals_pre.copy_from_slice(&self.reals);
        self.bools_pre.copy_from_slice(&self.bools);
        self.ints_pre.copy_from_slice(&self.ints);
    }

    // --- parameters ---

    pub fn real_param(&self, i: usize) -> Real {
        self.real_params[i]
    }

    pub fn set_real_param(&mut self, i: usize, v: Real) {
        self.real_params[i] = v;
    }

    pub fn boolean_param(&self, i: usize) -> bool {
        self.bool_params[i]
    }

    pub fn set_boolean_param(&mut self, i: usize, v: bool) {
        self.bool_params[i] = v;
    }

    pub fn integer_param(&self, i: usize) -> i64 {
        self.int_params[i]
    }

    pub fn set_integer_param(&mut self, i: usize, v: i64) {
        self.int_params[i] = v;
    }

    pub fn string_param(&self, i: usize) -> &str {
        &self.string_params[i]
    }

    pub fn set_string_param(&mut self, i: usize, v: String) {
        self.string_params[i] = v;
    }

    // --- snapshots for result recording ---

    pub fn reals(&self) -> &[Real] {
        &self.reals
    }

    pub fn booleans(&self) -> &[bool] {
        &self.bools
    }

    pub fn integers(&self) -> &[i64] {
        &self.ints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> ModelDims {
        ModelDims {
            n_states: 2,
            n_reals: 6,
            n_bools: 1,
            n_ints: 1,
            n_real_params: 1,
            n_bool_params: 0,
            n_int_params: 0,
            n_string_params: 0,
        }
    }

    #[test]
    fn state_and_der_layout() {
        let mut store = VariableStore::new(&dims());
        store.set_state(1, 3.0);
        store.set_der(1, -1.0);
        assert_eq!(store.real(1), 3.0);
        assert_eq!(store.real(3), -1.0);
        assert_eq!(store.states(), &[0.0, 3.0]);
        assert_eq!(store.ders(), &[0.0, -1.0]);
    }

    #[test]
    fn pre_values_only_change_on_commit() {
        let mut store = VariableStore::new(&dims());
        store.set_boolean(0, true);
        store.set_real(4, 2.5);
        assert!(!store.pre_boolean(0));
        assert_eq!(store.pre_real(4), 0.0);

        store.commit_pre();
        assert!(store.pre_boolean(0));
        assert_eq!(store.pre_real(4), 2.5);

        store.set_boolean(0, false);
        assert!(store.pre_boolean(0));
    }
}
