//! Model container and checked builder.
//!
//! A `Model` is the complete description the engine executes: variable
//! metadata, parameter values, the ordered equation lists, relations and
//! zero-crossings, assertions, and table bindings. `ModelBuilder` assigns
//! indices in declaration order and validates cross-references at build so
//! both hand-written and generated models fail fast.

use crate::assertion::Assertion;
use crate::context::Context;
use crate::equation::{EqKind, Equation};
use crate::error::{ModelError, ModelResult};
use crate::relation::{RelOp, Relation, ZcExpr, ZeroCrossing};
use crate::store::VariableStore;
use crate::system::LinearSystem;
use crate::table::TimeTable;
use crate::variable::{BoolVar, IntVar, RealAttributes, RealVar, VarKind, VarRole};
use hf_core::{EqId, Real, RelId};
use std::collections::HashSet;

/// Sizes of the flat variable arrays.
#[derive(Clone, Copy, Debug, Default)]
pub struct ModelDims {
    pub n_states: usize,
    pub n_reals: usize,
    pub n_bools: usize,
    pub n_ints: usize,
    pub n_real_params: usize,
    pub n_bool_params: usize,
    pub n_int_params: usize,
    pub n_string_params: usize,
}

#[derive(Debug)]
pub struct RealParam {
    pub name: String,
    pub value: Real,
}

#[derive(Debug)]
pub struct BoolParam {
    pub name: String,
    pub value: bool,
}

#[derive(Debug)]
pub struct IntParam {
    pub name: String,
    pub value: i64,
}

#[derive(Debug)]
pub struct StringParam {
    pub name: String,
    pub value: String,
}

/// Deferred construction of an external table resource.
///
/// The build callback runs once at initialization, after derived parameters
/// are bound, so table configuration can read computed parameter values
/// (the same ordering a generated bound-parameter section has).
pub struct TableBinding {
    pub id: EqId,
    pub build: Box<dyn Fn(&Context) -> ModelResult<TimeTable> + Send + Sync>,
}

pub struct Model {
    pub name: String,
    /// Laid out `[states | derivatives | algebraic/discrete]`.
    pub real_vars: Vec<RealVar>,
    pub n_states: usize,
    pub bool_vars: Vec<BoolVar>,
    pub int_vars: Vec<IntVar>,
    pub real_params: Vec<RealParam>,
    pub bool_params: Vec<BoolParam>,
    pub int_params: Vec<IntParam>,
    pub string_params: Vec<StringParam>,
    /// Derived-parameter equations, run once before anything else.
    pub bind_parameters: Vec<Equation>,
    /// Initial equations, run once after parameter binding.
    pub initial: Vec<Equation>,
    /// The main ordered evaluation list.
    pub equations: Vec<Equation>,
    pub relations: Vec<Relation>,
    pub zero_crossings: Vec<ZeroCrossing>,
    pub assertions: Vec<Assertion>,
    pub tables: Vec<TableBinding>,
}

impl Model {
    pub fn dims(&self) -> ModelDims {
        ModelDims {
            n_states: self.n_states,
            n_reals: self.real_vars.len(),
            n_bools: self.bool_vars.len(),
            n_ints: self.int_vars.len(),
            n_real_params: self.real_params.len(),
            n_bool_params: self.bool_params.len(),
            n_int_params: self.int_params.len(),
            n_string_params: self.string_params.len(),
        }
    }

    /// Indices of discrete real variables, used for event fixed-point
    /// change detection.
    pub fn discrete_real_indices(&self) -> Vec<usize> {
        self.real_vars
            .iter()
            .enumerate()
            .filter(|(_, v)| v.role == VarRole::Discrete)
            .map(|(i, _)| i)
            .collect()
    }

    /// Write declared start values and parameter values into a store.
    pub fn apply_start_values(&self, store: &mut VariableStore) {
        for (i, v) in self.real_vars.iter().enumerate() {
            store.set_real(i, v.attr.start);
        }
        for (i, v) in self.bool_vars.iter().enumerate() {
            store.set_boolean(i, v.start);
        }
        for (i, v) in self.int_vars.iter().enumerate() {
            store.set_integer(i, v.start);
        }
        for (i, p) in self.real_params.iter().enumerate() {
            store.set_real_param(i, p.value);
        }
        for (i, p) in self.bool_params.iter().enumerate() {
            store.set_boolean_param(i, p.value);
        }
        for (i, p) in self.int_params.iter().enumerate() {
            store.set_integer_param(i, p.value);
        }
        for (i, p) in self.string_params.iter().enumerate() {
            store.set_string_param(i, p.value.clone());
        }
    }

    /// Look a variable or parameter up by name.
    pub fn find_variable(&self, name: &str) -> Option<(VarKind, VarRole, usize)> {
        if let Some(i) = self.real_vars.iter().position(|v| v.name == name) {
            return Some((VarKind::Real, self.real_vars[i].role, i));
        }
        if let Some(i) = self.bool_vars.iter().position(|v| v.name == name) {
            return Some((VarKind::Boolean, self.bool_vars[i].role, i));
        }
        if let Some(i) = self.int_vars.iter().position(|v| v.name == name) {
            return Some((VarKind::Integer, self.int_vars[i].role, i));
        }
        if let Some(i) = self.real_params.iter().position(|p| p.name == name) {
            return Some((VarKind::Real, VarRole::Parameter, i));
        }
        if let Some(i) = self.bool_params.iter().position(|p| p.name == name) {
            return Some((VarKind::Boolean, VarRole::Parameter, i));
        }
        if let Some(i) = self.int_params.iter().position(|p| p.name == name) {
            return Some((VarKind::Integer, VarRole::Parameter, i));
        }
        if let Some(i) = self.string_params.iter().position(|p| p.name == name) {
            return Some((VarKind::String, VarRole::Parameter, i));
        }
        None
    }

    /// Structural consistency checks.
    pub fn validate(&self) -> ModelResult<()> {
        let invalid = |what: String| Err(ModelError::Invalid { what });

        if self.real_vars.len() < 2 * self.n_states {
            return invalid(format!(
                "{} real variables cannot hold {} states plus derivatives",
                self.real_vars.len(),
                self.n_states
            ));
        }
        for (i, v) in self.real_vars.iter().take(self.n_states).enumerate() {
            if v.role != VarRole::State {
                return invalid(format!("real variable {i} ('{}') must be a state", v.name));
            }
        }

        let mut ids = HashSet::new();
        for eq in self.bind_parameters.iter().chain(&self.initial) {
            if let EqKind::When(_) = eq.kind {
                return invalid(format!(
                    "when-clause {} not allowed outside the main equation list",
                    eq.id
                ));
            }
        }
        for eq in self
            .bind_parameters
            .iter()
            .chain(&self.initial)
            .chain(&self.equations)
        {
            if !ids.insert(eq.id) {
                return invalid(format!("duplicate equation id {}", eq.id));
            }
            match &eq.kind {
                EqKind::When(w) => {
                    if w.condition >= self.bool_vars.len() {
                        return invalid(format!(
                            "when-clause {} condition index {} out of range",
                            eq.id, w.condition
                        ));
                    }
                }
                EqKind::Linear(sys) => self.validate_linear(sys)?,
                EqKind::Assign(_) => {}
            }
        }

        for (i, zc) in self.zero_crossings.iter().enumerate() {
            for &r in zc.expr.relations() {
                if r >= self.relations.len() {
                    return invalid(format!(
                        "zero-crossing {i} ('{}') references relation {r} of {}",
                        zc.desc,
                        self.relations.len()
                    ));
                }
            }
        }
        Ok(())
    }

    fn validate_linear(&self, sys: &LinearSystem) -> ModelResult<()> {
        let invalid = |what: String| Err(ModelError::Invalid { what });
        let n = sys.dim();
        if n == 0 {
            return invalid(format!("linear system {} has no unknowns", sys.id));
        }
        for &u in &sys.unknowns {
            if u >= self.real_vars.len() {
                return invalid(format!(
                    "linear system {} unknown index {u} out of range",
                    sys.id
                ));
            }
        }
        if sys.bounds.len() != n || sys.nominal.len() != n {
            return invalid(format!(
                "linear system {} attribute vectors not sized to {n} unknowns",
                sys.id
            ));
        }
        if let Some(jac) = &sys.jacobian {
            if jac.rows != n || jac.cols != n {
                return invalid(format!(
                    "linear system {} jacobian is {}x{}, system is {n}x{n}",
                    sys.id, jac.rows, jac.cols
                ));
            }
            jac.validate()?;
        }
        Ok(())
    }
}

/// Checked incremental model construction.
///
/// Variables get their indices in declaration order; states must all be
/// declared before other real variables so derivative slots land at
/// `n_states + i`. Misuse is collected and reported by `build`.
pub struct ModelBuilder {
    name: String,
    states: Vec<RealVar>,
    algebraics: Vec<RealVar>,
    bool_vars: Vec<BoolVar>,
    int_vars: Vec<IntVar>,
    real_params: Vec<RealParam>,
    bool_params: Vec<BoolParam>,
    int_params: Vec<IntParam>,
    string_params: Vec<StringParam>,
    bind_parameters: Vec<Equation>,
    initial: Vec<Equation>,
    equations: Vec<Equation>,
    relations: Vec<Relation>,
    zero_crossings: Vec<ZeroCrossing>,
    assertions: Vec<Assertion>,
    tables: Vec<TableBinding>,
    defects: Vec<String>,
}

impl ModelBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            states: Vec::new(),
            algebraics: Vec::new(),
            bool_vars: Vec::new(),
            int_vars: Vec::new(),
            real_params: Vec::new(),
            bool_params: Vec::new(),
            int_params: Vec::new(),
            string_params: Vec::new(),
            bind_parameters: Vec::new(),
            initial: Vec::new(),
            equations: Vec::new(),
            relations: Vec::new(),
            zero_crossings: Vec::new(),
            assertions: Vec::new(),
            tables: Vec::new(),
            defects: Vec::new(),
        }
    }

    /// Declare a continuous state. Returns its state index, which is also
    /// its real-variable index.
    pub fn state(&mut self, name: &str, attr: RealAttributes) -> usize {
        if !self.algebraics.is_empty() {
            self.defects
                .push(format!("state '{name}' declared after non-state reals"));
        }
        self.states.push(RealVar {
            name: name.to_string(),
            role: VarRole::State,
            attr,
        });
        self.states.len() - 1
    }

    /// Real-variable index of a state's derivative.
    pub fn der_index(&self, state: usize) -> usize {
        self.states.len() + state
    }

    pub fn algebraic(&mut self, name: &str, attr: RealAttributes) -> usize {
        self.push_real(name, VarRole::Algebraic, attr)
    }

    pub fn discrete_real(&mut self, name: &str, attr: RealAttributes) -> usize {
        self.push_real(name, VarRole::Discrete, attr)
    }

    fn push_real(&mut self, name: &str, role: VarRole, attr: RealAttributes) -> usize {
        let index = 2 * self.states.len() + self.algebraics.len();
        self.algebraics.push(RealVar {
            name: name.to_string(),
            role,
            attr,
        });
        index
    }

    pub fn boolean(&mut self, name: &str, role: VarRole, start: bool) -> usize {
        self.bool_vars.push(BoolVar {
            name: name.to_string(),
            role,
            start,
        });
        self.bool_vars.len() - 1
    }

    pub fn integer(&mut self, name: &str, role: VarRole, start: i64) -> usize {
        self.int_vars.push(IntVar {
            name: name.to_string(),
            role,
            start,
        });
        self.int_vars.len() - 1
    }

    pub fn real_parameter(&mut self, name: &str, value: Real) -> usize {
        self.real_params.push(RealParam {
            name: name.to_string(),
            value,
        });
        self.real_params.len() - 1
    }

    pub fn boolean_parameter(&mut self, name: &str, value: bool) -> usize {
        self.bool_params.push(BoolParam {
            name: name.to_string(),
            value,
        });
        self.bool_params.len() - 1
    }

    pub fn integer_parameter(&mut self, name: &str, value: i64) -> usize {
        self.int_params.push(IntParam {
            name: name.to_string(),
            value,
        });
        self.int_params.len() - 1
    }

    pub fn string_parameter(&mut self, name: &str, value: &str) -> usize {
        self.string_params.push(StringParam {
            name: name.to_string(),
            value: value.to_string(),
        });
        self.string_params.len() - 1
    }

    /// Register a relation; returns its index for zero-crossing expressions
    /// and `Context::relation` lookups.
    pub fn relation(
        &mut self,
        op: RelOp,
        lhs: impl Fn(&Context) -> Real + Send + Sync + 'static,
        rhs: impl Fn(&Context) -> Real + Send + Sync + 'static,
        desc: &str,
    ) -> usize {
        self.relations.push(Relation {
            id: RelId::from_index(self.relations.len() as u32),
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            desc: desc.to_string(),
        });
        self.relations.len() - 1
    }

    pub fn zero_crossing(&mut self, expr: ZcExpr, desc: &str) -> usize {
        self.zero_crossings.push(ZeroCrossing {
            expr,
            desc: desc.to_string(),
        });
        self.zero_crossings.len() - 1
    }

    pub fn bind_parameter(
        &mut self,
        id: u32,
        f: impl Fn(&mut Context) -> ModelResult<()> + Send + Sync + 'static,
    ) -> &mut Self {
        self.bind_parameters.push(Equation::assign(id, f));
        self
    }

    pub fn initial_assign(
        &mut self,
        id: u32,
        f: impl Fn(&mut Context) -> ModelResult<()> + Send + Sync + 'static,
    ) -> &mut Self {
        self.initial.push(Equation::assign(id, f));
        self
    }

    pub fn assign(
        &mut self,
        id: u32,
        f: impl Fn(&mut Context) -> ModelResult<()> + Send + Sync + 'static,
    ) -> &mut Self {
        self.equations.push(Equation::assign(id, f));
        self
    }

    pub fn linear_system(&mut self, system: LinearSystem) -> &mut Self {
        self.equations.push(Equation::linear(system));
        self
    }

    pub fn initial_linear_system(&mut self, system: LinearSystem) -> &mut Self {
        self.initial.push(Equation::linear(system));
        self
    }

    pub fn when(
        &mut self,
        id: u32,
        condition: usize,
        effect: impl Fn(&mut Context) -> ModelResult<()> + Send + Sync + 'static,
    ) -> &mut Self {
        self.equations.push(Equation::when(id, condition, effect));
        self
    }

    pub fn assertion(&mut self, assertion: Assertion) -> &mut Self {
        self.assertions.push(assertion);
        self
    }

    /// Register a table binding; returns the table index used by
    /// `Context::table`.
    pub fn table(
        &mut self,
        id: u32,
        build: impl Fn(&Context) -> ModelResult<TimeTable> + Send + Sync + 'static,
    ) -> usize {
        self.tables.push(TableBinding {
            id: EqId::from_index(id),
            build: Box::new(build),
        });
        self.tables.len() - 1
    }

    pub fn build(self) -> ModelResult<Model> {
        if !self.defects.is_empty() {
            return Err(ModelError::Invalid {
                what: self.defects.join("; "),
            });
        }

        let n_states = self.states.len();
        let mut real_vars = self.states;
        let ders: Vec<RealVar> = real_vars
            .iter()
            .map(|s| RealVar {
                name: format!("der({})", s.name),
                role: VarRole::Algebraic,
                attr: RealAttributes::default(),
            })
            .collect();
        real_vars.extend(ders);
        real_vars.extend(self.algebraics);

        // fill linear-system bounds/nominal from variable attributes where
        // the author left them empty
        let mut equations = self.equations;
        let mut initial = self.initial;
        let mut bind_parameters = self.bind_parameters;
        for eq in equations
            .iter_mut()
            .chain(initial.iter_mut())
            .chain(bind_parameters.iter_mut())
        {
            if let EqKind::Linear(sys) = &mut eq.kind {
                if sys.bounds.is_empty() {
                    sys.bounds = sys
                        .unknowns
                        .iter()
                        .map(|&u| {
                            real_vars
                                .get(u)
                                .map(|v| (v.attr.min, v.attr.max))
                                .unwrap_or((Real::NEG_INFINITY, Real::INFINITY))
                        })
                        .collect();
                }
                if sys.nominal.is_empty() {
                    sys.nominal = sys
                        .unknowns
                        .iter()
                        .map(|&u| real_vars.get(u).map(|v| v.attr.nominal).unwrap_or(1.0))
                        .collect();
                }
            }
        }

        let model = Model {
            name: self.name,
            real_vars,
            n_states,
            bool_vars: self.bool_vars,
            int_vars: self.int_vars,
            real_params: self.real_params,
            bool_params: self.bool_params,
            int_params: self.int_params,
            string_params: self.string_params,
            bind_parameters,
            initial,
            equations,
            relations: self.relations,
            zero_crossings: self.zero_crossings,
            assertions: self.assertions,
            tables: self.tables,
        };
        model.validate()?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_assigns_layout_indices() {
        let mut mb = ModelBuilder::new("layout");
        let x = mb.state("x", RealAttributes::with_start(1.0));
        let y = mb.algebraic("y", RealAttributes::default());
        let q = mb.discrete_real("q", RealAttributes::default());
        assert_eq!(x, 0);
        assert_eq!(mb.der_index(x), 1);
        assert_eq!(y, 2);
        assert_eq!(q, 3);

        let model = mb.build().unwrap();
        assert_eq!(model.dims().n_reals, 4);
        assert_eq!(model.discrete_real_indices(), vec![3]);
        assert_eq!(
            model.find_variable("der(x)"),
            Some((VarKind::Real, VarRole::Algebraic, 1))
        );
    }

    #[test]
    fn build_rejects_state_after_algebraic() {
        let mut mb = ModelBuilder::new("bad");
        mb.algebraic("y", RealAttributes::default());
        mb.state("x", RealAttributes::default());
        assert!(mb.build().is_err());
    }

    #[test]
    fn build_rejects_dangling_when_condition() {
        let mut mb = ModelBuilder::new("bad");
        mb.when(1, 3, |_| Ok(()));
        assert!(mb.build().is_err());
    }

    #[test]
    fn build_rejects_duplicate_equation_ids() {
        let mut mb = ModelBuilder::new("bad");
        mb.assign(7, |_| Ok(()));
        mb.assign(7, |_| Ok(()));
        assert!(mb.build().is_err());
    }

    #[test]
    fn build_fills_linear_bounds_from_attributes() {
        let mut mb = ModelBuilder::new("bounds");
        let i = mb.algebraic(
            "i",
            RealAttributes {
                start: 0.0,
                nominal: 0.1,
                min: -5.0,
                max: 5.0,
            },
        );
        mb.linear_system(LinearSystem::new(1, vec![i], |_, _, _| Ok(())));
        let model = mb.build().unwrap();
        let EqKind::Linear(sys) = &model.equations[0].kind else {
            panic!("expected linear system");
        };
        assert_eq!(sys.bounds, vec![(-5.0, 5.0)]);
        assert_eq!(sys.nominal, vec![0.1]);
    }

    #[test]
    fn start_values_reach_the_store() {
        let mut mb = ModelBuilder::new("start");
        mb.state("x", RealAttributes::with_start(2.0));
        mb.boolean("q", VarRole::Discrete, true);
        mb.real_parameter("R", 10.0);
        let model = mb.build().unwrap();
        let mut store = VariableStore::new(&model.dims());
        model.apply_start_values(&mut store);
        assert_eq!(store.real(0), 2.0);
        assert!(store.boolean(0));
        assert_eq!(store.real_param(0), 10.0);
    }
}
