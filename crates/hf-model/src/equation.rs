//! Equation records: the ordered evaluation lists are built from these.

use crate::context::Context;
use crate::error::ModelResult;
use crate::system::LinearSystem;
use hf_core::EqId;

/// Evaluation callback for an equation or when-clause effect.
pub type EvalFn = Box<dyn Fn(&mut Context) -> ModelResult<()> + Send + Sync>;

/// One entry in an ordered evaluation list.
///
/// The order of a list is fixed by the model author (or generator); the
/// evaluator never reorders at runtime.
pub struct Equation {
    pub id: EqId,
    pub kind: EqKind,
}

pub enum EqKind {
    /// Explicit assignment(s), inputs already up to date by construction.
    Assign(EvalFn),
    /// Torn linear subsystem solved in place before dependents proceed.
    Linear(LinearSystem),
    /// Edge-triggered discrete update; only fires during discrete passes.
    When(WhenClause),
}

/// Discrete update gated on the rising edge of a boolean condition variable.
pub struct WhenClause {
    /// Index of the governing boolean variable.
    pub condition: usize,
    pub effect: EvalFn,
}

impl Equation {
    pub fn assign(
        id: u32,
        f: impl Fn(&mut Context) -> ModelResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: EqId::from_index(id),
            kind: EqKind::Assign(Box::new(f)),
        }
    }

    pub fn linear(system: LinearSystem) -> Self {
        Self {
            id: system.id,
            kind: EqKind::Linear(system),
        }
    }

    pub fn when(
        id: u32,
        condition: usize,
        effect: impl Fn(&mut Context) -> ModelResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: EqId::from_index(id),
            kind: EqKind::When(WhenClause {
                condition,
                effect: Box::new(effect),
            }),
        }
    }
}
