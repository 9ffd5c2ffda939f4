//! Relations and zero-crossing expressions.
//!
//! A relation is a single comparison over the store, evaluated with
//! hysteresis against its stored sign by the event manager. A zero-crossing
//! combines one or more relations into the ±1 indicator consumed by the
//! root finder; the supported forms are exactly those a causalizing
//! compiler emits for condition expressions: a bare relation, a
//! disjunction, or a conjunction.

use crate::context::Context;
use hf_core::{Real, RelId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RelOp {
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

/// Operand of a relation, computed from the current store.
pub type OperandFn = Box<dyn Fn(&Context) -> Real + Send + Sync>;

pub struct Relation {
    pub id: RelId,
    pub op: RelOp,
    pub lhs: OperandFn,
    pub rhs: OperandFn,
    /// Human-readable condition text for diagnostics.
    pub desc: String,
}

/// Boolean expression over relation indices.
#[derive(Clone, Debug)]
pub enum ZcExpr {
    Rel(usize),
    AnyOf(Vec<usize>),
    AllOf(Vec<usize>),
}

impl ZcExpr {
    /// Relation indices referenced by this expression.
    pub fn relations(&self) -> &[usize] {
        match self {
            ZcExpr::Rel(r) => core::slice::from_ref(r),
            ZcExpr::AnyOf(rs) | ZcExpr::AllOf(rs) => rs,
        }
    }

    /// Evaluate over a slice of relation booleans.
    pub fn eval(&self, relations: &[bool]) -> bool {
        match self {
            ZcExpr::Rel(r) => relations[*r],
            ZcExpr::AnyOf(rs) => rs.iter().any(|&r| relations[r]),
            ZcExpr::AllOf(rs) => rs.iter().all(|&r| relations[r]),
        }
    }
}

pub struct ZeroCrossing {
    pub expr: ZcExpr,
    /// Human-readable condition text for diagnostics.
    pub desc: String,
}
