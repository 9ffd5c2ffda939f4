//! hf-model: model description data for the hybridflow engine.
//!
//! A hybrid DAE model is data, not code: ordered lists of equation records
//! (plain assignments, torn linear subsystems, edge-triggered when-clauses),
//! hysteresis relations and the zero-crossing expressions built from them,
//! assertion records, external time-table resources, and the flat variable
//! store the equations read and write. The engine in `hf-sim` iterates these
//! lists; nothing here calls back into a specific model.

pub mod assertion;
pub mod context;
pub mod equation;
pub mod error;
pub mod jacobian;
pub mod model;
pub mod relation;
pub mod store;
pub mod system;
pub mod table;
pub mod variable;

pub use assertion::{AssertLevel, Assertion};
pub use context::{Context, Hysteresis};
pub use equation::{EqKind, Equation, EvalFn, WhenClause};
pub use error::{ModelError, ModelResult};
pub use jacobian::{ColumnFn, JacobianBuffers, JacobianMeta, SparsityPattern};
pub use model::{Model, ModelBuilder, ModelDims, TableBinding};
pub use relation::{RelOp, Relation, ZcExpr, ZeroCrossing};
pub use store::VariableStore;
pub use system::{LinearSystem, ResidualFn};
pub use table::{Extrapolation, Smoothness, TableConfig, TimeEvents, TimeTable};
pub use variable::{BoolVar, IntVar, RealAttributes, RealVar, VarKind, VarRole};
