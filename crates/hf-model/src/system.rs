//! Torn linear subsystems.

use crate::context::Context;
use crate::error::ModelResult;
use crate::jacobian::JacobianMeta;
use hf_core::{EqId, Real};

/// Residual callback of a torn system.
///
/// The callback writes the candidate `x` into the store's unknown slots,
/// re-runs the local constraint equations that only exist to express the
/// residual, and fills `res` with R(x).
pub type ResidualFn = Box<dyn Fn(&mut Context, &[Real], &mut [Real]) -> ModelResult<()> + Send + Sync>;

/// A torn linear subsystem: N unknown reals solved simultaneously so the
/// remaining equations can proceed by substitution.
pub struct LinearSystem {
    pub id: EqId,
    /// Real-variable indices of the torn unknowns.
    pub unknowns: Vec<usize>,
    /// Per-unknown (min, max) bounds; filled from variable attributes at
    /// model build when left empty.
    pub bounds: Vec<(Real, Real)>,
    /// Per-unknown nominal magnitudes; filled from variable attributes at
    /// model build when left empty.
    pub nominal: Vec<Real>,
    pub residual: ResidualFn,
    pub jacobian: Option<JacobianMeta>,
}

impl LinearSystem {
    pub fn new(
        id: u32,
        unknowns: Vec<usize>,
        residual: impl Fn(&mut Context, &[Real], &mut [Real]) -> ModelResult<()>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: EqId::from_index(id),
            unknowns,
            bounds: Vec::new(),
            nominal: Vec::new(),
            residual: Box::new(residual),
            jacobian: None,
        }
    }

    pub fn with_jacobian(mut self, jacobian: JacobianMeta) -> Self {
        self.jacobian = Some(jacobian);
        self
    }

    pub fn dim(&self) -> usize {
        self.unknowns.len()
    }
}
