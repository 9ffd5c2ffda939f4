//! Assertion records.
//!
//! Assertions encode range/domain constraints checked every evaluation pass.
//! A violated `Warning` assertion is logged once per run (the latch lives in
//! the context, reset at run start) unless the run escalates warnings; a
//! violated `Error` assertion always aborts.

use crate::context::Context;
use hf_core::EqId;

pub type CheckFn = Box<dyn Fn(&Context) -> bool + Send + Sync>;
pub type MessageFn = Box<dyn Fn(&Context) -> String + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssertLevel {
    /// Soft engineering limit; the model is presumed numerically valid
    /// outside its declared comfort zone.
    Warning,
    /// Hard invariant.
    Error,
}

pub struct Assertion {
    pub id: EqId,
    pub level: AssertLevel,
    /// Returns true while the constraint holds.
    pub check: CheckFn,
    pub message: MessageFn,
}

impl Assertion {
    pub fn new(
        id: u32,
        level: AssertLevel,
        check: impl Fn(&Context) -> bool + Send + Sync + 'static,
        message: impl Fn(&Context) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: EqId::from_index(id),
            level,
            check: Box::new(check),
            message: Box::new(message),
        }
    }
}
