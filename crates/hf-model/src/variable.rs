//! Variable metadata: kinds, roles, and real-variable attributes.

use hf_core::Real;

/// Value kind of a model variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VarKind {
    Real,
    Boolean,
    Integer,
    String,
}

/// Role of a variable within the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VarRole {
    /// Continuous state advanced by the integrator.
    State,
    /// Computed each continuous pass.
    Algebraic,
    /// Changes only at event boundaries; carries a pre-value.
    Discrete,
    /// Fixed for the run (possibly derived once at initialization).
    Parameter,
}

/// Attributes of a real variable.
///
/// `nominal`, `min` and `max` seed and bound torn unknowns when the variable
/// is solved by a linear subsystem.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RealAttributes {
    pub start: Real,
    pub nominal: Real,
    pub min: Real,
    pub max: Real,
}

impl Default for RealAttributes {
    fn default() -> Self {
        Self {
            start: 0.0,
            nominal: 1.0,
            min: Real::NEG_INFINITY,
            max: Real::INFINITY,
        }
    }
}

impl RealAttributes {
    /// Attributes with a start value and defaults elsewhere.
    pub fn with_start(start: Real) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }
}

/// A declared real variable.
#[derive(Debug)]
pub struct RealVar {
    pub name: String,
    pub role: VarRole,
    pub attr: RealAttributes,
}

/// A declared boolean variable.
#[derive(Debug)]
pub struct BoolVar {
    pub name: String,
    pub role: VarRole,
    pub start: bool,
}

/// A declared integer variable.
#[derive(Debug)]
pub struct IntVar {
    pub name: String,
    pub role: VarRole,
    pub start: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_attributes_are_unbounded() {
        let attr = RealAttributes::default();
        assert_eq!(attr.start, 0.0);
        assert_eq!(attr.nominal, 1.0);
        assert!(attr.min.is_infinite() && attr.min < 0.0);
        assert!(attr.max.is_infinite() && attr.max > 0.0);
    }
}
