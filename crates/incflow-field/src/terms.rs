//! Explicit convective and diffusive term temporaries.

use crate::multi_field::MultiField;

/// A `(conv, divtau)` pair shaped like the velocity field.
///
/// Allocated per outer-loop iteration and dropped at its end.
#[derive(Clone, Debug)]
pub struct ExplicitTerms {
    /// Convective term.
    pub conv: MultiField,
    /// Diffusive (viscous stress divergence) term.
    pub divtau: MultiField,
}

impl ExplicitTerms {
    /// Zeroed terms shaped like `vel`, named with `suffix`.
    pub fn like(vel: &MultiField, suffix: &str) -> Self {
        Self {
            conv: vel.like(format!("conv{suffix}")),
            divtau: vel.like(format!("divtau{suffix}")),
        }
    }
}
