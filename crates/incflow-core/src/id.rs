//! Strongly-typed identifiers for components, iterations, and steps.

use std::fmt;

/// One Cartesian component of a vector field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    /// The x component (`u`).
    X,
    /// The y component (`v`).
    Y,
    /// The z component (`w`).
    Z,
}

impl Component {
    /// All three components in storage order.
    pub const ALL: [Component; 3] = [Component::X, Component::Y, Component::Z];

    /// Storage index of this component in a 3-component field.
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    /// Conventional velocity symbol for this component.
    pub fn velocity_label(self) -> &'static str {
        match self {
            Self::X => "u",
            Self::Y => "v",
            Self::Z => "w",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.velocity_label())
    }
}

/// Outer-loop iteration counter.
///
/// Starts at 1 and increments monotonically within one call to the
/// advancer. In non-steady mode it never leaves 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IterationCount(pub u64);

impl IterationCount {
    /// The first iteration of an advance.
    pub const FIRST: IterationCount = IterationCount(1);

    /// Returns `true` on the first iteration.
    pub fn is_first(self) -> bool {
        self.0 == 1
    }

    /// The iteration after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for IterationCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of an externally driven time step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepIndex(pub u64);

impl fmt::Display for StepIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepIndex {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Which half of the predictor-corrector pair is executing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubStep {
    /// First pass: explicit terms from the old-time velocity.
    Predictor,
    /// Second pass: trapezoidal blend of old and predicted terms.
    Corrector,
}

impl fmt::Display for SubStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Predictor => f.write_str("predictor"),
            Self::Corrector => f.write_str("corrector"),
        }
    }
}
