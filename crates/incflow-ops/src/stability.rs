//! Step-size stability contract.

/// Global maxima gathered before choosing a step size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FieldExtrema {
    /// Max `|u|`, `|v|`, `|w|`.
    pub vel: [f64; 3],
    /// Max density.
    pub ro: f64,
    /// Max viscosity.
    pub mu: f64,
    /// Max `|gp0|` per component.
    pub gp0: [f64; 3],
}

/// Everything a stability bound may depend on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StabilityInputs {
    /// Global field maxima.
    pub extrema: FieldExtrema,
    /// Cell size per axis.
    pub cell_size: [f64; 3],
    /// Safety factor.
    pub cfl: f64,
    /// Whether the viscous term is fully explicit.
    pub explicit_diffusion: bool,
    /// Steady-state mode disables the stop-time clamp.
    pub steady_state: bool,
    /// Current time.
    pub time: f64,
    /// Requested stop time; `<= 0` means none.
    pub stop_time: f64,
}

/// Numerical stability function mapping field maxima to a stable step.
pub trait StabilityBound: Send {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Largest stable step size for the given inputs.
    fn max_stable_dt(&self, inputs: &StabilityInputs) -> f64;
}
