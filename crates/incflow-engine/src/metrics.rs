//! Per-advance timing and solver metrics.
//!
//! [`AdvanceMetrics`] is filled by [`Advancer::advance`](crate::Advancer::advance)
//! and returned inside its outcome.

use crate::steady::SteadyMetrics;

/// Timing and solver data collected during one advance.
///
/// Durations are wall-clock microseconds summed over every outer-loop
/// iteration of the advance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdvanceMetrics {
    /// Wall-clock time for the whole advance.
    pub total_us: u64,
    /// Time spent in the step-size controller.
    pub step_size_us: u64,
    /// Time spent in predictor sub-steps.
    pub predictor_us: u64,
    /// Time spent in corrector sub-steps.
    pub corrector_us: u64,
    /// Time spent in steady-state checks.
    pub steady_check_us: u64,
    /// Outer-loop iterations run.
    pub iterations: u64,
    /// Projection solver iterations, summed.
    pub projection_iterations: u64,
    /// Implicit diffusion solver iterations, summed.
    pub diffusion_iterations: u64,
    /// Iterations whose fixed step exceeded the stability bound.
    pub cfl_violations: u64,
    /// Metrics of the last steady-state check, if one ran.
    pub last_steady: Option<SteadyMetrics>,
}

impl AdvanceMetrics {
    pub(crate) fn record_solves(&mut self, report: &crate::integrator::SubStepReport) {
        self.projection_iterations += report.projection.iterations as u64;
        if let Some(d) = report.diffusion {
            self.diffusion_iterations += d.iterations as u64;
        }
    }
}
