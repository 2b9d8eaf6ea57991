//! Steady-state monitor.
//!
//! Two criteria compare the live state with the old-state snapshot:
//!
//! 1. `max |u_c - u_c,old| < tol * dt` for all three components;
//! 2. `||u_c - u_c,old||_1 / ||u_c,old||_1 < tol` for all three
//!    components, with the ratio taken as 0 when the old norm is below
//!    [`L1_FLOOR`].
//!
//! Either criterion suffices. The pressure ratio is computed and
//! reported but does not take part in the decision. The first
//! iteration is never converged, so a zero initial field cannot pass
//! trivially.

use incflow_core::IterationCount;
use incflow_field::MultiField;
use incflow_grid::Communicator;

use crate::error::StepError;

/// Old-state L1 norms below this value give a relative change of 0.
pub const L1_FLOOR: f64 = 1.0e-8;

/// Globally reduced difference norms between live and old state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SteadyNorms {
    /// `max |u_c - u_c,old|` per component.
    pub du_max: [f64; 3],
    /// `||u_c - u_c,old||_1` per component.
    pub du_l1: [f64; 3],
    /// `||u_c,old||_1` per component.
    pub u_old_l1: [f64; 3],
    /// `max |p - p_old|`.
    pub dp_max: f64,
    /// `||p - p_old||_1`.
    pub dp_l1: f64,
    /// `||p_old||_1`.
    pub p_old_l1: f64,
}

/// Everything the monitor derived from one check.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SteadyMetrics {
    /// `||du||_1 / ||u_old||_1` per component.
    pub relative_change: [f64; 3],
    /// `max |du| / dt` per component.
    pub rate: [f64; 3],
    /// Pressure relative change; reported only.
    pub pressure_relative_change: f64,
    /// `max |dp| / dt`; reported only.
    pub pressure_rate: f64,
    /// Criterion 1 held.
    pub absolute_rate_met: bool,
    /// Criterion 2 held.
    pub relative_change_met: bool,
}

/// `diff / old`, or exactly 0 when `old` is below [`L1_FLOOR`].
pub fn relative_change(diff_l1: f64, old_l1: f64) -> f64 {
    if old_l1 < L1_FLOOR {
        0.0
    } else {
        diff_l1 / old_l1
    }
}

/// Apply both criteria to reduced norms.
pub fn evaluate(norms: &SteadyNorms, dt: f64, tol: f64) -> SteadyMetrics {
    let rel: [f64; 3] =
        std::array::from_fn(|c| relative_change(norms.du_l1[c], norms.u_old_l1[c]));
    SteadyMetrics {
        relative_change: rel,
        rate: norms.du_max.map(|d| d / dt),
        pressure_relative_change: relative_change(norms.dp_l1, norms.p_old_l1),
        pressure_rate: norms.dp_max / dt,
        absolute_rate_met: norms.du_max.iter().all(|&d| d < tol * dt),
        relative_change_met: rel.iter().all(|&r| r < tol),
    }
}

/// Result of one steady-state check.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SteadyCheck {
    /// Whether the outer loop may stop.
    pub converged: bool,
    /// Criteria and reported ratios.
    pub metrics: SteadyMetrics,
}

/// Decide convergence from the metrics and the iteration number.
pub fn decide(metrics: SteadyMetrics, iteration: IterationCount) -> SteadyCheck {
    let converged = !iteration.is_first()
        && (metrics.absolute_rate_met || metrics.relative_change_met);
    SteadyCheck { converged, metrics }
}

/// Compares live and old fields against a tolerance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SteadyStateMonitor {
    tol: f64,
}

impl SteadyStateMonitor {
    /// Monitor with tolerance `tol`.
    pub fn new(tol: f64) -> Self {
        Self { tol }
    }

    /// The tolerance.
    pub fn tol(&self) -> f64 {
        self.tol
    }

    /// Reduce the difference norms over all workers. Collective.
    pub fn norms(
        vel: &MultiField,
        vel_old: &MultiField,
        p: &MultiField,
        p_old: &MultiField,
        comm: &dyn Communicator,
    ) -> Result<SteadyNorms, StepError> {
        let mut n = SteadyNorms::default();
        for c in 0..3 {
            n.du_max[c] = comm.all_reduce_max(vel.max_abs_diff(vel_old, c)?)?;
            n.du_l1[c] = comm.all_reduce_sum(vel.abs_diff_sum(vel_old, c)?)?;
            n.u_old_l1[c] = comm.all_reduce_sum(vel_old.local_norm1(c)?)?;
        }
        n.dp_max = comm.all_reduce_max(p.max_abs_diff(p_old, 0)?)?;
        n.dp_l1 = comm.all_reduce_sum(p.abs_diff_sum(p_old, 0)?)?;
        n.p_old_l1 = comm.all_reduce_sum(p_old.local_norm1(0)?)?;
        Ok(n)
    }

    /// Full check: reduce, evaluate, decide.
    #[allow(clippy::too_many_arguments)]
    pub fn is_converged(
        &self,
        vel: &MultiField,
        vel_old: &MultiField,
        p: &MultiField,
        p_old: &MultiField,
        dt: f64,
        iteration: IterationCount,
        comm: &dyn Communicator,
    ) -> Result<SteadyCheck, StepError> {
        let norms = Self::norms(vel, vel_old, p, p_old, comm)?;
        Ok(decide(evaluate(&norms, dt, self.tol), iteration))
    }
}
