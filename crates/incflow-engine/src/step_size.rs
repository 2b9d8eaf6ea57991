//! Step-size controller.
//!
//! The stability bound is always evaluated, even when a fixed step is
//! configured, so that a fixed step exceeding it can be reported.

use incflow_field::{LevelFields, MultiField};
use incflow_grid::{Communicator, Geometry};
use incflow_ops::{FieldExtrema, StabilityBound, StabilityInputs};
use log::{debug, warn};

use crate::config::AdvanceConfig;
use crate::error::StepError;

/// Outcome of one step-size computation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DtDecision {
    /// Step size to use.
    pub dt: f64,
    /// Stability bound computed from the current fields.
    pub dt_cfl: f64,
    /// `true` if a fixed step larger than `dt_cfl` was adopted.
    pub cfl_violated: bool,
}

/// Pick the step from the stability bound and an optional fixed step.
///
/// A fixed step always wins; it is flagged when it exceeds the bound.
pub fn choose_dt(dt_cfl: f64, fixed_dt: Option<f64>) -> DtDecision {
    match fixed_dt {
        Some(fixed) => DtDecision {
            dt: fixed,
            dt_cfl,
            cfl_violated: dt_cfl < fixed,
        },
        None => DtDecision {
            dt: dt_cfl,
            dt_cfl,
            cfl_violated: false,
        },
    }
}

fn global_norm0(field: &MultiField, comp: usize, comm: &dyn Communicator) -> Result<f64, StepError> {
    Ok(comm.all_reduce_max(field.local_norm0(comp)?)?)
}

/// Global maxima of `|u|`, `|v|`, `|w|`, density, viscosity and the
/// base pressure gradient components. Collective.
pub fn gather_extrema(fields: &LevelFields, comm: &dyn Communicator) -> Result<FieldExtrema, StepError> {
    let mut e = FieldExtrema::default();
    for c in 0..3 {
        e.vel[c] = global_norm0(&fields.vel, c, comm)?;
        e.gp0[c] = global_norm0(&fields.gp0, c, comm)?;
    }
    e.ro = global_norm0(&fields.ro, 0, comm)?;
    e.mu = global_norm0(&fields.mu, 0, comm)?;
    Ok(e)
}

/// Computes `dt` through a [`StabilityBound`].
pub struct StepSizeController {
    bound: Box<dyn StabilityBound>,
}

impl StepSizeController {
    /// Controller delegating the stable-step formula to `bound`.
    pub fn new(bound: Box<dyn StabilityBound>) -> Self {
        Self { bound }
    }

    /// Name of the stability bound in use.
    pub fn bound_name(&self) -> &str {
        self.bound.name()
    }

    /// Compute the step for the current fields.
    ///
    /// Logs a warning when a fixed step exceeds the bound.
    ///
    /// # Errors
    ///
    /// [`StepError::UnboundedStep`] if the chosen step is not finite and
    /// positive, e.g. a quiescent field with an uncapped bound.
    pub fn compute_dt(
        &self,
        fields: &LevelFields,
        geometry: &Geometry,
        comm: &dyn Communicator,
        config: &AdvanceConfig,
        time: f64,
        stop_time: f64,
    ) -> Result<DtDecision, StepError> {
        let extrema = gather_extrema(fields, comm)?;
        debug!("step size extrema: {extrema:?}");
        let inputs = StabilityInputs {
            extrema,
            cell_size: geometry.cell_size(),
            cfl: config.cfl,
            explicit_diffusion: config.explicit_diffusion,
            steady_state: config.steady_state,
            time,
            stop_time,
        };
        let dt_cfl = self.bound.max_stable_dt(&inputs);
        let decision = choose_dt(dt_cfl, config.effective_fixed_dt());
        if decision.cfl_violated {
            warn!(
                "fixed_dt does not satisfy CFL condition: max dt by CFL {:e}, fixed dt specified {:e}",
                decision.dt_cfl, decision.dt
            );
        }
        if !(decision.dt.is_finite() && decision.dt > 0.0) {
            return Err(StepError::UnboundedStep { dt: decision.dt });
        }
        Ok(decision)
    }
}
