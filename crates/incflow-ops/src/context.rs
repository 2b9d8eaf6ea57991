//! Context passed to collaborators during a sub-step.

use incflow_core::SubStep;
use incflow_grid::{Communicator, Geometry};

/// Read-only view of the sub-step a collaborator is called from.
///
/// Collaborators that need global quantities (solver residuals,
/// divergence norms) reduce them through [`SubStepContext::comm`].
pub struct SubStepContext<'a> {
    geometry: &'a Geometry,
    comm: &'a dyn Communicator,
    substep: SubStep,
    time: f64,
    dt: f64,
    explicit_diffusion: bool,
}

impl<'a> SubStepContext<'a> {
    /// Construct a context.
    ///
    /// Typically called by the integrator; tests build one directly.
    pub fn new(
        geometry: &'a Geometry,
        comm: &'a dyn Communicator,
        substep: SubStep,
        time: f64,
        dt: f64,
        explicit_diffusion: bool,
    ) -> Self {
        Self {
            geometry,
            comm,
            substep,
            time,
            dt,
            explicit_diffusion,
        }
    }

    /// Level geometry.
    pub fn geometry(&self) -> &Geometry {
        self.geometry
    }

    /// Collective reductions for this worker.
    pub fn comm(&self) -> &dyn Communicator {
        self.comm
    }

    /// Which sub-step is running.
    pub fn substep(&self) -> SubStep {
        self.substep
    }

    /// Simulation time at the start of the step.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Step size.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// `true` when the full viscous term is treated explicitly.
    ///
    /// When `false`, the diffusive term returns only the off-diagonal
    /// part and a [`DiffusionSolver`](crate::DiffusionSolver) handles
    /// the rest.
    pub fn explicit_diffusion(&self) -> bool {
        self.explicit_diffusion
    }
}
