//! Collaborator traits consumed by the integrator.
//!
//! All traits are object-safe; the integrator holds collaborators as
//! `Box<dyn Trait>`. Operators and forcing are `&self` and must not
//! keep per-call state. Solvers take `&mut self` so they may keep
//! warm-start or preconditioner data between calls.

use incflow_core::SolverStats;
use incflow_field::{ExplicitTerms, MultiField};
use incflow_grid::{Communicator, ScalarKind};

use crate::context::SubStepContext;
use crate::error::OpError;

/// Fields an operator evaluation reads.
#[derive(Clone, Copy)]
pub struct OperatorInputs<'a> {
    /// Velocity the terms are evaluated at. Halo is filled.
    pub vel: &'a MultiField,
    /// Density.
    pub ro: &'a MultiField,
    /// Viscosity.
    pub mu: &'a MultiField,
}

/// Builds the explicit convective and diffusive terms.
pub trait OperatorEvaluator: Send {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Overwrite `out.conv` with `C(vel)` and `out.divtau` with `D(vel)`
    /// on valid cells.
    ///
    /// When [`SubStepContext::explicit_diffusion`] is `false`, `D`
    /// returns only the off-diagonal viscous contribution.
    fn evaluate(
        &self,
        ctx: &SubStepContext<'_>,
        inputs: OperatorInputs<'_>,
        out: &mut ExplicitTerms,
    ) -> Result<(), OpError>;
}

/// Source of explicit body forces.
pub trait Forcing: Send {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Add the force per unit mass to `force` on valid cells.
    ///
    /// The integrator applies `vel += dt * force` afterwards.
    fn add_force(
        &self,
        ctx: &SubStepContext<'_>,
        vel: &MultiField,
        ro: &MultiField,
        force: &mut MultiField,
    ) -> Result<(), OpError>;
}

/// Mutable fields handed to a projection.
pub struct ProjectionFields<'a> {
    /// Provisional velocity in, divergence-free velocity out.
    pub vel: &'a mut MultiField,
    /// Pressure; redefined from the projection variable.
    pub p: &'a mut MultiField,
    /// Pressure gradient; refreshed from the new pressure.
    pub gp: &'a mut MultiField,
    /// Density.
    pub ro: &'a MultiField,
}

/// Pressure-projection solver.
pub trait Projection: Send {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Project `fields.vel` onto the divergence-free subspace.
    ///
    /// `proj_2` selects the variant in which the old pressure gradient
    /// is added back before the solve and `p` is replaced by `phi`.
    fn project(
        &mut self,
        ctx: &SubStepContext<'_>,
        fields: ProjectionFields<'_>,
        proj_2: bool,
    ) -> Result<SolverStats, OpError>;

    /// Global `max |div u|`, if this projection can measure it.
    fn divergence_norm(
        &self,
        _ctx: &SubStepContext<'_>,
        _vel: &MultiField,
    ) -> Result<Option<f64>, OpError> {
        Ok(None)
    }
}

/// Implicit viscous solver, used when diffusion is not explicit.
pub trait DiffusionSolver: Send {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Solve `(I - dt mu/ro lap) u = u*` in place.
    fn diffuse(
        &mut self,
        ctx: &SubStepContext<'_>,
        vel: &mut MultiField,
        ro: &MultiField,
        mu: &MultiField,
    ) -> Result<SolverStats, OpError>;
}

/// Ghost-cell refresh for velocity and scalars.
///
/// Both calls are collective: ghosts mirrored from boxes of other
/// workers come through `comm`.
pub trait BoundaryFiller: Send {
    /// Fill every velocity ghost cell at `time`.
    fn fill_velocity(
        &self,
        vel: &mut MultiField,
        comm: &dyn Communicator,
        time: f64,
    ) -> Result<(), OpError>;

    /// Fill every ghost cell of scalar component 0 at `time`.
    fn fill_scalar(
        &self,
        field: &mut MultiField,
        kind: ScalarKind,
        comm: &dyn Communicator,
        time: f64,
    ) -> Result<(), OpError>;
}
