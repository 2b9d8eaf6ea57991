//! Fractional-step predictor and corrector.
//!
//! Both sub-steps share one tail: forcing, the momentum round trip that
//! subtracts the pressure-gradient impulse, the optional implicit
//! viscous solve, and the projection.
//!
//! ```text
//! predictor: u = u_o + dt C(u_o) + dt D(u_o)
//! corrector: u = u_o + dt/2 (C(u*) + C(u_o)) + dt/2 (D(u*) + D(u_o))
//! tail:      u += dt f
//!            u = (ro u - dt (gp + gp0)) / ro
//!            u = diffuse(u)                      implicit diffusion only
//!            u, p, gp = project(u)
//! ```

use incflow_core::{SolverStats, SubStep};
use incflow_field::{ExplicitTerms, FieldError, LevelFields, MultiField, OldStateSnapshot};
use incflow_ops::{
    BoundaryFiller, DiffusionSolver, Forcing, OperatorEvaluator, OperatorInputs, Projection,
    ProjectionFields, SubStepContext,
};
use log::trace;

use crate::config::ConfigError;
use crate::error::StepError;

/// The numerics the integrator delegates to.
pub struct Collaborators {
    /// Convective and diffusive terms.
    pub operators: Box<dyn OperatorEvaluator>,
    /// Body forces; `None` adds nothing.
    pub forcing: Option<Box<dyn Forcing>>,
    /// Pressure projection.
    pub projection: Box<dyn Projection>,
    /// Implicit viscous solve; required when diffusion is not explicit.
    pub diffusion: Option<Box<dyn DiffusionSolver>>,
    /// Ghost-cell refresh.
    pub boundary: Box<dyn BoundaryFiller>,
}

impl Collaborators {
    /// Operators, projection and boundary filler, without forcing or
    /// implicit diffusion.
    pub fn new(
        operators: Box<dyn OperatorEvaluator>,
        projection: Box<dyn Projection>,
        boundary: Box<dyn BoundaryFiller>,
    ) -> Self {
        Self {
            operators,
            forcing: None,
            projection,
            diffusion: None,
            boundary,
        }
    }

    /// Add a forcing collaborator.
    pub fn with_forcing(mut self, forcing: Box<dyn Forcing>) -> Self {
        self.forcing = Some(forcing);
        self
    }

    /// Add an implicit diffusion solver.
    pub fn with_diffusion(mut self, diffusion: Box<dyn DiffusionSolver>) -> Self {
        self.diffusion = Some(diffusion);
        self
    }
}

/// Solver statistics of one sub-step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SubStepReport {
    /// Projection solve.
    pub projection: SolverStats,
    /// Implicit viscous solve, when it ran.
    pub diffusion: Option<SolverStats>,
}

/// Convert velocity to momentum, subtract `dt (gp + gp0)`, convert back.
///
/// Acts on valid and ghost cells. Density is checked first, so a
/// non-positive value leaves `vel` untouched.
///
/// # Errors
///
/// [`FieldError::NonPositiveDivisor`] if density is not strictly positive
/// anywhere in the region.
pub fn momentum_round_trip(
    vel: &mut MultiField,
    ro: &MultiField,
    gp: &MultiField,
    gp0: &MultiField,
    dt: f64,
) -> Result<(), FieldError> {
    let ng = vel.nghost();
    ro.check_positive(0, ng)?;
    vel.multiply_comp(ro, 0, 0, 3, ng)?;
    vel.saxpy(-dt, gp, 0, 0, 3, ng)?;
    vel.saxpy(-dt, gp0, 0, 0, 3, ng)?;
    vel.divide_comp(ro, 0, 0, 3, ng)
}

/// Predictor sub-step.
///
/// Evaluates `terms_old = (C, D)(u_o)`, kept for the corrector, and
/// advances `fields.vel`, which holds the old-time values on entry.
pub fn apply_predictor(
    collab: &mut Collaborators,
    ctx: &SubStepContext<'_>,
    fields: &mut LevelFields,
    old: &OldStateSnapshot,
    terms_old: &mut ExplicitTerms,
    proj_2: bool,
) -> Result<SubStepReport, StepError> {
    debug_assert_eq!(ctx.substep(), SubStep::Predictor);
    let dt = ctx.dt();
    let inputs = OperatorInputs {
        vel: old.vel(),
        ro: &fields.ro,
        mu: &fields.mu,
    };
    collab.operators.evaluate(ctx, inputs, terms_old)?;

    fields.vel.saxpy(dt, &terms_old.conv, 0, 0, 3, 0)?;
    fields.vel.saxpy(dt, &terms_old.divtau, 0, 0, 3, 0)?;
    finish_substep(collab, ctx, fields, proj_2)
}

/// Corrector sub-step.
///
/// Evaluates the terms at the predicted velocity and blends them with
/// the predictor's `terms_old`.
pub fn apply_corrector(
    collab: &mut Collaborators,
    ctx: &SubStepContext<'_>,
    fields: &mut LevelFields,
    old: &OldStateSnapshot,
    terms_old: &ExplicitTerms,
    proj_2: bool,
) -> Result<SubStepReport, StepError> {
    debug_assert_eq!(ctx.substep(), SubStep::Corrector);
    let half_dt = 0.5 * ctx.dt();
    let mut terms = ExplicitTerms::like(&fields.vel, "");
    let inputs = OperatorInputs {
        vel: &fields.vel,
        ro: &fields.ro,
        mu: &fields.mu,
    };
    collab.operators.evaluate(ctx, inputs, &mut terms)?;

    fields
        .vel
        .lin_comb(1.0, old.vel(), 0, half_dt, &terms.conv, 0, 0, 3, 0)?;
    fields.vel.saxpy(half_dt, &terms_old.conv, 0, 0, 3, 0)?;
    fields.vel.saxpy(half_dt, &terms.divtau, 0, 0, 3, 0)?;
    fields.vel.saxpy(half_dt, &terms_old.divtau, 0, 0, 3, 0)?;
    finish_substep(collab, ctx, fields, proj_2)
}

fn finish_substep(
    collab: &mut Collaborators,
    ctx: &SubStepContext<'_>,
    fields: &mut LevelFields,
    proj_2: bool,
) -> Result<SubStepReport, StepError> {
    let dt = ctx.dt();
    if let Some(forcing) = &collab.forcing {
        let mut force = fields.vel.like("force");
        forcing.add_force(ctx, &fields.vel, &fields.ro, &mut force)?;
        fields.vel.saxpy(dt, &force, 0, 0, 3, 0)?;
    }

    momentum_round_trip(&mut fields.vel, &fields.ro, &fields.gp, &fields.gp0, dt)?;

    let diffusion = if ctx.explicit_diffusion() {
        None
    } else {
        let solver = collab
            .diffusion
            .as_mut()
            .ok_or(ConfigError::MissingDiffusionSolver)?;
        let stats = solver.diffuse(ctx, &mut fields.vel, &fields.ro, &fields.mu)?;
        trace!("{} {}: {stats:?}", ctx.substep(), solver.name());
        Some(stats)
    };

    let projection = collab.projection.project(
        ctx,
        ProjectionFields {
            vel: &mut fields.vel,
            p: &mut fields.p,
            gp: &mut fields.gp,
            ro: &fields.ro,
        },
        proj_2,
    )?;
    trace!("{} {}: {projection:?}", ctx.substep(), collab.projection.name());
    collab
        .boundary
        .fill_velocity(&mut fields.vel, ctx.comm(), ctx.time() + dt)?;

    Ok(SubStepReport {
        projection,
        diffusion,
    })
}
