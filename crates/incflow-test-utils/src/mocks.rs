//! Collaborator doubles.
//!
//! - [`ConstantOperators`]: fixed convective and diffusive terms.
//! - [`LinearDampingOperators`]: `conv = -k u`, no diffusion.
//! - [`IdentityProjection`] / [`FailingProjection`]: no-op and failing projections.
//! - [`IdentityDiffusion`] / [`FailingDiffusion`]: no-op and failing viscous solves.
//! - [`ConstantForcing`], [`FixedBound`], [`PeriodicBoundary`].
//!
//! Every double can share a [`CallLog`] so tests can assert call order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use incflow_core::{SolverError, SolverStats};
use incflow_field::{exchange_halos, ExplicitTerms, MultiField};
use incflow_grid::{Communicator, ScalarKind};
use incflow_ops::{
    BoundaryFiller, DiffusionSolver, Forcing, OpError, OperatorEvaluator, OperatorInputs,
    Projection, ProjectionFields, StabilityBound, StabilityInputs, SubStepContext,
};

/// Shared, ordered record of collaborator calls.
#[derive(Clone, Debug, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    /// Snapshot of every event so far.
    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

fn record(log: &Option<CallLog>, ctx: &SubStepContext<'_>, what: &str) {
    if let Some(log) = log {
        log.push(format!("{}:{what}", ctx.substep()));
    }
}

fn fill_valid(field: &mut MultiField, values: [f64; 3]) {
    field.set_valid(|_, c| values[c]);
}

// ── Operators ────────────────────────────────────────────────────

/// Writes the same `conv` and `divtau` vectors to every valid cell.
pub struct ConstantOperators {
    pub conv: [f64; 3],
    pub divtau: [f64; 3],
    pub log: Option<CallLog>,
}

impl ConstantOperators {
    pub fn new(conv: [f64; 3], divtau: [f64; 3]) -> Self {
        Self {
            conv,
            divtau,
            log: None,
        }
    }

    pub fn zero() -> Self {
        Self::new([0.0; 3], [0.0; 3])
    }

    pub fn logged(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }
}

impl OperatorEvaluator for ConstantOperators {
    fn name(&self) -> &str {
        "constant_operators"
    }

    fn evaluate(
        &self,
        ctx: &SubStepContext<'_>,
        _inputs: OperatorInputs<'_>,
        out: &mut ExplicitTerms,
    ) -> Result<(), OpError> {
        record(&self.log, ctx, "operators");
        fill_valid(&mut out.conv, self.conv);
        fill_valid(&mut out.divtau, self.divtau);
        Ok(())
    }
}

/// `conv = -rate * u`, `divtau = 0`.
///
/// Gives the analytic decay `du/dt = -rate u`, which separates a
/// predictor-only update from the trapezoidal corrector.
pub struct LinearDampingOperators {
    pub rate: f64,
}

impl OperatorEvaluator for LinearDampingOperators {
    fn name(&self) -> &str {
        "linear_damping"
    }

    fn evaluate(
        &self,
        _ctx: &SubStepContext<'_>,
        inputs: OperatorInputs<'_>,
        out: &mut ExplicitTerms,
    ) -> Result<(), OpError> {
        out.conv.fill(0.0);
        out.conv.saxpy(-self.rate, inputs.vel, 0, 0, 3, 0)?;
        out.divtau.fill(0.0);
        Ok(())
    }
}

// ── Projection ───────────────────────────────────────────────────

/// Leaves every field untouched and counts calls.
#[derive(Default)]
pub struct IdentityProjection {
    calls: Arc<AtomicUsize>,
    pub log: Option<CallLog>,
}

impl IdentityProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logged(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Shared call counter, readable after the projection is boxed.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Projection for IdentityProjection {
    fn name(&self) -> &str {
        "identity_projection"
    }

    fn project(
        &mut self,
        ctx: &SubStepContext<'_>,
        _fields: ProjectionFields<'_>,
        proj_2: bool,
    ) -> Result<SolverStats, OpError> {
        record(&self.log, ctx, if proj_2 { "projection(proj_2)" } else { "projection" });
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(SolverStats::default())
    }
}

/// Succeeds `succeed_count` times, then reports a solver failure.
pub struct FailingProjection {
    pub succeed_count: usize,
    call_count: usize,
}

impl FailingProjection {
    pub fn new(succeed_count: usize) -> Self {
        Self {
            succeed_count,
            call_count: 0,
        }
    }
}

impl Projection for FailingProjection {
    fn name(&self) -> &str {
        "failing_projection"
    }

    fn project(
        &mut self,
        _ctx: &SubStepContext<'_>,
        _fields: ProjectionFields<'_>,
        _proj_2: bool,
    ) -> Result<SolverStats, OpError> {
        let n = self.call_count;
        self.call_count += 1;
        if n >= self.succeed_count {
            return Err(SolverError::failed(
                self.name(),
                format!("deliberate failure after {} successful calls", self.succeed_count),
            )
            .into());
        }
        Ok(SolverStats::default())
    }
}

// ── Diffusion ────────────────────────────────────────────────────

/// Leaves velocity untouched.
#[derive(Default)]
pub struct IdentityDiffusion {
    pub log: Option<CallLog>,
}

impl DiffusionSolver for IdentityDiffusion {
    fn name(&self) -> &str {
        "identity_diffusion"
    }

    fn diffuse(
        &mut self,
        ctx: &SubStepContext<'_>,
        _vel: &mut MultiField,
        _ro: &MultiField,
        _mu: &MultiField,
    ) -> Result<SolverStats, OpError> {
        record(&self.log, ctx, "diffusion");
        Ok(SolverStats {
            iterations: 1,
            residual: 0.0,
        })
    }
}

/// Always reports `NotConverged`.
pub struct FailingDiffusion;

impl DiffusionSolver for FailingDiffusion {
    fn name(&self) -> &str {
        "failing_diffusion"
    }

    fn diffuse(
        &mut self,
        _ctx: &SubStepContext<'_>,
        _vel: &mut MultiField,
        _ro: &MultiField,
        _mu: &MultiField,
    ) -> Result<SolverStats, OpError> {
        Err(SolverError::NotConverged {
            solver: self.name().to_string(),
            iterations: 100,
            residual: 1.0,
        }
        .into())
    }
}

// ── Forcing, stability, boundary ─────────────────────────────────

/// Uniform acceleration on every valid cell.
pub struct ConstantForcing {
    pub accel: [f64; 3],
    pub log: Option<CallLog>,
}

impl ConstantForcing {
    pub fn new(accel: [f64; 3]) -> Self {
        Self { accel, log: None }
    }

    pub fn logged(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }
}

impl Forcing for ConstantForcing {
    fn name(&self) -> &str {
        "constant_forcing"
    }

    fn add_force(
        &self,
        ctx: &SubStepContext<'_>,
        _vel: &MultiField,
        _ro: &MultiField,
        force: &mut MultiField,
    ) -> Result<(), OpError> {
        record(&self.log, ctx, "forcing");
        let accel = self.accel;
        for b in force.boxes_mut() {
            for iv in b.valid().cells() {
                for (c, a) in accel.iter().enumerate() {
                    b.set(iv, c, b.get(iv, c) + a);
                }
            }
        }
        Ok(())
    }
}

/// Returns the same stable step whatever the fields.
pub struct FixedBound(pub f64);

impl StabilityBound for FixedBound {
    fn name(&self) -> &str {
        "fixed_bound"
    }

    fn max_stable_dt(&self, _inputs: &StabilityInputs) -> f64 {
        self.0
    }
}

/// Halo exchange only; for fully periodic domains.
#[derive(Default)]
pub struct PeriodicBoundary {
    pub log: Option<CallLog>,
}

impl PeriodicBoundary {
    pub fn logged(log: CallLog) -> Self {
        Self { log: Some(log) }
    }
}

impl BoundaryFiller for PeriodicBoundary {
    fn fill_velocity(
        &self,
        vel: &mut MultiField,
        comm: &dyn Communicator,
        _time: f64,
    ) -> Result<(), OpError> {
        if let Some(log) = &self.log {
            log.push("fill_velocity");
        }
        exchange_halos(vel, comm)?;
        Ok(())
    }

    fn fill_scalar(
        &self,
        field: &mut MultiField,
        _kind: ScalarKind,
        comm: &dyn Communicator,
        _time: f64,
    ) -> Result<(), OpError> {
        if let Some(log) = &self.log {
            log.push(format!("fill_scalar:{}", field.name()));
        }
        exchange_halos(field, comm)?;
        Ok(())
    }
}
