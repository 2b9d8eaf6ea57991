//! Outer loop: one externally driven step, or repeated steps until the
//! steady-state test passes.
//!
//! Each iteration runs
//!
//! ```text
//! dt  = compute_dt(fields)
//! old = snapshot(fields)
//! predictor(old, dt)
//! corrector(old, dt)
//! stop unless steady_state && !converged
//! ```

use std::time::Instant;

use incflow_core::{IterationCount, StepIndex, SubStep};
use incflow_field::{ExplicitTerms, FieldStore, LevelFields};
use incflow_grid::{Communicator, ScalarKind};
use incflow_ops::{StabilityBound, SubStepContext};
use log::{info, Level};

use crate::config::{AdvanceConfig, ConfigError};
use crate::diagnostics::{check_for_nans, print_max_vel, NanReport};
use crate::error::StepError;
use crate::integrator::{apply_corrector, apply_predictor, Collaborators};
use crate::metrics::AdvanceMetrics;
use crate::steady::SteadyStateMonitor;
use crate::step_size::StepSizeController;

/// Time-keeping shared with the external driver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepClock {
    /// Steps completed so far.
    pub nstep: StepIndex,
    /// Current time.
    pub time: f64,
    /// Stop time; `<= 0` means none.
    pub stop_time: f64,
    /// Step size of the latest iteration.
    pub dt: f64,
    /// Step size published by the previous advance.
    pub prev_dt: f64,
}

impl StepClock {
    /// Clock at `time` with no step taken yet.
    pub fn new(time: f64, stop_time: f64) -> Self {
        Self {
            nstep: StepIndex(0),
            time,
            stop_time,
            dt: 0.0,
            prev_dt: 0.0,
        }
    }

    /// Move to the end of the step just advanced.
    pub fn finish_step(&mut self) {
        self.time += self.dt;
        self.nstep = StepIndex(self.nstep.0 + 1);
    }
}

/// What an advance did.
#[derive(Clone, Debug, PartialEq)]
pub struct AdvanceOutcome {
    /// Step size of the last iteration, also published as `prev_dt`.
    pub dt: f64,
    /// Outer-loop iterations run.
    pub iterations: u64,
    /// Steady state reached. Always `true` outside steady-state mode.
    pub converged: bool,
    /// Non-finite fields after the last iteration.
    pub nans: NanReport,
    /// Timing and solver data.
    pub metrics: AdvanceMetrics,
}

/// Drives the predictor-corrector integrator for one level.
pub struct Advancer {
    config: AdvanceConfig,
    collab: Collaborators,
    step_size: StepSizeController,
    monitor: SteadyStateMonitor,
    comm: Box<dyn Communicator>,
}

fn elapsed_us(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX)
}

impl Advancer {
    /// Validate `config` against the collaborators and assemble.
    ///
    /// # Errors
    ///
    /// Any [`AdvanceConfig::validate`] failure, or
    /// [`ConfigError::MissingDiffusionSolver`] when diffusion is implicit
    /// and `collab` has no diffusion solver.
    pub fn new(
        config: AdvanceConfig,
        collab: Collaborators,
        bound: Box<dyn StabilityBound>,
        comm: Box<dyn Communicator>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if !config.explicit_diffusion && collab.diffusion.is_none() {
            return Err(ConfigError::MissingDiffusionSolver);
        }
        let monitor = SteadyStateMonitor::new(config.steady_state_tol);
        Ok(Self {
            config,
            collab,
            step_size: StepSizeController::new(bound),
            monitor,
            comm,
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &AdvanceConfig {
        &self.config
    }

    /// This worker's communicator.
    pub fn comm(&self) -> &dyn Communicator {
        &*self.comm
    }

    /// Advance `store` by one step, or to steady state.
    ///
    /// Refreshes the viscosity, density and velocity ghost cells first.
    /// `clock.dt` holds the last step size on return and `clock.prev_dt`
    /// is set to it; `clock.time` is left for the driver to move with
    /// [`StepClock::finish_step`].
    pub fn advance(
        &mut self,
        store: &mut FieldStore,
        clock: &mut StepClock,
    ) -> Result<AdvanceOutcome, StepError> {
        let start = Instant::now();
        let mut metrics = AdvanceMetrics::default();
        let geometry = store.live.vel.layout().geometry().clone();
        let comm = &*self.comm;
        let config = &self.config;
        let steady_level = if config.verbose > 0 {
            Level::Info
        } else {
            Level::Debug
        };

        info!("============ NEW TIME STEP ============");
        let live = &mut store.live;
        self.collab
            .boundary
            .fill_scalar(&mut live.mu, ScalarKind::Extrapolated, comm, clock.time)?;
        self.collab
            .boundary
            .fill_scalar(&mut live.ro, ScalarKind::Density, comm, clock.time)?;
        self.collab
            .boundary
            .fill_velocity(&mut live.vel, comm, clock.time)?;

        let mut iteration = IterationCount::FIRST;
        let converged = loop {
            let t = Instant::now();
            let decision = self.step_size.compute_dt(
                &store.live,
                &geometry,
                comm,
                config,
                clock.time,
                clock.stop_time,
            )?;
            metrics.step_size_us += elapsed_us(t);
            if decision.cfl_violated {
                metrics.cfl_violations += 1;
            }
            let dt = decision.dt;
            clock.dt = dt;
            if config.steady_state {
                info!("Iteration {iteration} with dt = {dt:e}");
            } else {
                info!(
                    "Step {}: from old time {} to new time {} with dt = {dt:e}",
                    clock.nstep.0 + 1,
                    clock.time,
                    clock.time + dt
                );
            }

            store.snapshot_old()?;
            let (fields, old) = store.split();
            let mut terms_old = ExplicitTerms::like(&fields.vel, "_old");

            let t = Instant::now();
            let ctx = SubStepContext::new(
                &geometry,
                comm,
                SubStep::Predictor,
                clock.time,
                dt,
                config.explicit_diffusion,
            );
            let report = apply_predictor(
                &mut self.collab,
                &ctx,
                fields,
                old,
                &mut terms_old,
                config.proj_2,
            )?;
            metrics.record_solves(&report);
            metrics.predictor_us += elapsed_us(t);
            self.report_substep("predictor", &ctx, &store.live)?;

            let (fields, old) = store.split();
            let t = Instant::now();
            let ctx = SubStepContext::new(
                &geometry,
                comm,
                SubStep::Corrector,
                clock.time,
                dt,
                config.explicit_diffusion,
            );
            let report = apply_corrector(
                &mut self.collab,
                &ctx,
                fields,
                old,
                &terms_old,
                config.proj_2,
            )?;
            metrics.record_solves(&report);
            metrics.corrector_us += elapsed_us(t);
            self.report_substep("corrector", &ctx, &store.live)?;
            metrics.iterations = iteration.0;

            if !config.steady_state {
                break true;
            }

            let t = Instant::now();
            self.collab
                .boundary
                .fill_velocity(&mut store.live.vel, comm, clock.time + dt)?;
            let old = store.old();
            let check = self.monitor.is_converged(
                &store.live.vel,
                old.vel(),
                &store.live.p,
                old.p(),
                dt,
                iteration,
                comm,
            )?;
            metrics.steady_check_us += elapsed_us(t);
            metrics.last_steady = Some(check.metrics);
            let m = &check.metrics;
            log::log!(
                steady_level,
                "steady state check: ||u-uo||/||uo|| {:e} du/dt {:e}, ||v-vo||/||vo|| {:e} dv/dt {:e}, \
                 ||w-wo||/||wo|| {:e} dw/dt {:e}, ||p-po||/||po|| {:e} dp/dt {:e}",
                m.relative_change[0],
                m.rate[0],
                m.relative_change[1],
                m.rate[1],
                m.relative_change[2],
                m.rate[2],
                m.pressure_relative_change,
                m.pressure_rate
            );
            if check.converged {
                break true;
            }
            if config
                .max_steady_iterations
                .is_some_and(|cap| iteration.0 >= cap)
            {
                return Err(StepError::SteadyStateNotReached {
                    iterations: iteration.0,
                });
            }
            iteration = iteration.next();
        };

        clock.prev_dt = clock.dt;
        let nans = check_for_nans(&store.live.vel, &store.live.p, comm)?;
        metrics.total_us = elapsed_us(start);
        Ok(AdvanceOutcome {
            dt: clock.dt,
            iterations: metrics.iterations,
            converged,
            nans,
            metrics,
        })
    }

    /// Extrema and divergence after a sub-step. Collective; runs only
    /// when `verbose > 0`.
    fn report_substep(
        &self,
        label: &str,
        ctx: &SubStepContext<'_>,
        fields: &LevelFields,
    ) -> Result<(), StepError> {
        if self.config.verbose == 0 {
            return Ok(());
        }
        info!("After {label} step:");
        print_max_vel(&fields.vel, &fields.p, ctx.comm(), Level::Info)?;
        if let Some(div) = self.collab.projection.divergence_norm(ctx, &fields.vel)? {
            info!("max(abs(divu)) = {div:e}");
        }
        Ok(())
    }
}
