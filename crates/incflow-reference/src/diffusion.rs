//! Implicit viscous update solved by Jacobi iteration.

use incflow_core::{SolverError, SolverStats};
use incflow_field::{exchange_halos, fill_velocity_bc, FieldError, MultiField};
use incflow_grid::{BcTable, Communicator, IntVect};
use incflow_ops::{DiffusionSolver, OpError, SubStepContext};
use log::trace;
use rayon::prelude::*;

use crate::projection::JacobiConfig;
use crate::stencil::require_halo;

/// Solves `(I - dt (mu/ro) lap) u = u*` for each velocity component.
#[derive(Clone, Debug)]
pub struct JacobiDiffusion {
    config: JacobiConfig,
    bc: BcTable,
}

impl JacobiDiffusion {
    /// Diffusion on a fully periodic domain.
    pub fn new(config: JacobiConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            config,
            bc: BcTable::periodic(),
        })
    }

    /// Use `bc` for velocity ghost cells on physical faces.
    pub fn with_bc(mut self, bc: BcTable) -> Self {
        self.bc = bc;
        self
    }

    fn fill(&self, vel: &mut MultiField, comm: &dyn Communicator) -> Result<(), FieldError> {
        exchange_halos(vel, comm)?;
        fill_velocity_bc(vel, &self.bc)
    }
}

impl DiffusionSolver for JacobiDiffusion {
    fn name(&self) -> &str {
        "jacobi_diffusion"
    }

    fn diffuse(
        &mut self,
        ctx: &SubStepContext<'_>,
        vel: &mut MultiField,
        ro: &MultiField,
        mu: &MultiField,
    ) -> Result<SolverStats, OpError> {
        require_halo(vel)?;
        vel.check_comps(0, 3)?;
        vel.ensure_same_layout(ro)?;
        vel.ensure_same_layout(mu)?;
        ro.check_positive(0, 0)?;
        let dt = ctx.dt();
        let h = ctx.geometry().cell_size();
        let inv_h2 = h.map(|hd| 1.0 / (hd * hd));

        let rhs = vel.clone();
        let mut local_norm = 0.0_f64;
        for c in 0..3 {
            local_norm = local_norm.max(rhs.local_norm0(c)?);
        }
        let rhs_norm = ctx.comm().all_reduce_max(local_norm)?;
        let target = (self.config.tol * rhs_norm).max(self.config.abs_tol);
        let mut next = vel.like("vel_next");
        let mut iterations = 0;
        loop {
            self.fill(vel, ctx.comm())?;
            let local = next
                .boxes_mut()
                .par_iter_mut()
                .zip(vel.boxes().par_iter())
                .zip(rhs.boxes().par_iter())
                .zip(ro.boxes().par_iter().zip(mu.boxes().par_iter()))
                .map(|(((out, u), r), (rb, mb))| {
                    let mut max_res = 0.0_f64;
                    for iv in u.valid().cells() {
                        let alpha = dt * mb.get(iv, 0) / rb.get(iv, 0);
                        let diag = 1.0 + 2.0 * alpha * inv_h2.iter().sum::<f64>();
                        for c in 0..3 {
                            let mut off = 0.0;
                            for (d, w) in inv_h2.iter().enumerate() {
                                let e = IntVect::unit(d, 1);
                                off += w * (u.get(iv + e, c) + u.get(iv - e, c));
                            }
                            let centre = u.get(iv, c);
                            let res = r.get(iv, c) - (diag * centre - alpha * off);
                            out.set(iv, c, centre + res / diag);
                            max_res = max_res.max(res.abs());
                        }
                    }
                    max_res
                })
                .reduce(|| 0.0, f64::max);
            let residual = ctx.comm().all_reduce_max(local)?;
            trace!("{}: iteration {iterations} residual {residual:e}", self.name());
            if residual <= target {
                self.fill(vel, ctx.comm())?;
                return Ok(SolverStats {
                    iterations,
                    residual,
                });
            }
            if iterations == self.config.max_iter {
                return Err(SolverError::NotConverged {
                    solver: self.name().to_string(),
                    iterations,
                    residual,
                }
                .into());
            }
            std::mem::swap(vel, &mut next);
            iterations += 1;
        }
    }
}
