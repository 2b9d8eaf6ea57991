//! Approximate cell-centred projection solved by Jacobi iteration.
//!
//! Solves
//!
//! ```text
//! div( grad(phi) / ro ) = div( u* ) / dt
//! u   = u* - dt grad(phi) / ro
//! ```
//!
//! with face densities averaged from the two adjacent cells. With
//! `proj_2` the old gradient is added back first (`u* = u + dt gp / ro`)
//! and `phi` replaces `p`; otherwise `phi` is an increment to `p`.

use incflow_core::{SolverError, SolverStats};
use incflow_field::{
    exchange_halos, fill_scalar_bc, fill_velocity_bc, FieldBox, FieldError, MultiField,
};
use incflow_grid::{BcTable, Communicator, IntVect, ScalarKind};
use incflow_ops::{OpError, Projection, ProjectionFields, SubStepContext};
use log::trace;
use rayon::prelude::*;

use crate::stencil::{ddx, divergence, require_halo};

/// Iteration controls shared by the Jacobi solvers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JacobiConfig {
    /// Iteration cap.
    pub max_iter: usize,
    /// Residual tolerance relative to the right-hand side max-norm.
    pub tol: f64,
    /// Absolute residual floor.
    pub abs_tol: f64,
}

impl Default for JacobiConfig {
    fn default() -> Self {
        Self {
            max_iter: 10_000,
            tol: 1e-10,
            abs_tol: 1e-12,
        }
    }
}

impl JacobiConfig {
    /// Check that the controls are usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_iter == 0 {
            return Err("max_iter must be at least 1".to_string());
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(format!("tol must be finite and > 0, got {}", self.tol));
        }
        if !(self.abs_tol.is_finite() && self.abs_tol >= 0.0) {
            return Err(format!("abs_tol must be finite and >= 0, got {}", self.abs_tol));
        }
        Ok(())
    }
}

/// Variable-density pressure projection.
#[derive(Clone, Debug)]
pub struct JacobiProjection {
    config: JacobiConfig,
    bc: BcTable,
}

impl JacobiProjection {
    /// Projection on a fully periodic domain.
    pub fn new(config: JacobiConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            config,
            bc: BcTable::periodic(),
        })
    }

    /// Use `bc` for ghost cells on physical faces.
    ///
    /// `phi` gets a zero normal gradient on every physical face.
    pub fn with_bc(mut self, bc: BcTable) -> Self {
        self.bc = bc;
        self
    }

    fn fill_phi(&self, phi: &mut MultiField, comm: &dyn Communicator) -> Result<(), FieldError> {
        exchange_halos(phi, comm)?;
        fill_scalar_bc(phi, 0, ScalarKind::Extrapolated, &self.bc)
    }

    fn solve(
        &self,
        ctx: &SubStepContext<'_>,
        phi: &mut MultiField,
        rhs: &MultiField,
        ro: &MultiField,
    ) -> Result<SolverStats, OpError> {
        let h = ctx.geometry().cell_size();
        let rhs_norm = ctx.comm().all_reduce_max(rhs.local_norm0(0)?)?;
        let target = (self.config.tol * rhs_norm).max(self.config.abs_tol);
        let mut next = phi.like("phi_next");
        let mut iterations = 0;
        loop {
            self.fill_phi(phi, ctx.comm())?;
            let local = jacobi_sweep(phi, &mut next, rhs, ro, h);
            let residual = ctx.comm().all_reduce_max(local)?;
            trace!("{}: iteration {iterations} residual {residual:e}", self.name());
            if residual <= target {
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
            std::mem::swap(phi, &mut next);
            iterations += 1;
        }
    }
}

/// One Jacobi update of `div(grad(phi)/ro) = rhs` from `phi` into `next`.
///
/// Returns the local max-norm of the residual before the update.
fn jacobi_sweep(
    phi: &MultiField,
    next: &mut MultiField,
    rhs: &MultiField,
    ro: &MultiField,
    h: [f64; 3],
) -> f64 {
    next.boxes_mut()
        .par_iter_mut()
        .zip(phi.boxes().par_iter())
        .zip(rhs.boxes().par_iter().zip(ro.boxes().par_iter()))
        .map(|((out, p), (r, rb))| {
            let mut max_res = 0.0_f64;
            for iv in p.valid().cells() {
                let (off, diag) = weighted_neighbours(p, rb, iv, h);
                let centre = p.get(iv, 0);
                let res = off - diag * centre - r.get(iv, 0);
                out.set(iv, 0, centre + res / diag);
                max_res = max_res.max(res.abs());
            }
            max_res
        })
        .reduce(|| 0.0, f64::max)
}

fn weighted_neighbours(p: &FieldBox, rb: &FieldBox, iv: IntVect, h: [f64; 3]) -> (f64, f64) {
    let ro_c = rb.get(iv, 0);
    let mut off = 0.0;
    let mut diag = 0.0;
    for (d, hd) in h.iter().enumerate() {
        for side in [-1, 1] {
            let nb = iv + IntVect::unit(d, side);
            let ro_face = 0.5 * (ro_c + rb.get(nb, 0));
            let w = 1.0 / (ro_face * hd * hd);
            off += w * p.get(nb, 0);
            diag += w;
        }
    }
    (off, diag)
}

impl Projection for JacobiProjection {
    fn name(&self) -> &str {
        "jacobi_projection"
    }

    fn project(
        &mut self,
        ctx: &SubStepContext<'_>,
        fields: ProjectionFields<'_>,
        proj_2: bool,
    ) -> Result<SolverStats, OpError> {
        let ProjectionFields { vel, p, gp, ro } = fields;
        require_halo(vel)?;
        require_halo(p)?;
        require_halo(ro)?;
        vel.check_comps(0, 3)?;
        gp.check_comps(0, 3)?;
        for f in [&*p, &*gp, ro] {
            vel.ensure_same_layout(f)?;
        }
        ro.check_positive(0, 1)?;
        let dt = ctx.dt();
        let h = ctx.geometry().cell_size();

        if proj_2 {
            vel.boxes_mut()
                .par_iter_mut()
                .zip(gp.boxes().par_iter().zip(ro.boxes().par_iter()))
                .for_each(|(u, (g, rb))| {
                    for iv in u.valid().cells() {
                        let r = rb.get(iv, 0);
                        for c in 0..3 {
                            u.set(iv, c, u.get(iv, c) + dt * g.get(iv, c) / r);
                        }
                    }
                });
        }
        exchange_halos(vel, ctx.comm())?;
        fill_velocity_bc(vel, &self.bc)?;

        let mut rhs = p.like("rhs");
        rhs.boxes_mut()
            .par_iter_mut()
            .zip(vel.boxes().par_iter())
            .for_each(|(r, u)| {
                for iv in u.valid().cells() {
                    r.set(iv, 0, divergence(u, iv, h) / dt);
                }
            });

        let mut phi = p.like("phi");
        if proj_2 {
            phi.copy_from(p, 0, 0, 1, 0)?;
        }
        let stats = self.solve(ctx, &mut phi, &rhs, ro)?;
        self.fill_phi(&mut phi, ctx.comm())?;

        vel.boxes_mut()
            .par_iter_mut()
            .zip(gp.boxes_mut().par_iter_mut())
            .zip(phi.boxes().par_iter().zip(ro.boxes().par_iter()))
            .for_each(|((u, g), (ph, rb))| {
                for iv in u.valid().cells() {
                    let r = rb.get(iv, 0);
                    for c in 0..3 {
                        let grad = ddx(ph, iv, 0, c, h);
                        u.set(iv, c, u.get(iv, c) - dt * grad / r);
                        let prior = if proj_2 { 0.0 } else { g.get(iv, c) };
                        g.set(iv, c, prior + grad);
                    }
                }
            });
        if proj_2 {
            p.copy_from(&phi, 0, 0, 1, 0)?;
        } else {
            p.saxpy(1.0, &phi, 0, 0, 1, 0)?;
        }

        self.fill_phi(p, ctx.comm())?;
        exchange_halos(gp, ctx.comm())?;
        for c in 0..3 {
            fill_scalar_bc(gp, c, ScalarKind::Extrapolated, &self.bc)?;
        }
        Ok(stats)
    }

    fn divergence_norm(
        &self,
        ctx: &SubStepContext<'_>,
        vel: &MultiField,
    ) -> Result<Option<f64>, OpError> {
        require_halo(vel)?;
        let h = ctx.geometry().cell_size();
        let local = vel
            .boxes()
            .par_iter()
            .map(|u| {
                u.valid()
                    .cells()
                    .fold(0.0_f64, |m, iv| m.max(divergence(u, iv, h).abs()))
            })
            .reduce(|| 0.0, f64::max);
        Ok(Some(ctx.comm().all_reduce_max(local)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use incflow_core::SubStep;
    use incflow_field::fill_boundary;
    use incflow_grid::{BoxLayout, Geometry, LocalComm};
    use std::f64::consts::PI;
    use std::sync::Arc;

    struct Level {
        geom: Geometry,
        vel: MultiField,
        p: MultiField,
        gp: MultiField,
        ro: MultiField,
    }

    fn level(n: usize, density: f64) -> Level {
        let geom = Geometry::periodic_cube(n).unwrap();
        let layout = BoxLayout::chop(geom.clone(), n / 2).unwrap().into_shared();
        let vel = MultiField::new(Arc::clone(&layout), 0, 3, 1, "vel").unwrap();
        let p = MultiField::new(Arc::clone(&layout), 0, 1, 1, "p").unwrap();
        let gp = vel.like("gp");
        let mut ro = p.like("ro");
        ro.fill(density);
        Level {
            geom,
            vel,
            p,
            gp,
            ro,
        }
    }

    fn project(l: &mut Level, proj: &mut JacobiProjection, dt: f64) -> Result<SolverStats, OpError> {
        let comm = LocalComm;
        let ctx = SubStepContext::new(&l.geom, &comm, SubStep::Predictor, 0.0, dt, true);
        let fields = ProjectionFields {
            vel: &mut l.vel,
            p: &mut l.p,
            gp: &mut l.gp,
            ro: &l.ro,
        };
        proj.project(&ctx, fields, true)
    }

    fn div_norm(l: &mut Level, proj: &JacobiProjection) -> f64 {
        fill_boundary(&mut l.vel);
        let comm = LocalComm;
        let ctx = SubStepContext::new(&l.geom, &comm, SubStep::Predictor, 0.0, 0.1, true);
        proj.divergence_norm(&ctx, &l.vel).unwrap().unwrap()
    }

    #[test]
    fn uniform_flow_is_untouched() {
        let mut l = level(8, 1.0);
        l.vel.fill(0.0);
        l.vel.set_valid(|_, c| [1.0, 2.0, -1.0][c]);
        l.p.fill(3.0);
        let mut proj = JacobiProjection::new(JacobiConfig::default()).unwrap();
        let stats = project(&mut l, &mut proj, 0.05).unwrap();
        assert_eq!(stats.iterations, 0);
        for c in 0..3 {
            let expected = [1.0, 2.0, 1.0][c];
            assert_eq!(l.vel.local_norm0(c).unwrap(), expected);
            assert_eq!(l.gp.local_norm0(c).unwrap(), 0.0);
        }
        assert_eq!(l.p.local_norm0(0).unwrap(), 3.0);
    }

    #[test]
    fn gradient_mode_is_removed() {
        let mut l = level(16, 1.5);
        let g = l.geom.clone();
        l.vel.set_valid(|iv, c| {
            let x = g.cell_center(iv);
            if c == 0 {
                0.3 + (2.0 * PI * x[0]).cos()
            } else {
                0.0
            }
        });
        let mut proj = JacobiProjection::new(JacobiConfig {
            max_iter: 5000,
            tol: 1e-8,
            abs_tol: 1e-12,
        })
        .unwrap();
        let before = div_norm(&mut l, &proj);
        let stats = project(&mut l, &mut proj, 0.01).unwrap();
        let after = div_norm(&mut l, &proj);
        assert!(stats.iterations > 0);
        assert!(after < 0.1 * before, "before {before}, after {after}");
        // the mean flow survives
        assert!((l.vel.local_norm1(0).unwrap() / 4096.0 - 0.3).abs() < 0.1);
        assert!(l.gp.local_norm0(0).unwrap() > 0.0);
    }

    #[test]
    fn iteration_cap_reports_not_converged() {
        let mut l = level(8, 1.0);
        let g = l.geom.clone();
        l.vel
            .set_valid(|iv, c| if c == 1 { (2.0 * PI * g.cell_center(iv)[1]).sin() } else { 0.0 });
        let mut proj = JacobiProjection::new(JacobiConfig {
            max_iter: 1,
            ..JacobiConfig::default()
        })
        .unwrap();
        let err = project(&mut l, &mut proj, 0.01).unwrap_err();
        assert!(matches!(
            err,
            OpError::Solver(SolverError::NotConverged { iterations: 1, .. })
        ));
    }

    #[test]
    fn rejects_non_positive_density() {
        let mut l = level(4, 0.0);
        let mut proj = JacobiProjection::new(JacobiConfig::default()).unwrap();
        assert!(matches!(
            project(&mut l, &mut proj, 0.01),
            Err(OpError::Field(FieldError::NonPositiveDivisor { .. }))
        ));
    }

    #[test]
    fn config_validation() {
        assert!(JacobiConfig {
            max_iter: 0,
            ..JacobiConfig::default()
        }
        .validate()
        .is_err());
        assert!(JacobiProjection::new(JacobiConfig {
            tol: f64::NAN,
            ..JacobiConfig::default()
        })
        .is_err());
    }
}
