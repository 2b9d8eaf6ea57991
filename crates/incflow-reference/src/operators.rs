//! Central-difference convective and viscous terms.

use incflow_field::ExplicitTerms;
use incflow_ops::{OpError, OperatorEvaluator, OperatorInputs, SubStepContext};
use rayon::prelude::*;

use crate::stencil::{ddx, grad_div, laplacian, require_halo};

/// Second-order central operators on cell-centred velocity.
///
/// ```text
/// conv   = -(u . grad) u
/// divtau = (mu/ro) (lap u + grad(div u))    explicit diffusion
/// divtau = (mu/ro) grad(div u)              implicit diffusion
/// ```
///
/// With implicit diffusion the `(mu/ro) lap u` part is left to the
/// diffusion solver.
#[derive(Clone, Copy, Debug, Default)]
pub struct CentralOperators;

impl OperatorEvaluator for CentralOperators {
    fn name(&self) -> &str {
        "central_operators"
    }

    fn evaluate(
        &self,
        ctx: &SubStepContext<'_>,
        inputs: OperatorInputs<'_>,
        out: &mut ExplicitTerms,
    ) -> Result<(), OpError> {
        let OperatorInputs { vel, ro, mu } = inputs;
        require_halo(vel)?;
        vel.check_comps(0, 3)?;
        for f in [ro, mu, &out.conv, &out.divtau] {
            vel.ensure_same_layout(f)?;
        }
        let h = ctx.geometry().cell_size();
        let explicit = ctx.explicit_diffusion();

        out.conv
            .boxes_mut()
            .par_iter_mut()
            .zip(out.divtau.boxes_mut().par_iter_mut())
            .zip(vel.boxes().par_iter())
            .zip(ro.boxes().par_iter().zip(mu.boxes().par_iter()))
            .for_each(|(((conv, divtau), u), (rb, mb))| {
                for iv in u.valid().cells() {
                    let nu = mb.get(iv, 0) / rb.get(iv, 0);
                    let adv = [u.get(iv, 0), u.get(iv, 1), u.get(iv, 2)];
                    for c in 0..3 {
                        let ugradu: f64 = (0..3).map(|d| adv[d] * ddx(u, iv, c, d, h)).sum();
                        conv.set(iv, c, -ugradu);
                        let mut visc = grad_div(u, iv, c, h);
                        if explicit {
                            visc += laplacian(u, iv, c, h);
                        }
                        divtau.set(iv, c, nu * visc);
                    }
                }
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use incflow_core::SubStep;
    use incflow_field::{fill_boundary, MultiField};
    use incflow_grid::{BoxLayout, Geometry, IntVect, LocalComm};
    use std::f64::consts::PI;

    struct Setup {
        geom: Geometry,
        vel: MultiField,
        ro: MultiField,
        mu: MultiField,
    }

    fn setup(n: usize, ghosts: usize) -> Setup {
        let geom = Geometry::periodic_cube(n).unwrap();
        let layout = BoxLayout::chop(geom.clone(), n / 2).unwrap().into_shared();
        let vel = MultiField::new(layout.clone(), 0, 3, ghosts, "vel").unwrap();
        let mut ro = MultiField::new(layout.clone(), 0, 1, ghosts, "ro").unwrap();
        let mut mu = MultiField::new(layout, 0, 1, ghosts, "mu").unwrap();
        ro.fill(2.0);
        mu.fill(0.1);
        Setup { geom, vel, ro, mu }
    }

    fn run(s: &Setup, explicit: bool) -> ExplicitTerms {
        let comm = LocalComm;
        let ctx = SubStepContext::new(&s.geom, &comm, SubStep::Predictor, 0.0, 0.01, explicit);
        let mut out = ExplicitTerms::like(&s.vel, "");
        let inputs = OperatorInputs {
            vel: &s.vel,
            ro: &s.ro,
            mu: &s.mu,
        };
        CentralOperators.evaluate(&ctx, inputs, &mut out).unwrap();
        out
    }

    #[test]
    fn uniform_flow_has_no_terms() {
        let mut s = setup(8, 1);
        s.vel.set_valid(|_, c| [1.0, -0.5, 0.25][c]);
        fill_boundary(&mut s.vel);
        let out = run(&s, true);
        for c in 0..3 {
            assert_eq!(out.conv.local_norm0(c).unwrap(), 0.0);
            assert_eq!(out.divtau.local_norm0(c).unwrap(), 0.0);
        }
    }

    #[test]
    fn shear_flow_diffuses_but_does_not_advect() {
        // u = sin(2 pi y): divergence-free, (u . grad) u = 0
        let mut s = setup(16, 1);
        let g = s.geom.clone();
        s.vel
            .set_valid(|iv, c| if c == 0 { (2.0 * PI * g.cell_center(iv)[1]).sin() } else { 0.0 });
        fill_boundary(&mut s.vel);

        let explicit = run(&s, true);
        let implicit = run(&s, false);
        assert!(explicit.conv.local_norm0(0).unwrap() < 1e-12);
        // nu * lap u has amplitude 0.05 * 4 pi^2
        let amp = explicit.divtau.local_norm0(0).unwrap();
        assert!((amp - 0.05 * 4.0 * PI * PI).abs() < 0.1, "amplitude {amp}");
        assert!(implicit.divtau.local_norm0(0).unwrap() < 1e-12);
    }

    #[test]
    fn advection_of_linear_profile() {
        // u = (1, 0, 0), v = x-profile so that conv_y = -u dv/dx = -1 * slope
        let mut s = setup(8, 1);
        s.vel.set_valid(|iv, c| match c {
            0 => 1.0,
            1 => iv.get(0) as f64,
            _ => 0.0,
        });
        fill_boundary(&mut s.vel);
        let out = run(&s, true);
        let b = out.conv.boxes().iter().find(|b| b.valid().contains(IntVect::new(3, 3, 3))).unwrap();
        let h = s.geom.cell_size()[0];
        assert!((b.get(IntVect::new(3, 3, 3), 1) + 1.0 / h).abs() < 1e-9);
    }

    #[test]
    fn missing_halo_is_rejected() {
        let s = setup(4, 0);
        let comm = LocalComm;
        let ctx = SubStepContext::new(&s.geom, &comm, SubStep::Corrector, 0.0, 0.01, true);
        let mut out = ExplicitTerms::like(&s.vel, "");
        let inputs = OperatorInputs {
            vel: &s.vel,
            ro: &s.ro,
            mu: &s.mu,
        };
        assert!(CentralOperators.evaluate(&ctx, inputs, &mut out).is_err());
    }
}
