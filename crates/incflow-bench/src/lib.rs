//! Benchmark profiles and utilities for the incflow integrator.
//!
//! Provides ready-to-advance levels for benchmarks and examples:
//!
//! - [`reference_profile`]: periodic Taylor-Green vortex, explicit diffusion
//! - [`implicit_profile`]: same flow with the viscous term solved implicitly
//! - [`taylor_green`] / [`perturb`]: deterministic initial conditions
//! - [`kinetic_energy`]: the usual decay diagnostic

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::error::Error;
use std::f64::consts::PI;

use incflow_engine::{AdvanceConfig, Advancer, Collaborators, StepClock};
use incflow_field::{fill_boundary, FieldStore, MultiField};
use incflow_grid::{BcTable, BoxLayout, Geometry, LocalComm};
use incflow_reference::{
    CentralOperators, CflBound, JacobiConfig, JacobiDiffusion, JacobiProjection, TableBoundary,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Viscosity of the benchmark fluid; density is 1.
pub const VISCOSITY: f64 = 1.0e-3;

/// Amplitude of the seeded noise added on top of the vortex.
pub const NOISE: f64 = 1.0e-3;

/// A level ready to advance.
pub struct BenchLevel {
    pub store: FieldStore,
    pub advancer: Advancer,
    pub clock: StepClock,
}

/// Projection controls used by the profiles: loose enough to keep a
/// benchmark iteration short.
pub fn bench_solver_config() -> JacobiConfig {
    JacobiConfig {
        max_iter: 2_000,
        tol: 1e-6,
        abs_tol: 1e-10,
    }
}

/// Write the Taylor-Green vortex
/// `u = sin x cos y cos z`, `v = -cos x sin y cos z`, `w = 0`
/// (period 1) into `vel` and fill its halo.
pub fn taylor_green(vel: &mut MultiField) {
    let geom = vel.layout().geometry().clone();
    vel.set_valid(|iv, c| {
        let [x, y, z] = geom.cell_center(iv).map(|s| 2.0 * PI * s);
        match c {
            0 => x.sin() * y.cos() * z.cos(),
            1 => -x.cos() * y.sin() * z.cos(),
            _ => 0.0,
        }
    });
    fill_boundary(vel);
}

/// Add uniform noise in `[-amplitude, amplitude)` from a seeded generator.
pub fn perturb(vel: &mut MultiField, seed: u64, amplitude: f64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let ncomp = vel.ncomp();
    for b in vel.boxes_mut() {
        for iv in b.valid().cells() {
            for c in 0..ncomp {
                let v = b.get(iv, c) + rng.random_range(-amplitude..amplitude);
                b.set(iv, c, v);
            }
        }
    }
    fill_boundary(vel);
}

/// `0.5 * sum |u|^2 dV` over this worker's valid cells.
pub fn kinetic_energy(vel: &MultiField) -> f64 {
    let h = vel.layout().geometry().cell_size();
    let dv = h[0] * h[1] * h[2];
    let mut sum = 0.0;
    for b in vel.boxes() {
        for iv in b.valid().cells() {
            sum += (0..3).map(|c| b.get(iv, c).powi(2)).sum::<f64>();
        }
    }
    0.5 * sum * dv
}

fn vortex_store(n: usize, seed: u64) -> Result<FieldStore, Box<dyn Error>> {
    let geom = Geometry::periodic_cube(n)?;
    let layout = BoxLayout::chop(geom, (n / 2).max(1))?.into_shared();
    let mut store = FieldStore::new(layout, 0, 1)?;
    store.live.ro.fill(1.0);
    store.live.mu.fill(VISCOSITY);
    taylor_green(&mut store.live.vel);
    perturb(&mut store.live.vel, seed, NOISE);
    Ok(store)
}

fn reference_collaborators() -> Result<Collaborators, Box<dyn Error>> {
    Ok(Collaborators::new(
        Box::new(CentralOperators),
        Box::new(JacobiProjection::new(bench_solver_config())?),
        Box::new(TableBoundary::new(BcTable::periodic())),
    ))
}

/// Periodic `n^3` Taylor-Green level with explicit diffusion.
pub fn reference_profile(n: usize, seed: u64) -> Result<BenchLevel, Box<dyn Error>> {
    let store = vortex_store(n, seed)?;
    let config = AdvanceConfig::builder().cfl(0.5).build()?;
    let advancer = Advancer::new(
        config,
        reference_collaborators()?,
        Box::new(CflBound::default()),
        Box::new(LocalComm),
    )?;
    Ok(BenchLevel {
        store,
        advancer,
        clock: StepClock::new(0.0, -1.0),
    })
}

/// As [`reference_profile`], with the viscous term handled by
/// [`JacobiDiffusion`].
pub fn implicit_profile(n: usize, seed: u64) -> Result<BenchLevel, Box<dyn Error>> {
    let store = vortex_store(n, seed)?;
    let config = AdvanceConfig::builder()
        .cfl(0.5)
        .explicit_diffusion(false)
        .build()?;
    let collab =
        reference_collaborators()?.with_diffusion(Box::new(JacobiDiffusion::new(bench_solver_config())?));
    let advancer = Advancer::new(
        config,
        collab,
        Box::new(CflBound::default()),
        Box::new(LocalComm),
    )?;
    Ok(BenchLevel {
        store,
        advancer,
        clock: StepClock::new(0.0, -1.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vortex_energy_is_one_eighth() {
        let geom = Geometry::periodic_cube(8).unwrap();
        let layout = BoxLayout::chop(geom, 4).unwrap().into_shared();
        let mut vel = MultiField::new(layout, 0, 3, 1, "vel").unwrap();
        taylor_green(&mut vel);
        assert!((kinetic_energy(&vel) - 0.125).abs() < 1e-12);
    }

    #[test]
    fn perturbation_is_seeded_and_bounded() {
        let a = vortex_store(8, 3).unwrap();
        let b = vortex_store(8, 3).unwrap();
        let c = vortex_store(8, 4).unwrap();
        assert_eq!(a.live.vel.max_abs_diff(&b.live.vel, 0).unwrap(), 0.0);
        let d = a.live.vel.max_abs_diff(&c.live.vel, 1).unwrap();
        assert!(d > 0.0 && d < 2.0 * NOISE);
    }

    #[test]
    fn profiles_advance() {
        for mut level in [reference_profile(8, 1).unwrap(), implicit_profile(8, 1).unwrap()] {
            let e0 = kinetic_energy(&level.store.live.vel);
            let out = level
                .advancer
                .advance(&mut level.store, &mut level.clock)
                .unwrap();
            assert!(out.nans.is_clean());
            assert!(out.dt > 0.0);
            let e1 = kinetic_energy(&level.store.live.vel);
            assert!(e1 > 0.9 * e0 && e1 < 1.05 * e0, "{e0} -> {e1}");
        }
    }
}
