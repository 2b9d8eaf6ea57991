//! Field-store fixtures.

use std::sync::Arc;

use incflow_field::{fill_boundary, FieldStore, MultiField};
use incflow_grid::{BoxLayout, Geometry};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Route `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Unit periodic cube of `n` cells per axis, chopped into boxes of at
/// most `max_grid` cells per axis, all owned by worker 0.
pub fn periodic_layout(n: usize, max_grid: usize) -> Arc<BoxLayout> {
    let geom = Geometry::periodic_cube(n).unwrap();
    BoxLayout::chop(geom, max_grid).unwrap().into_shared()
}

/// Initial values for [`uniform_store`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformState {
    pub vel: [f64; 3],
    pub p: f64,
    pub ro: f64,
    pub mu: f64,
    pub gp0: [f64; 3],
}

impl Default for UniformState {
    fn default() -> Self {
        Self {
            vel: [0.0; 3],
            p: 0.0,
            ro: 1.0,
            mu: 0.0,
            gp0: [0.0; 3],
        }
    }
}

/// Store on [`periodic_layout`] with every field uniform, halos included.
pub fn uniform_store(n: usize, max_grid: usize, nghost: usize, state: UniformState) -> FieldStore {
    let mut store = FieldStore::new(periodic_layout(n, max_grid), 0, nghost).unwrap();
    let live = &mut store.live;
    for c in 0..3 {
        live.vel.fill_comp(c, 1, state.vel[c], nghost).unwrap();
        live.gp0.fill_comp(c, 1, state.gp0[c], nghost).unwrap();
    }
    live.p.fill(state.p);
    live.ro.fill(state.ro);
    live.mu.fill(state.mu);
    store
}

/// Overwrite valid cells with values in `[-amplitude, amplitude)` from a
/// seeded generator, then exchange halos.
pub fn random_velocity(field: &mut MultiField, seed: u64, amplitude: f64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let ncomp = field.ncomp();
    for b in field.boxes_mut() {
        for iv in b.valid().cells() {
            for c in 0..ncomp {
                b.set(iv, c, rng.random_range(-amplitude..amplitude));
            }
        }
    }
    fill_boundary(field);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_store_fills_halo() {
        let store = uniform_store(
            4,
            2,
            1,
            UniformState {
                vel: [1.0, 2.0, 3.0],
                ro: 2.0,
                ..UniformState::default()
            },
        );
        let b = &store.live.vel.boxes()[0];
        let corner = b.grown().lo();
        assert_eq!(b.get(corner, 2), 3.0);
        assert_eq!(store.live.ro.local_norm0(0).unwrap(), 2.0);
    }

    #[test]
    fn random_velocity_is_seeded() {
        let layout = periodic_layout(4, 4);
        let mut a = MultiField::new(Arc::clone(&layout), 0, 3, 1, "a").unwrap();
        let mut b = MultiField::new(layout, 0, 3, 1, "b").unwrap();
        random_velocity(&mut a, 7, 1.0);
        random_velocity(&mut b, 7, 1.0);
        assert_eq!(a.max_abs_diff(&b, 0).unwrap(), 0.0);
        assert!(a.local_norm0(1).unwrap() <= 1.0);
        assert!(a.local_norm0(1).unwrap() > 0.0);
    }
}
