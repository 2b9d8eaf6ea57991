//! Ghost-cell fill on physical (non-periodic) domain faces.
//!
//! Faces are processed x, then y, then z, so edge and corner ghosts
//! take values that were already filled on earlier axes.

use incflow_grid::{BcKind, BcTable, Face, FaceBc, IndexBox, ScalarKind};
use rayon::prelude::*;

use crate::error::FieldError;
use crate::multi_field::{FieldBox, MultiField};

/// Fill ghost cells of scalar component `comp` on physical faces.
///
/// Pressure inflow and outflow faces extrapolate the adjacent interior
/// value. Mass inflow and no-slip faces take the table value selected
/// by `kind` ([`FaceBc::density`] or [`FaceBc::tracer`]);
/// [`ScalarKind::Extrapolated`] always extrapolates.
pub fn fill_scalar_bc(
    field: &mut MultiField,
    comp: usize,
    kind: ScalarKind,
    table: &BcTable,
) -> Result<(), FieldError> {
    field.check_comps(comp, 1)?;
    fill_faces(field, comp..comp + 1, table, |bc, _| kind.prescribed(bc))
}

/// Fill all three velocity components on physical faces.
///
/// Mass inflow and no-slip faces take [`FaceBc::velocity`]; pressure
/// faces extrapolate.
pub fn fill_velocity_bc(vel: &mut MultiField, table: &BcTable) -> Result<(), FieldError> {
    vel.check_comps(0, 3)?;
    fill_faces(vel, 0..3, table, |bc, n| {
        matches!(bc.kind, BcKind::MassInflow | BcKind::NoSlipWall).then_some(bc.velocity[n])
    })
}

fn fill_faces<F>(
    field: &mut MultiField,
    comps: std::ops::Range<usize>,
    table: &BcTable,
    prescribed: F,
) -> Result<(), FieldError>
where
    F: Fn(&FaceBc, usize) -> Option<f64> + Sync,
{
    let domain = field.layout().geometry().domain();
    let ng = field.nghost() as i32;
    if ng == 0 {
        return Ok(());
    }
    field.boxes_mut().par_iter_mut().for_each(|b| {
        for face in Face::ALL {
            let bc = table.face(face);
            if bc.kind == BcKind::Periodic {
                continue;
            }
            let axis = face.axis();
            let (lo, hi, edge) = if face.is_low() {
                let edge = domain.lo().get(axis);
                (edge - ng, edge - 1, edge)
            } else {
                let edge = domain.hi().get(axis);
                (edge + 1, edge + ng, edge)
            };
            if let Some(slab) = b.grown().slab(axis, lo, hi) {
                fill_slab(b, slab, axis, edge, comps.clone(), |n| prescribed(bc, n));
            }
        }
    });
    Ok(())
}

fn fill_slab(
    b: &mut FieldBox,
    slab: IndexBox,
    axis: usize,
    edge: i32,
    comps: std::ops::Range<usize>,
    prescribed: impl Fn(usize) -> Option<f64>,
) {
    for iv in slab.cells() {
        let interior = iv.with(axis, edge);
        for n in comps.clone() {
            let v = prescribed(n).unwrap_or_else(|| b.get(interior, n));
            b.set(iv, n, v);
        }
    }
}
