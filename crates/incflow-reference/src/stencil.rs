//! Second-order central stencils on a single box.
//!
//! All helpers read one halo cell in every direction (corners included
//! for the mixed derivatives) and assume it has been filled.

use incflow_field::{FieldBox, FieldError, MultiField};
use incflow_grid::IntVect;

/// `d f / d x_axis` at `iv`.
#[inline]
pub(crate) fn ddx(b: &FieldBox, iv: IntVect, comp: usize, axis: usize, h: [f64; 3]) -> f64 {
    let e = IntVect::unit(axis, 1);
    (b.get(iv + e, comp) - b.get(iv - e, comp)) / (2.0 * h[axis])
}

/// Seven-point Laplacian of component `comp`.
#[inline]
pub(crate) fn laplacian(b: &FieldBox, iv: IntVect, comp: usize, h: [f64; 3]) -> f64 {
    let centre = b.get(iv, comp);
    (0..3)
        .map(|d| {
            let e = IntVect::unit(d, 1);
            (b.get(iv + e, comp) - 2.0 * centre + b.get(iv - e, comp)) / (h[d] * h[d])
        })
        .sum()
}

/// Central divergence of a 3-component field.
#[inline]
pub(crate) fn divergence(b: &FieldBox, iv: IntVect, h: [f64; 3]) -> f64 {
    (0..3).map(|d| ddx(b, iv, d, d, h)).sum()
}

/// Component `i` of `grad(div u)`.
pub(crate) fn grad_div(b: &FieldBox, iv: IntVect, i: usize, h: [f64; 3]) -> f64 {
    let ei = IntVect::unit(i, 1);
    let mut sum = 0.0;
    for j in 0..3 {
        if j == i {
            sum += (b.get(iv + ei, i) - 2.0 * b.get(iv, i) + b.get(iv - ei, i)) / (h[i] * h[i]);
        } else {
            let ej = IntVect::unit(j, 1);
            let mixed = b.get(iv + ei + ej, j) - b.get(iv + ei - ej, j)
                - b.get(iv - ei + ej, j)
                + b.get(iv - ei - ej, j);
            sum += mixed / (4.0 * h[i] * h[j]);
        }
    }
    sum
}

/// Require at least one halo cell on `field`.
pub(crate) fn require_halo(field: &MultiField) -> Result<(), FieldError> {
    field.check_ghost(1)
}
