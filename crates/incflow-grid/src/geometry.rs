//! Level geometry: domain box, physical origin, cell size, periodicity.

use incflow_core::Component;
use smallvec::SmallVec;

use crate::error::GridError;
use crate::index_box::{IndexBox, IntVect};

/// Physical description of one level.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    domain: IndexBox,
    prob_lo: [f64; 3],
    cell_size: [f64; 3],
    periodic: [bool; 3],
}

impl Geometry {
    /// Create a geometry over `domain` with the given cell size.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidCellSize`] if any cell size is not
    /// finite and positive.
    pub fn new(
        domain: IndexBox,
        prob_lo: [f64; 3],
        cell_size: [f64; 3],
        periodic: [bool; 3],
    ) -> Result<Self, GridError> {
        for (axis, &value) in cell_size.iter().enumerate() {
            if !(value.is_finite() && value > 0.0) {
                return Err(GridError::InvalidCellSize { axis, value });
            }
        }
        Ok(Self {
            domain,
            prob_lo,
            cell_size,
            periodic,
        })
    }

    /// Unit-cube domain of `n` cells per axis, periodic everywhere.
    pub fn periodic_cube(n: usize) -> Result<Self, GridError> {
        let domain = IndexBox::from_extent([n, n, n])?;
        let h = 1.0 / n as f64;
        Self::new(domain, [0.0; 3], [h; 3], [true; 3])
    }

    /// The domain box.
    pub fn domain(&self) -> IndexBox {
        self.domain
    }

    /// Physical coordinate of the domain's low corner.
    pub fn prob_lo(&self) -> [f64; 3] {
        self.prob_lo
    }

    /// Cell size per axis.
    pub fn cell_size(&self) -> [f64; 3] {
        self.cell_size
    }

    /// Cell size along one component direction.
    pub fn cell_size_of(&self, c: Component) -> f64 {
        self.cell_size[c.index()]
    }

    /// Periodicity flags per axis.
    pub fn periodic(&self) -> [bool; 3] {
        self.periodic
    }

    /// Returns `true` if `axis` wraps around.
    pub fn is_periodic(&self, axis: usize) -> bool {
        self.periodic[axis]
    }

    /// Physical coordinate of a cell centre.
    pub fn cell_center(&self, iv: IntVect) -> [f64; 3] {
        let mut x = [0.0; 3];
        for (d, xd) in x.iter_mut().enumerate() {
            let rel = (iv.get(d) - self.domain.lo().get(d)) as f64 + 0.5;
            *xd = self.prob_lo[d] + rel * self.cell_size[d];
        }
        x
    }

    /// Translations under which the domain tiles itself.
    ///
    /// Always contains the zero shift; periodic axes add `±length`.
    pub fn periodic_shifts(&self) -> SmallVec<[IntVect; 27]> {
        let mut per_axis: [SmallVec<[i32; 3]>; 3] = Default::default();
        for (d, choices) in per_axis.iter_mut().enumerate() {
            choices.push(0);
            if self.periodic[d] {
                let len = self.domain.length(d) as i32;
                choices.push(-len);
                choices.push(len);
            }
        }
        let mut shifts = SmallVec::new();
        for &sz in &per_axis[2] {
            for &sy in &per_axis[1] {
                for &sx in &per_axis[0] {
                    shifts.push(IntVect::new(sx, sy, sz));
                }
            }
        }
        shifts
    }

    /// Check that a halo of `ghosts` cells can be filled from periodic images.
    pub fn check_ghosts(&self, ghosts: usize) -> Result<(), GridError> {
        for axis in 0..3 {
            let length = self.domain.length(axis);
            if self.periodic[axis] && ghosts > length {
                return Err(GridError::GhostTooWide {
                    ghosts,
                    axis,
                    length,
                });
            }
        }
        Ok(())
    }
}
