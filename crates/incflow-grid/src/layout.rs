//! Box layout of a level and ownership of boxes by workers.
//!
//! A [`BoxLayout`] is the mesh/partition provider's answer to "which
//! boxes make up this level and who owns each one". It is immutable
//! once built and shared between every field on the level via `Arc`.
//! Ownership is static for the lifetime of a step: no box is ever
//! written by two workers.

use std::sync::Arc;

use crate::error::GridError;
use crate::geometry::Geometry;
use crate::index_box::{IndexBox, IntVect};

/// Non-overlapping boxes covering (part of) a level domain.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxLayout {
    geometry: Geometry,
    boxes: Vec<IndexBox>,
    owners: Vec<usize>,
    n_workers: usize,
}

impl BoxLayout {
    /// Build a layout from explicit boxes, all owned by worker 0.
    ///
    /// # Errors
    ///
    /// Rejects empty box lists, boxes outside the domain, and
    /// overlapping boxes.
    pub fn new(geometry: Geometry, boxes: Vec<IndexBox>) -> Result<Self, GridError> {
        if boxes.is_empty() {
            return Err(GridError::EmptyLayout);
        }
        let domain = geometry.domain();
        for bx in &boxes {
            if !domain.contains_box(bx) {
                return Err(GridError::OutsideDomain { bx: *bx, domain });
            }
        }
        for (i, a) in boxes.iter().enumerate() {
            for (j, b) in boxes.iter().enumerate().skip(i + 1) {
                if a.intersects(b) {
                    return Err(GridError::Overlap {
                        first: i,
                        second: j,
                    });
                }
            }
        }
        let owners = vec![0; boxes.len()];
        Ok(Self {
            geometry,
            boxes,
            owners,
            n_workers: 1,
        })
    }

    /// Chop the whole domain into boxes of at most `max_grid_size`
    /// cells per side.
    pub fn chop(geometry: Geometry, max_grid_size: usize) -> Result<Self, GridError> {
        if max_grid_size == 0 {
            return Err(GridError::ZeroGridSize);
        }
        let domain = geometry.domain();
        let mut cuts: [Vec<(i32, i32)>; 3] = Default::default();
        for (axis, axis_cuts) in cuts.iter_mut().enumerate() {
            let mut lo = domain.lo().get(axis);
            let hi = domain.hi().get(axis);
            while lo <= hi {
                let top = (lo + max_grid_size as i32 - 1).min(hi);
                axis_cuts.push((lo, top));
                lo = top + 1;
            }
        }
        let mut boxes = Vec::new();
        for &(zlo, zhi) in &cuts[2] {
            for &(ylo, yhi) in &cuts[1] {
                for &(xlo, xhi) in &cuts[0] {
                    boxes.push(IndexBox::new(
                        IntVect::new(xlo, ylo, zlo),
                        IntVect::new(xhi, yhi, zhi),
                    )?);
                }
            }
        }
        Self::new(geometry, boxes)
    }

    /// Assign boxes to `n_workers` workers round-robin.
    pub fn distribute(mut self, n_workers: usize) -> Result<Self, GridError> {
        if n_workers == 0 {
            return Err(GridError::NoWorkers);
        }
        for (i, owner) in self.owners.iter_mut().enumerate() {
            *owner = i % n_workers;
        }
        self.n_workers = n_workers;
        Ok(self)
    }

    /// Wrap in an `Arc` for sharing between fields.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Level geometry.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// All boxes, in global order.
    pub fn boxes(&self) -> &[IndexBox] {
        &self.boxes
    }

    /// Number of boxes on the level.
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Always `false`; layouts hold at least one box.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Number of workers the layout is distributed over.
    pub fn n_workers(&self) -> usize {
        self.n_workers
    }

    /// Owning worker of box `index`.
    pub fn owner(&self, index: usize) -> usize {
        self.owners[index]
    }

    /// Global indices of the boxes owned by `rank`.
    pub fn local_boxes(&self, rank: usize) -> Vec<usize> {
        self.owners
            .iter()
            .enumerate()
            .filter(|&(_, &o)| o == rank)
            .map(|(i, _)| i)
            .collect()
    }

    /// Total number of valid cells on the level.
    pub fn num_cells(&self) -> usize {
        self.boxes.iter().map(|b| b.num_cells()).sum()
    }
}
