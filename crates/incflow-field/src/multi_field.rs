//! Multi-box, multi-component cell data with a uniform halo.
//!
//! A [`MultiField`] holds one [`FieldBox`] per box the worker owns.
//! Every operation acts on the valid region grown by a caller-chosen
//! ghost width `ng` (at most the allocated halo), and runs over the
//! worker's boxes with rayon. Each box reads and writes only its own
//! storage; halo cells must be filled beforehand.

use std::sync::Arc;

use incflow_core::FieldDef;
use incflow_grid::{BoxLayout, IndexBox, IntVect};
use rayon::prelude::*;

use crate::error::FieldError;

/// Storage for one box: the valid region plus its halo.
///
/// Components are stored one after another, each in x-fastest order
/// over the grown box.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldBox {
    index: usize,
    valid: IndexBox,
    grown: IndexBox,
    ncomp: usize,
    data: Vec<f64>,
}

impl FieldBox {
    fn new(index: usize, valid: IndexBox, nghost: usize, ncomp: usize) -> Self {
        let grown = valid.grow(nghost);
        Self {
            index,
            valid,
            grown,
            ncomp,
            data: vec![0.0; grown.num_cells() * ncomp],
        }
    }

    /// Global index of the box in the layout.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Valid (owned) cells.
    pub fn valid(&self) -> IndexBox {
        self.valid
    }

    /// Valid cells plus the full halo.
    pub fn grown(&self) -> IndexBox {
        self.grown
    }

    /// Number of components.
    pub fn ncomp(&self) -> usize {
        self.ncomp
    }

    /// Valid cells grown by `ng`.
    pub fn region(&self, ng: usize) -> IndexBox {
        self.valid.grow(ng)
    }

    #[inline]
    pub(crate) fn at(&self, iv: IntVect, comp: usize) -> usize {
        comp * self.grown.num_cells() + self.grown.offset(iv)
    }

    /// Value of component `comp` at cell `iv`.
    ///
    /// # Panics
    ///
    /// Panics if `iv` lies outside the grown box or `comp >= ncomp`.
    #[inline]
    pub fn get(&self, iv: IntVect, comp: usize) -> f64 {
        debug_assert!(self.grown.contains(iv), "{iv} outside {}", self.grown);
        self.data[self.at(iv, comp)]
    }

    /// Set component `comp` at cell `iv`.
    #[inline]
    pub fn set(&mut self, iv: IntVect, comp: usize, value: f64) {
        debug_assert!(self.grown.contains(iv), "{iv} outside {}", self.grown);
        let i = self.at(iv, comp);
        self.data[i] = value;
    }

    /// Raw storage of one component over the grown box.
    pub fn component(&self, comp: usize) -> &[f64] {
        let n = self.grown.num_cells();
        &self.data[comp * n..(comp + 1) * n]
    }
}

/// A field over all boxes a worker owns on one level.
#[derive(Clone, Debug)]
pub struct MultiField {
    name: String,
    layout: Arc<BoxLayout>,
    rank: usize,
    ncomp: usize,
    nghost: usize,
    boxes: Vec<FieldBox>,
}

impl MultiField {
    /// Allocate a zeroed field over the boxes `rank` owns.
    ///
    /// # Errors
    ///
    /// Fails if `ncomp` is zero or the halo is wider than a periodic
    /// axis of the domain.
    pub fn new(
        layout: Arc<BoxLayout>,
        rank: usize,
        ncomp: usize,
        nghost: usize,
        name: impl Into<String>,
    ) -> Result<Self, FieldError> {
        let name = name.into();
        if ncomp == 0 {
            return Err(FieldError::InvalidDef {
                reason: format!("field '{name}' has zero components"),
            });
        }
        layout.geometry().check_ghosts(nghost)?;
        let boxes = layout
            .local_boxes(rank)
            .into_iter()
            .map(|i| FieldBox::new(i, layout.boxes()[i], nghost, ncomp))
            .collect();
        Ok(Self {
            name,
            layout,
            rank,
            ncomp,
            nghost,
            boxes,
        })
    }

    /// Allocate from a descriptor.
    pub fn from_def(
        layout: Arc<BoxLayout>,
        rank: usize,
        def: &FieldDef,
    ) -> Result<Self, FieldError> {
        def.validate()
            .map_err(|reason| FieldError::InvalidDef { reason })?;
        Self::new(layout, rank, def.kind.components(), def.ghosts, def.name.clone())
    }

    /// A zeroed field with the same layout, components and halo.
    pub fn like(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layout: Arc::clone(&self.layout),
            rank: self.rank,
            ncomp: self.ncomp,
            nghost: self.nghost,
            boxes: self
                .boxes
                .iter()
                .map(|b| FieldBox::new(b.index, b.valid, self.nghost, self.ncomp))
                .collect(),
        }
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The level layout.
    pub fn layout(&self) -> &Arc<BoxLayout> {
        &self.layout
    }

    /// Owning worker.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of components.
    pub fn ncomp(&self) -> usize {
        self.ncomp
    }

    /// Allocated halo width.
    pub fn nghost(&self) -> usize {
        self.nghost
    }

    /// Locally owned boxes.
    pub fn boxes(&self) -> &[FieldBox] {
        &self.boxes
    }

    /// Locally owned boxes, mutable.
    pub fn boxes_mut(&mut self) -> &mut [FieldBox] {
        &mut self.boxes
    }

    /// Check that `ng` halo cells are allocated.
    pub fn check_ghost(&self, ng: usize) -> Result<(), FieldError> {
        if ng > self.nghost {
            return Err(FieldError::GhostWidth {
                field: self.name.clone(),
                requested: ng,
                available: self.nghost,
            });
        }
        Ok(())
    }

    /// Check that components `start..start + n` exist.
    pub fn check_comps(&self, start: usize, n: usize) -> Result<(), FieldError> {
        if start + n > self.ncomp {
            return Err(FieldError::ComponentOutOfRange {
                field: self.name.clone(),
                start,
                end: start + n,
                ncomp: self.ncomp,
            });
        }
        Ok(())
    }

    /// Check that `other` lives on the same layout and worker.
    pub fn ensure_same_layout(&self, other: &MultiField) -> Result<(), FieldError> {
        let same_layout =
            Arc::ptr_eq(&self.layout, &other.layout) || *self.layout == *other.layout;
        if !same_layout || self.rank != other.rank {
            return Err(FieldError::LayoutMismatch {
                field: self.name.clone(),
                other: other.name.clone(),
            });
        }
        Ok(())
    }

    fn check_source(
        &self,
        src: &MultiField,
        scomp: usize,
        dcomp: usize,
        ncomp: usize,
        ng: usize,
    ) -> Result<(), FieldError> {
        self.ensure_same_layout(src)?;
        self.check_comps(dcomp, ncomp)?;
        src.check_comps(scomp, ncomp)?;
        self.check_ghost(ng)?;
        src.check_ghost(ng)
    }

    /// Set every component of every cell, halo included.
    pub fn fill(&mut self, value: f64) {
        self.boxes.par_iter_mut().for_each(|b| b.data.fill(value));
    }

    /// Set `ncomp` components starting at `comp` over valid cells grown by `ng`.
    pub fn fill_comp(
        &mut self,
        comp: usize,
        ncomp: usize,
        value: f64,
        ng: usize,
    ) -> Result<(), FieldError> {
        self.check_comps(comp, ncomp)?;
        self.check_ghost(ng)?;
        self.boxes.par_iter_mut().for_each(|b| {
            for iv in b.region(ng).cells() {
                for n in comp..comp + ncomp {
                    b.set(iv, n, value);
                }
            }
        });
        Ok(())
    }

    /// Multiply components by `a`.
    pub fn scale(&mut self, a: f64, comp: usize, ncomp: usize, ng: usize) -> Result<(), FieldError> {
        self.check_comps(comp, ncomp)?;
        self.check_ghost(ng)?;
        self.boxes.par_iter_mut().for_each(|b| {
            for iv in b.region(ng).cells() {
                for n in comp..comp + ncomp {
                    let i = b.at(iv, n);
                    b.data[i] *= a;
                }
            }
        });
        Ok(())
    }

    /// `self[dcomp..] = src[scomp..]`.
    pub fn copy_from(
        &mut self,
        src: &MultiField,
        scomp: usize,
        dcomp: usize,
        ncomp: usize,
        ng: usize,
    ) -> Result<(), FieldError> {
        self.check_source(src, scomp, dcomp, ncomp, ng)?;
        self.boxes
            .par_iter_mut()
            .zip(src.boxes.par_iter())
            .for_each(|(d, s)| {
                for iv in d.region(ng).cells() {
                    for n in 0..ncomp {
                        let i = d.at(iv, dcomp + n);
                        d.data[i] = s.get(iv, scomp + n);
                    }
                }
            });
        Ok(())
    }

    /// `self[dcomp..] += a * x[xcomp..]`.
    pub fn saxpy(
        &mut self,
        a: f64,
        x: &MultiField,
        xcomp: usize,
        dcomp: usize,
        ncomp: usize,
        ng: usize,
    ) -> Result<(), FieldError> {
        self.check_source(x, xcomp, dcomp, ncomp, ng)?;
        self.boxes
            .par_iter_mut()
            .zip(x.boxes.par_iter())
            .for_each(|(d, s)| {
                for iv in d.region(ng).cells() {
                    for n in 0..ncomp {
                        let i = d.at(iv, dcomp + n);
                        d.data[i] += a * s.get(iv, xcomp + n);
                    }
                }
            });
        Ok(())
    }

    /// `self[dcomp..] = a * x[xcomp..] + b * y[ycomp..]`.
    #[allow(clippy::too_many_arguments)]
    pub fn lin_comb(
        &mut self,
        a: f64,
        x: &MultiField,
        xcomp: usize,
        b: f64,
        y: &MultiField,
        ycomp: usize,
        dcomp: usize,
        ncomp: usize,
        ng: usize,
    ) -> Result<(), FieldError> {
        self.check_source(x, xcomp, dcomp, ncomp, ng)?;
        self.check_source(y, ycomp, dcomp, ncomp, ng)?;
        self.boxes
            .par_iter_mut()
            .zip(x.boxes.par_iter())
            .zip(y.boxes.par_iter())
            .for_each(|((d, xb), yb)| {
                for iv in d.region(ng).cells() {
                    for n in 0..ncomp {
                        let i = d.at(iv, dcomp + n);
                        d.data[i] = a * xb.get(iv, xcomp + n) + b * yb.get(iv, ycomp + n);
                    }
                }
            });
        Ok(())
    }

    /// Multiply `ncomp` components starting at `dcomp` by the single
    /// component `scomp` of `src`.
    pub fn multiply_comp(
        &mut self,
        src: &MultiField,
        scomp: usize,
        dcomp: usize,
        ncomp: usize,
        ng: usize,
    ) -> Result<(), FieldError> {
        self.check_source(src, scomp, dcomp, ncomp.min(1), ng)?;
        self.check_comps(dcomp, ncomp)?;
        self.boxes
            .par_iter_mut()
            .zip(src.boxes.par_iter())
            .for_each(|(d, s)| {
                for iv in d.region(ng).cells() {
                    let factor = s.get(iv, scomp);
                    for n in dcomp..dcomp + ncomp {
                        let i = d.at(iv, n);
                        d.data[i] *= factor;
                    }
                }
            });
        Ok(())
    }

    /// Divide `ncomp` components starting at `dcomp` by the single
    /// component `scomp` of `src`.
    ///
    /// # Errors
    ///
    /// [`FieldError::NonPositiveDivisor`] if any divisor in the region is
    /// not finite and strictly positive. Nothing is written in that case.
    pub fn divide_comp(
        &mut self,
        src: &MultiField,
        scomp: usize,
        dcomp: usize,
        ncomp: usize,
        ng: usize,
    ) -> Result<(), FieldError> {
        self.check_source(src, scomp, dcomp, ncomp.min(1), ng)?;
        self.check_comps(dcomp, ncomp)?;
        src.check_positive(scomp, ng)?;
        self.boxes
            .par_iter_mut()
            .zip(src.boxes.par_iter())
            .for_each(|(d, s)| {
                for iv in d.region(ng).cells() {
                    let divisor = s.get(iv, scomp);
                    for n in dcomp..dcomp + ncomp {
                        let i = d.at(iv, n);
                        d.data[i] /= divisor;
                    }
                }
            });
        Ok(())
    }

    /// Check that component `comp` is finite and strictly positive over
    /// valid cells grown by `ng`.
    pub fn check_positive(&self, comp: usize, ng: usize) -> Result<(), FieldError> {
        self.check_comps(comp, 1)?;
        self.check_ghost(ng)?;
        let bad = self.boxes.par_iter().find_map_first(|b| {
            b.region(ng).cells().find_map(|iv| {
                let v = b.get(iv, comp);
                (!(v.is_finite() && v > 0.0)).then_some((iv, v))
            })
        });
        match bad {
            Some((cell, value)) => Err(FieldError::NonPositiveDivisor {
                field: self.name.clone(),
                cell,
                value,
            }),
            None => Ok(()),
        }
    }

    /// Maximum absolute value of component `comp` over local valid cells.
    pub fn local_norm0(&self, comp: usize) -> Result<f64, FieldError> {
        self.check_comps(comp, 1)?;
        Ok(self
            .boxes
            .par_iter()
            .map(|b| {
                b.valid
                    .cells()
                    .fold(0.0_f64, |m, iv| m.max(b.get(iv, comp).abs()))
            })
            .reduce(|| 0.0, f64::max))
    }

    /// Sum of absolute values of component `comp` over local valid cells.
    ///
    /// Per-box partial sums are added in box order.
    pub fn local_norm1(&self, comp: usize) -> Result<f64, FieldError> {
        self.check_comps(comp, 1)?;
        let partial: Vec<f64> = self
            .boxes
            .par_iter()
            .map(|b| b.valid.cells().map(|iv| b.get(iv, comp).abs()).sum::<f64>())
            .collect();
        Ok(partial.iter().sum())
    }

    /// Maximum of `|self - other|` for component `comp` over local valid cells.
    pub fn max_abs_diff(&self, other: &MultiField, comp: usize) -> Result<f64, FieldError> {
        self.check_source(other, comp, comp, 1, 0)?;
        Ok(self
            .boxes
            .par_iter()
            .zip(other.boxes.par_iter())
            .map(|(a, b)| {
                a.valid
                    .cells()
                    .fold(0.0_f64, |m, iv| m.max((a.get(iv, comp) - b.get(iv, comp)).abs()))
            })
            .reduce(|| 0.0, f64::max))
    }

    /// Sum of `|self - other|` for component `comp` over local valid cells.
    pub fn abs_diff_sum(&self, other: &MultiField, comp: usize) -> Result<f64, FieldError> {
        self.check_source(other, comp, comp, 1, 0)?;
        let partial: Vec<f64> = self
            .boxes
            .par_iter()
            .zip(other.boxes.par_iter())
            .map(|(a, b)| {
                a.valid
                    .cells()
                    .map(|iv| (a.get(iv, comp) - b.get(iv, comp)).abs())
                    .sum::<f64>()
            })
            .collect();
        Ok(partial.iter().sum())
    }

    /// Returns `true` if any of `ncomp` components from `comp` holds a
    /// NaN or infinity over valid cells grown by `ng`.
    pub fn contains_non_finite(
        &self,
        comp: usize,
        ncomp: usize,
        ng: usize,
    ) -> Result<bool, FieldError> {
        self.check_comps(comp, ncomp)?;
        self.check_ghost(ng)?;
        Ok(self.boxes.par_iter().any(|b| {
            b.region(ng)
                .cells()
                .any(|iv| (comp..comp + ncomp).any(|n| !b.get(iv, n).is_finite()))
        }))
    }

    /// Apply `f(cell, values)` to every local valid cell, writing the
    /// returned per-component values.
    ///
    /// Used by fixtures and reference kernels to initialise fields from
    /// analytic expressions.
    pub fn set_valid<F>(&mut self, f: F)
    where
        F: Fn(IntVect, usize) -> f64 + Sync,
    {
        let ncomp = self.ncomp;
        self.boxes.par_iter_mut().for_each(|b| {
            for iv in b.valid.cells() {
                for n in 0..ncomp {
                    b.set(iv, n, f(iv, n));
                }
            }
        });
    }
}
