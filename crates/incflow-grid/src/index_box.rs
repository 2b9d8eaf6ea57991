//! Integer cell coordinates and inclusive index boxes.

use std::fmt;
use std::ops::{Add, Neg, Sub};

use crate::error::GridError;

/// A 3D integer cell coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntVect(pub [i32; 3]);

impl IntVect {
    /// The origin.
    pub const ZERO: IntVect = IntVect([0, 0, 0]);

    /// Construct from three coordinates.
    pub const fn new(i: i32, j: i32, k: i32) -> Self {
        Self([i, j, k])
    }

    /// Coordinate along `axis` (0, 1, or 2).
    pub fn get(self, axis: usize) -> i32 {
        self.0[axis]
    }

    /// Copy with the coordinate along `axis` replaced.
    pub fn with(mut self, axis: usize, value: i32) -> Self {
        self.0[axis] = value;
        self
    }

    /// Unit vector along `axis` scaled by `n`.
    pub fn unit(axis: usize, n: i32) -> Self {
        Self::ZERO.with(axis, n)
    }

    /// Returns `true` if every coordinate is zero.
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

impl Add for IntVect {
    type Output = IntVect;
    fn add(self, rhs: IntVect) -> IntVect {
        IntVect([self.0[0] + rhs.0[0], self.0[1] + rhs.0[1], self.0[2] + rhs.0[2]])
    }
}

impl Sub for IntVect {
    type Output = IntVect;
    fn sub(self, rhs: IntVect) -> IntVect {
        IntVect([self.0[0] - rhs.0[0], self.0[1] - rhs.0[1], self.0[2] - rhs.0[2]])
    }
}

impl Neg for IntVect {
    type Output = IntVect;
    fn neg(self) -> IntVect {
        IntVect([-self.0[0], -self.0[1], -self.0[2]])
    }
}

impl fmt::Display for IntVect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.0[0], self.0[1], self.0[2])
    }
}

/// An axis-aligned box of cells with inclusive bounds.
///
/// A box is never empty: construction rejects `hi < lo` on any axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndexBox {
    lo: IntVect,
    hi: IntVect,
}

impl IndexBox {
    /// Create a box spanning `lo..=hi`.
    pub fn new(lo: IntVect, hi: IntVect) -> Result<Self, GridError> {
        if (0..3).any(|d| hi.get(d) < lo.get(d)) {
            return Err(GridError::InvalidBox { lo, hi });
        }
        Ok(Self { lo, hi })
    }

    /// Box of `n[d]` cells per axis starting at the origin.
    pub fn from_extent(n: [usize; 3]) -> Result<Self, GridError> {
        let hi = IntVect::new(n[0] as i32 - 1, n[1] as i32 - 1, n[2] as i32 - 1);
        Self::new(IntVect::ZERO, hi)
    }

    /// Lower corner (inclusive).
    pub fn lo(&self) -> IntVect {
        self.lo
    }

    /// Upper corner (inclusive).
    pub fn hi(&self) -> IntVect {
        self.hi
    }

    /// Number of cells along `axis`.
    pub fn length(&self, axis: usize) -> usize {
        (self.hi.get(axis) - self.lo.get(axis) + 1) as usize
    }

    /// Cell counts along all three axes.
    pub fn extent(&self) -> [usize; 3] {
        [self.length(0), self.length(1), self.length(2)]
    }

    /// Total number of cells.
    pub fn num_cells(&self) -> usize {
        self.length(0) * self.length(1) * self.length(2)
    }

    /// Returns `true` if `iv` lies inside the box.
    pub fn contains(&self, iv: IntVect) -> bool {
        (0..3).all(|d| iv.get(d) >= self.lo.get(d) && iv.get(d) <= self.hi.get(d))
    }

    /// Returns `true` if `other` lies entirely inside this box.
    pub fn contains_box(&self, other: &IndexBox) -> bool {
        self.contains(other.lo) && self.contains(other.hi)
    }

    /// Grow by `n` cells on every side.
    pub fn grow(&self, n: usize) -> IndexBox {
        let n = n as i32;
        IndexBox {
            lo: self.lo - IntVect::new(n, n, n),
            hi: self.hi + IntVect::new(n, n, n),
        }
    }

    /// Translate by `offset`.
    pub fn shift(&self, offset: IntVect) -> IndexBox {
        IndexBox {
            lo: self.lo + offset,
            hi: self.hi + offset,
        }
    }

    /// Overlap with `other`, if any.
    pub fn intersect(&self, other: &IndexBox) -> Option<IndexBox> {
        let mut lo = [0; 3];
        let mut hi = [0; 3];
        for d in 0..3 {
            lo[d] = self.lo.get(d).max(other.lo.get(d));
            hi[d] = self.hi.get(d).min(other.hi.get(d));
            if hi[d] < lo[d] {
                return None;
            }
        }
        Some(IndexBox {
            lo: IntVect(lo),
            hi: IntVect(hi),
        })
    }

    /// Returns `true` if the two boxes share at least one cell.
    pub fn intersects(&self, other: &IndexBox) -> bool {
        self.intersect(other).is_some()
    }

    /// Slab of this box restricted to `lo..=hi` along `axis`.
    ///
    /// Returns `None` if the slab lies outside the box.
    pub fn slab(&self, axis: usize, lo: i32, hi: i32) -> Option<IndexBox> {
        let slab = IndexBox {
            lo: self.lo.with(axis, lo),
            hi: self.hi.with(axis, hi),
        };
        if hi < lo {
            return None;
        }
        self.intersect(&slab)
    }

    /// Flat offset of `iv` within the box, x fastest.
    ///
    /// The caller guarantees `self.contains(iv)`.
    pub fn offset(&self, iv: IntVect) -> usize {
        let nx = self.length(0);
        let ny = self.length(1);
        let i = (iv.get(0) - self.lo.get(0)) as usize;
        let j = (iv.get(1) - self.lo.get(1)) as usize;
        let k = (iv.get(2) - self.lo.get(2)) as usize;
        (k * ny + j) * nx + i
    }

    /// Iterate over all cells, x fastest.
    pub fn cells(&self) -> Cells {
        Cells {
            bx: *self,
            next: Some(self.lo),
        }
    }
}

impl fmt::Display for IndexBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.lo, self.hi)
    }
}

/// Iterator over the cells of an [`IndexBox`].
pub struct Cells {
    bx: IndexBox,
    next: Option<IntVect>,
}

impl Iterator for Cells {
    type Item = IntVect;

    fn next(&mut self) -> Option<IntVect> {
        let current = self.next?;
        let mut n = current;
        n.0[0] += 1;
        if n.0[0] > self.bx.hi.0[0] {
            n.0[0] = self.bx.lo.0[0];
            n.0[1] += 1;
            if n.0[1] > self.bx.hi.0[1] {
                n.0[1] = self.bx.lo.0[1];
                n.0[2] += 1;
            }
        }
        self.next = if n.0[2] > self.bx.hi.0[2] { None } else { Some(n) };
        Some(current)
    }
}
