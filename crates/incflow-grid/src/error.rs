//! Error types for grid construction and collective operations.

use thiserror::Error;

use crate::bc::Face;
use crate::index_box::{IndexBox, IntVect};

/// Errors arising from box, geometry, or layout construction.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GridError {
    /// A box has `hi < lo` on some axis.
    #[error("invalid box: lo {lo} exceeds hi {hi}")]
    InvalidBox {
        /// Lower corner.
        lo: IntVect,
        /// Upper corner.
        hi: IntVect,
    },
    /// A cell size is not finite and positive.
    #[error("cell size must be finite and positive, got {value} on axis {axis}")]
    InvalidCellSize {
        /// Offending axis.
        axis: usize,
        /// Offending value.
        value: f64,
    },
    /// A box extends outside the problem domain.
    #[error("box {bx} lies outside domain {domain}")]
    OutsideDomain {
        /// The offending box.
        bx: IndexBox,
        /// The level domain.
        domain: IndexBox,
    },
    /// Two boxes of a layout share cells.
    #[error("boxes {first} and {second} overlap")]
    Overlap {
        /// Index of the first box.
        first: usize,
        /// Index of the second box.
        second: usize,
    },
    /// A layout was built with no boxes.
    #[error("layout has no boxes")]
    EmptyLayout,
    /// Worker count is zero.
    #[error("worker count must be at least 1")]
    NoWorkers,
    /// Maximum grid size is zero.
    #[error("max_grid_size must be at least 1")]
    ZeroGridSize,
    /// Halo wider than a periodic domain length.
    #[error("ghost width {ghosts} exceeds periodic domain length {length} on axis {axis}")]
    GhostTooWide {
        /// Requested halo width.
        ghosts: usize,
        /// Axis on which the domain is too short.
        axis: usize,
        /// Domain length on that axis.
        length: usize,
    },
    /// Boundary table disagrees with the geometry's periodicity.
    #[error("face {face:?} periodicity does not match geometry")]
    PeriodicityMismatch {
        /// The inconsistent face.
        face: Face,
    },
}

/// Failure of a collective or point-to-point operation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CommError {
    /// A peer hung up before the collective completed.
    #[error("worker {rank} disconnected during {op}")]
    Disconnected {
        /// Rank that observed the disconnect.
        rank: usize,
        /// Name of the collective.
        op: &'static str,
    },
    /// A message named a rank outside the group, or the sender itself.
    #[error("worker {rank} has no peer {peer}")]
    NoPeer {
        /// Rank that issued the operation.
        rank: usize,
        /// Requested peer.
        peer: usize,
    },
    /// A message did not have the length the receiver expected.
    #[error("worker {rank} expected {expected} values from worker {peer}, got {found}")]
    MessageSize {
        /// Receiving rank.
        rank: usize,
        /// Sending rank.
        peer: usize,
        /// Expected number of values.
        expected: usize,
        /// Number of values received.
        found: usize,
    },
}
