//! Field-store error types.

use incflow_grid::{CommError, GridError, IntVect};
use thiserror::Error;

/// Errors that can occur during field allocation and field algebra.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum FieldError {
    /// Two fields in one operation live on different layouts or workers.
    #[error("field '{field}' and field '{other}' are not defined on the same layout")]
    LayoutMismatch {
        /// The destination field.
        field: String,
        /// The source field.
        other: String,
    },
    /// A component range extends past the field's component count.
    #[error("components {start}..{end} out of range for '{field}' with {ncomp} components")]
    ComponentOutOfRange {
        /// The field addressed.
        field: String,
        /// First requested component.
        start: usize,
        /// One past the last requested component.
        end: usize,
        /// Components allocated.
        ncomp: usize,
    },
    /// An operation asked for more halo cells than were allocated.
    #[error("ghost width {requested} exceeds the {available} allocated for '{field}'")]
    GhostWidth {
        /// The field addressed.
        field: String,
        /// Requested halo width.
        requested: usize,
        /// Allocated halo width.
        available: usize,
    },
    /// Division by a density (or other divisor) that is not strictly positive.
    #[error("non-positive divisor {value} in '{field}' at cell {cell}")]
    NonPositiveDivisor {
        /// The divisor field.
        field: String,
        /// First offending cell found.
        cell: IntVect,
        /// Offending value.
        value: f64,
    },
    /// A field descriptor failed validation.
    #[error("invalid field definition: {reason}")]
    InvalidDef {
        /// Validation message.
        reason: String,
    },
    /// A halo exchange was given a communicator for another worker group.
    #[error(
        "field '{field}' belongs to worker {rank} of {workers}, \
         communicator is worker {comm_rank} of {comm_size}"
    )]
    WorkerMismatch {
        /// The field addressed.
        field: String,
        /// Worker the field was allocated for.
        rank: usize,
        /// Workers the layout is distributed over.
        workers: usize,
        /// Rank of the communicator.
        comm_rank: usize,
        /// Size of the communicator's group.
        comm_size: usize,
    },
    /// A halo message to or from another worker failed.
    #[error(transparent)]
    Comm(#[from] CommError),
    /// Grid construction or geometry check failed.
    #[error(transparent)]
    Grid(#[from] GridError),
}
