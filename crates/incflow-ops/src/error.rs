//! Collaborator error type.

use incflow_core::SolverError;
use incflow_field::FieldError;
use incflow_grid::CommError;
use thiserror::Error;

/// Failure reported by a collaborator.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum OpError {
    /// An inner solver failed or did not converge.
    #[error(transparent)]
    Solver(#[from] SolverError),
    /// A field operation was rejected.
    #[error(transparent)]
    Field(#[from] FieldError),
    /// A collective reduction failed.
    #[error(transparent)]
    Comm(#[from] CommError),
}
