//! Collaborator error type and solver statistics.
//!
//! The projection and implicit-diffusion solvers are external to the
//! integrator. Their failures are fatal to the current step and must
//! propagate out unchanged; [`SolverError`] is the shared currency.

use thiserror::Error;

/// Failure reported by an external solver or operator collaborator.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SolverError {
    /// The iterative solve hit its iteration cap above tolerance.
    #[error("{solver} did not converge after {iterations} iterations (residual {residual:e})")]
    NotConverged {
        /// Collaborator name.
        solver: String,
        /// Iterations performed.
        iterations: usize,
        /// Final residual norm.
        residual: f64,
    },
    /// The collaborator failed for a reason other than convergence.
    #[error("{solver} failed: {reason}")]
    Failed {
        /// Collaborator name.
        solver: String,
        /// Human-readable description.
        reason: String,
    },
}

impl SolverError {
    /// Convenience constructor for [`SolverError::Failed`].
    pub fn failed(solver: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            solver: solver.into(),
            reason: reason.into(),
        }
    }

    /// Name of the collaborator that failed.
    pub fn solver(&self) -> &str {
        match self {
            Self::NotConverged { solver, .. } | Self::Failed { solver, .. } => solver,
        }
    }
}

/// Work done by one successful solve.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SolverStats {
    /// Iterations performed.
    pub iterations: usize,
    /// Final residual norm.
    pub residual: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_converged_message() {
        let e = SolverError::NotConverged {
            solver: "jacobi".into(),
            iterations: 50,
            residual: 1.5e-3,
        };
        let msg = e.to_string();
        assert!(msg.contains("jacobi"));
        assert!(msg.contains("50 iterations"));
        assert_eq!(e.solver(), "jacobi");
    }

    #[test]
    fn failed_constructor() {
        let e = SolverError::failed("mac", "singular matrix");
        assert_eq!(e.to_string(), "mac failed: singular matrix");
    }
}
