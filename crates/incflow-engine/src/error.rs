//! Top-level error returned by an advance.

use incflow_core::SolverError;
use incflow_field::FieldError;
use incflow_grid::CommError;
use incflow_ops::OpError;
use thiserror::Error;

use crate::config::ConfigError;

/// Failure of a step.
///
/// Solver failures and invariant violations are fatal to the current
/// step. The fields are left in whatever state the failing sub-step
/// reached; no partial result is defined.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum StepError {
    /// The projection or diffusion solver failed.
    #[error("solver failure: {0}")]
    Solver(#[from] SolverError),
    /// A programming contract was broken, e.g. non-positive density in
    /// the momentum round trip.
    #[error("invariant violated: {0}")]
    Invariant(FieldError),
    /// A field operation was given incompatible arguments.
    #[error(transparent)]
    Field(FieldError),
    /// A collective reduction failed.
    #[error(transparent)]
    Comm(#[from] CommError),
    /// The advancer was configured inconsistently.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Steady-state mode hit `max_steady_iterations`.
    #[error("steady state not reached after {iterations} iterations")]
    SteadyStateNotReached {
        /// Iterations run.
        iterations: u64,
    },
    /// The chosen step size is not finite and positive.
    #[error("step size {dt} is not finite and positive")]
    UnboundedStep {
        /// The rejected step size.
        dt: f64,
    },
}

impl From<FieldError> for StepError {
    fn from(e: FieldError) -> Self {
        match e {
            FieldError::NonPositiveDivisor { .. } => Self::Invariant(e),
            FieldError::Comm(c) => Self::Comm(c),
            other => Self::Field(other),
        }
    }
}

impl From<OpError> for StepError {
    fn from(e: OpError) -> Self {
        match e {
            OpError::Solver(s) => Self::Solver(s),
            OpError::Field(f) => f.into(),
            OpError::Comm(c) => Self::Comm(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use incflow_grid::IntVect;

    #[test]
    fn non_positive_divisor_is_an_invariant_violation() {
        let e: StepError = FieldError::NonPositiveDivisor {
            field: "ro".into(),
            cell: IntVect::new(1, 2, 3),
            value: 0.0,
        }
        .into();
        assert!(matches!(e, StepError::Invariant(_)));

        let e: StepError = OpError::Field(FieldError::InvalidDef {
            reason: "x".into(),
        })
        .into();
        assert!(matches!(e, StepError::Field(_)));
    }

    #[test]
    fn solver_failure_passes_through() {
        let inner = SolverError::failed("mac", "singular");
        let e: StepError = OpError::Solver(inner.clone()).into();
        assert_eq!(e, StepError::Solver(inner));
        assert_eq!(e.to_string(), "solver failure: mac failed: singular");
    }

    #[test]
    fn halo_disconnect_is_a_comm_failure() {
        let lost = CommError::Disconnected { rank: 0, op: "recv" };
        let e: StepError = OpError::Field(FieldError::Comm(lost.clone())).into();
        assert_eq!(e, StepError::Comm(lost));
    }
}
