//! Predictor-corrector fractional-step integrator for incflow.
//!
//! [`Advancer`] drives one level through an externally requested step,
//! or repeats steps until the steady-state test passes:
//!
//! - [`StepSizeController`]: stable `dt` from global field extrema,
//!   with an optional fixed step that is warned about but kept
//! - [`apply_predictor`] / [`apply_corrector`]: term assembly, forcing,
//!   the momentum round trip, optional implicit diffusion, projection
//! - [`SteadyStateMonitor`]: dual convergence criteria with a
//!   first-iteration guard
//! - [`print_max_vel`] / [`check_for_nans`]: observability only
//!
//! The numerics are supplied as [`Collaborators`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod advance;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod integrator;
pub mod metrics;
pub mod steady;
pub mod step_size;

pub use advance::{AdvanceOutcome, Advancer, StepClock};
pub use config::{AdvanceConfig, AdvanceConfigBuilder, ConfigError};
pub use diagnostics::{check_for_nans, print_max_vel, ExtremaReport, NanReport};
pub use error::StepError;
pub use integrator::{
    apply_corrector, apply_predictor, momentum_round_trip, Collaborators, SubStepReport,
};
pub use metrics::AdvanceMetrics;
pub use steady::{SteadyCheck, SteadyMetrics, SteadyNorms, SteadyStateMonitor, L1_FLOOR};
pub use step_size::{choose_dt, gather_extrema, DtDecision, StepSizeController};
