//! Collaborator contracts for the incflow integrator.
//!
//! The integrator consumes its numerics through narrow traits:
//!
//! - [`OperatorEvaluator`]: convective and diffusive terms
//! - [`Forcing`]: explicit body forces
//! - [`Projection`]: pressure projection onto divergence-free velocity
//! - [`DiffusionSolver`]: implicit viscous update
//! - [`StabilityBound`]: stable step size from field maxima
//! - [`BoundaryFiller`]: halo and physical-boundary ghost cells
//!
//! Each call receives a [`SubStepContext`] describing the sub-step.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod collaborators;
pub mod context;
pub mod error;
pub mod stability;

pub use collaborators::{
    BoundaryFiller, DiffusionSolver, Forcing, OperatorEvaluator, OperatorInputs, Projection,
    ProjectionFields,
};
pub use context::SubStepContext;
pub use error::OpError;
pub use stability::{FieldExtrema, StabilityBound, StabilityInputs};
