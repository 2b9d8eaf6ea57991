//! Reference numerics for the incflow integrator.
//!
//! Implementations of the collaborator traits in `incflow-ops`, usable
//! on uniform cell-centred grids:
//!
//! - [`CentralOperators`]: second-order convection and viscous stress
//! - [`JacobiProjection`]: variable-density approximate projection
//! - [`JacobiDiffusion`]: backward-Euler viscous solve
//! - [`ForcingSet`]: gravity, body force and [`ActuatorDisk`] thrust
//! - [`CflBound`]: convective, viscous and body-force step limit
//! - [`TableBoundary`]: halo exchange plus [`incflow_grid::BcTable`] faces
//!
//! The solvers are plain Jacobi iterations. They favour clarity over
//! speed and are meant for tests, small runs and as a template for
//! production backends.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod actuator_disk;
pub mod boundary;
pub mod diffusion;
pub mod forcing;
pub mod operators;
pub mod projection;
pub mod stability;
mod stencil;

pub use actuator_disk::{ActuatorDisk, ActuatorDiskBuilder, DiskThrust};
pub use boundary::TableBoundary;
pub use diffusion::JacobiDiffusion;
pub use forcing::{ForcingSet, ForcingTerm};
pub use operators::CentralOperators;
pub use projection::{JacobiConfig, JacobiProjection};
pub use stability::CflBound;
