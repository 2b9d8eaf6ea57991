//! Core types for the incflow incompressible-flow integrator.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the rest of the workspace: velocity
//! component and iteration identifiers, field roles and descriptors,
//! and the collaborator error type.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod field;
pub mod id;

pub use error::{SolverError, SolverStats};
pub use field::{FieldDef, FieldKind, FieldRole};
pub use id::{Component, IterationCount, StepIndex, SubStep};
