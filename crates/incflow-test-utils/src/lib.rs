//! Test utilities and mock collaborators for incflow development.
//!
//! [`mocks`] holds collaborator doubles (constant, recording, failing);
//! [`fixtures`] builds periodic field stores and seeded random fields.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::{init_logging, periodic_layout, random_velocity, uniform_store, UniformState};
pub use mocks::{
    CallLog, ConstantForcing, ConstantOperators, FailingDiffusion, FailingProjection, FixedBound,
    IdentityDiffusion, IdentityProjection, LinearDampingOperators, PeriodicBoundary,
};
