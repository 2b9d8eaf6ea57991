//! Field store for the incflow integrator.
//!
//! [`MultiField`] is cell data over the boxes one worker owns, with a
//! uniform halo and a small algebra (`saxpy`, `lin_comb`,
//! `multiply_comp`, checked `divide_comp`, norms). [`FieldStore`] holds
//! the live level state and the [`OldStateSnapshot`] taken before each
//! predictor. Halos are refreshed between boxes with [`exchange_halos`]
//! ([`fill_boundary`] when one worker owns every box) and with
//! [`fill_scalar_bc`] / [`fill_velocity_bc`] on physical faces.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bc_fill;
pub mod error;
pub mod halo;
pub mod multi_field;
pub mod store;
pub mod terms;

pub use bc_fill::{fill_scalar_bc, fill_velocity_bc};
pub use error::FieldError;
pub use halo::{exchange_halos, fill_boundary};
pub use multi_field::{FieldBox, MultiField};
pub use store::{FieldStore, LevelFields, OldStateSnapshot};
pub use terms::ExplicitTerms;
