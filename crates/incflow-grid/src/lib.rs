//! Grid plumbing for the incflow integrator.
//!
//! A level is described by a [`Geometry`] (domain box, cell size,
//! periodicity) and partitioned into a [`BoxLayout`] of non-overlapping
//! [`IndexBox`]es, each owned by exactly one worker. Workers agree on
//! global quantities through a [`Communicator`]. Physical boundaries are
//! described per face by a [`BcTable`].
//!
//! # Collectives
//!
//! - [`LocalComm`]: single worker, reductions are the identity
//! - [`ChannelComm`]: a group of worker threads connected by channels

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bc;
pub mod comm;
pub mod error;
pub mod geometry;
pub mod index_box;
pub mod layout;

pub use bc::{BcKind, BcTable, Face, FaceBc, ScalarKind};
pub use comm::{ChannelComm, Communicator, LocalComm};
pub use error::{CommError, GridError};
pub use geometry::Geometry;
pub use index_box::{IndexBox, IntVect};
pub use layout::BoxLayout;
