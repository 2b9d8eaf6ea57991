//! incflow: a predictor-corrector fractional-step integrator for
//! variable-density incompressible flow on block-structured grids.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all incflow sub-crates. For most users, adding `incflow` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use incflow::prelude::*;
//!
//! // An 8^3 periodic box holding a uniform stream.
//! let geom = Geometry::periodic_cube(8).unwrap();
//! let layout = BoxLayout::chop(geom, 4).unwrap().into_shared();
//! let mut store = FieldStore::new(layout, 0, 1).unwrap();
//! store.live.vel.fill_comp(0, 1, 1.0, 1).unwrap();
//! store.live.ro.fill(1.0);
//!
//! let collab = Collaborators::new(
//!     Box::new(CentralOperators),
//!     Box::new(JacobiProjection::new(JacobiConfig::default()).unwrap()),
//!     Box::new(TableBoundary::new(BcTable::periodic())),
//! );
//! let config = AdvanceConfig::builder().cfl(0.5).build().unwrap();
//! let mut advancer = Advancer::new(
//!     config,
//!     collab,
//!     Box::new(CflBound::default()),
//!     Box::new(LocalComm),
//! )
//! .unwrap();
//!
//! let mut clock = StepClock::new(0.0, -1.0);
//! let outcome = advancer.advance(&mut store, &mut clock).unwrap();
//! clock.finish_step();
//!
//! // |u| / dx = 8, so dt = 0.5 / 8
//! assert_eq!(outcome.dt, 0.0625);
//! assert_eq!(clock.nstep, StepIndex(1));
//! assert!(outcome.nans.is_clean());
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `incflow-core` | Identifiers, field descriptors, solver errors |
//! | [`grid`] | `incflow-grid` | Boxes, geometry, layouts, communicators, BC tables |
//! | [`field`] | `incflow-field` | Multi-box fields, halo exchange, the field store |
//! | [`ops`] | `incflow-ops` | Collaborator traits and the sub-step context |
//! | [`reference`] | `incflow-reference` | Reference operators, solvers, forcing, CFL bound |
//! | [`engine`] | `incflow-engine` | Step size, integrator, steady state, outer loop |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Identifiers, field descriptors and solver errors (`incflow-core`).
pub use incflow_core as types;

/// Index boxes, geometry, box layouts, collectives and boundary tables
/// (`incflow-grid`).
///
/// [`grid::LocalComm`] serves a single worker; [`grid::ChannelComm`]
/// connects in-process workers.
pub use incflow_grid as grid;

/// Fields and the field store (`incflow-field`).
pub use incflow_field as field;

/// Collaborator contracts (`incflow-ops`).
///
/// Implement [`ops::OperatorEvaluator`], [`ops::Projection`] and friends
/// to plug a numerical backend into the integrator.
pub use incflow_ops as ops;

/// Reference collaborators (`incflow-reference`).
pub use incflow_reference as reference;

/// The integrator and its outer loop (`incflow-engine`).
///
/// [`engine::Advancer`] drives one step, or iterates to steady state.
pub use incflow_engine as engine;

/// Common imports for typical incflow usage.
///
/// ```rust
/// use incflow::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use incflow_core::{Component, IterationCount, SolverError, SolverStats, StepIndex, SubStep};

    // Grid
    pub use incflow_grid::{
        BcKind, BcTable, BoxLayout, ChannelComm, Communicator, Face, FaceBc, Geometry, IndexBox,
        IntVect, LocalComm, ScalarKind,
    };

    // Fields
    pub use incflow_field::{
        exchange_halos, fill_boundary, FieldError, FieldStore, LevelFields, MultiField,
    };

    // Collaborator contracts
    pub use incflow_ops::{
        BoundaryFiller, DiffusionSolver, Forcing, OpError, OperatorEvaluator, OperatorInputs,
        Projection, ProjectionFields, StabilityBound, SubStepContext,
    };

    // Reference collaborators
    pub use incflow_reference::{
        ActuatorDisk, CentralOperators, CflBound, ForcingSet, ForcingTerm, JacobiConfig,
        JacobiDiffusion, JacobiProjection, TableBoundary,
    };

    // Engine
    pub use incflow_engine::{
        AdvanceConfig, AdvanceMetrics, AdvanceOutcome, Advancer, Collaborators, ConfigError,
        StepClock, StepError,
    };
}
