//! Boundary filler backed by a static [`BcTable`].

use incflow_field::{exchange_halos, fill_scalar_bc, fill_velocity_bc, MultiField};
use incflow_grid::{BcTable, Communicator, ScalarKind};
use incflow_ops::{BoundaryFiller, OpError};

/// Halo exchange followed by time-independent physical-face values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableBoundary {
    bc: BcTable,
}

impl TableBoundary {
    /// Filler for `bc`.
    pub fn new(bc: BcTable) -> Self {
        Self { bc }
    }

    /// The face table.
    pub fn table(&self) -> &BcTable {
        &self.bc
    }
}

impl BoundaryFiller for TableBoundary {
    fn fill_velocity(
        &self,
        vel: &mut MultiField,
        comm: &dyn Communicator,
        _time: f64,
    ) -> Result<(), OpError> {
        exchange_halos(vel, comm)?;
        fill_velocity_bc(vel, &self.bc)?;
        Ok(())
    }

    fn fill_scalar(
        &self,
        field: &mut MultiField,
        kind: ScalarKind,
        comm: &dyn Communicator,
        _time: f64,
    ) -> Result<(), OpError> {
        exchange_halos(field, comm)?;
        fill_scalar_bc(field, 0, kind, &self.bc)?;
        Ok(())
    }
}
