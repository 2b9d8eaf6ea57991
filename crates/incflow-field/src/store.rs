//! The live fields of a level and the previous-step snapshot.

use std::sync::Arc;

use incflow_core::{FieldDef, FieldRole};
use incflow_grid::BoxLayout;

use crate::error::FieldError;
use crate::multi_field::MultiField;

/// Mutable state the integrator advances.
///
/// Density and viscosity are read-only to the integrator; they are
/// mutated by the surrounding physics.
#[derive(Clone, Debug)]
pub struct LevelFields {
    /// Cell velocity, 3 components.
    pub vel: MultiField,
    /// Projection variable.
    pub p: MultiField,
    /// Density.
    pub ro: MultiField,
    /// Dynamic viscosity.
    pub mu: MultiField,
    /// Current pressure gradient, 3 components.
    pub gp: MultiField,
    /// Background pressure gradient, 3 components.
    pub gp0: MultiField,
}

impl LevelFields {
    /// The field playing `role`.
    pub fn get(&self, role: FieldRole) -> &MultiField {
        match role {
            FieldRole::Velocity => &self.vel,
            FieldRole::Pressure => &self.p,
            FieldRole::Density => &self.ro,
            FieldRole::Viscosity => &self.mu,
            FieldRole::PressureGradient => &self.gp,
            FieldRole::BasePressureGradient => &self.gp0,
        }
    }

    /// The field playing `role`, mutable.
    pub fn get_mut(&mut self, role: FieldRole) -> &mut MultiField {
        match role {
            FieldRole::Velocity => &mut self.vel,
            FieldRole::Pressure => &mut self.p,
            FieldRole::Density => &mut self.ro,
            FieldRole::Viscosity => &mut self.mu,
            FieldRole::PressureGradient => &mut self.gp,
            FieldRole::BasePressureGradient => &mut self.gp0,
        }
    }
}

/// Copy of velocity, pressure and density taken before the predictor.
///
/// Read by both sub-steps and by the steady-state test; overwritten at
/// the start of the next outer-loop iteration.
#[derive(Clone, Debug)]
pub struct OldStateSnapshot {
    vel: MultiField,
    p: MultiField,
    ro: MultiField,
}

impl OldStateSnapshot {
    /// Old-time velocity.
    pub fn vel(&self) -> &MultiField {
        &self.vel
    }

    /// Old-time pressure.
    pub fn p(&self) -> &MultiField {
        &self.p
    }

    /// Old-time density.
    pub fn ro(&self) -> &MultiField {
        &self.ro
    }
}

/// All fields of one level: live state plus the old-state snapshot.
#[derive(Clone, Debug)]
pub struct FieldStore {
    /// Live state.
    pub live: LevelFields,
    old: OldStateSnapshot,
}

impl FieldStore {
    /// Allocate every role, zeroed, with a halo of `nghost` cells.
    pub fn new(layout: Arc<BoxLayout>, rank: usize, nghost: usize) -> Result<Self, FieldError> {
        let alloc = |role: FieldRole| {
            MultiField::from_def(Arc::clone(&layout), rank, &FieldDef::for_role(role, nghost))
        };
        let live = LevelFields {
            vel: alloc(FieldRole::Velocity)?,
            p: alloc(FieldRole::Pressure)?,
            ro: alloc(FieldRole::Density)?,
            mu: alloc(FieldRole::Viscosity)?,
            gp: alloc(FieldRole::PressureGradient)?,
            gp0: alloc(FieldRole::BasePressureGradient)?,
        };
        let old = OldStateSnapshot {
            vel: live.vel.like("vel_o"),
            p: live.p.like("p_o"),
            ro: live.ro.like("ro_o"),
        };
        Ok(Self { live, old })
    }

    /// The previous-step snapshot.
    pub fn old(&self) -> &OldStateSnapshot {
        &self.old
    }

    /// Live fields and the snapshot, borrowed together.
    pub fn split(&mut self) -> (&mut LevelFields, &OldStateSnapshot) {
        (&mut self.live, &self.old)
    }

    /// Overwrite the snapshot with the live velocity, pressure and
    /// density, halo included.
    pub fn snapshot_old(&mut self) -> Result<(), FieldError> {
        let live = &self.live;
        let old = &mut self.old;
        old.vel.copy_from(&live.vel, 0, 0, 3, live.vel.nghost())?;
        old.p.copy_from(&live.p, 0, 0, 1, live.p.nghost())?;
        old.ro.copy_from(&live.ro, 0, 0, 1, live.ro.nghost())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use incflow_grid::Geometry;

    fn store() -> FieldStore {
        let g = Geometry::periodic_cube(4).unwrap();
        let layout = BoxLayout::chop(g, 2).unwrap().into_shared();
        FieldStore::new(layout, 0, 1).unwrap()
    }

    #[test]
    fn roles_map_to_distinct_fields() {
        let s = store();
        for role in FieldRole::ALL {
            assert_eq!(s.live.get(role).name(), role.name());
            assert_eq!(s.live.get(role).ncomp(), role.kind().components());
        }
    }

    #[test]
    fn snapshot_copies_halo_too() {
        let mut s = store();
        s.live.vel.fill(2.0);
        s.live.p.fill(-1.0);
        s.live.ro.fill(1.2);
        s.snapshot_old().unwrap();
        let b = &s.old().vel().boxes()[0];
        assert_eq!(b.get(b.grown().lo(), 2), 2.0);
        let b = &s.old().ro().boxes()[0];
        assert_eq!(b.get(b.grown().hi(), 0), 1.2);
    }

    #[test]
    fn snapshot_is_overwritten_not_accumulated() {
        let mut s = store();
        s.live.p.fill(5.0);
        s.snapshot_old().unwrap();
        s.live.p.fill(3.0);
        s.snapshot_old().unwrap();
        assert_eq!(s.old().p().local_norm0(0).unwrap(), 3.0);
    }
}
