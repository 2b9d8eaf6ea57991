//! Field roles and descriptors.

use std::fmt;

/// Classification of a field's per-cell data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// A single value per cell.
    Scalar,
    /// A fixed-size vector per cell (3 for velocity and gradients).
    Vector {
        /// Number of components.
        dims: usize,
    },
}

impl FieldKind {
    /// Number of storage components per cell.
    pub fn components(&self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vector { dims } => *dims,
        }
    }
}

/// The role a field plays in the integrator's state.
///
/// Every role is allocated exactly once per level; no two roles alias
/// the same storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldRole {
    /// Cell velocity, 3 components.
    Velocity,
    /// Projection variable.
    Pressure,
    /// Fluid density. Read-only to the integrator.
    Density,
    /// Dynamic viscosity. Read-only to the integrator.
    Viscosity,
    /// Gradient of the current pressure, refreshed by every projection.
    PressureGradient,
    /// Lagged background pressure gradient, constant within a step.
    BasePressureGradient,
}

impl FieldRole {
    /// All roles in allocation order.
    pub const ALL: [FieldRole; 6] = [
        FieldRole::Velocity,
        FieldRole::Pressure,
        FieldRole::Density,
        FieldRole::Viscosity,
        FieldRole::PressureGradient,
        FieldRole::BasePressureGradient,
    ];

    /// Data kind for this role.
    pub fn kind(self) -> FieldKind {
        match self {
            Self::Velocity | Self::PressureGradient | Self::BasePressureGradient => {
                FieldKind::Vector { dims: 3 }
            }
            Self::Pressure | Self::Density | Self::Viscosity => FieldKind::Scalar,
        }
    }

    /// Short name used in logs and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Velocity => "vel",
            Self::Pressure => "p",
            Self::Density => "ro",
            Self::Viscosity => "mu",
            Self::PressureGradient => "gp",
            Self::BasePressureGradient => "gp0",
        }
    }
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Allocation request for one field on a level.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    /// Human-readable name for logging.
    pub name: String,
    /// Data kind and component count.
    pub kind: FieldKind,
    /// Halo width in cells on every side.
    pub ghosts: usize,
}

impl FieldDef {
    /// Descriptor for a role with the given halo width.
    pub fn for_role(role: FieldRole, ghosts: usize) -> Self {
        Self {
            name: role.name().to_string(),
            kind: role.kind(),
            ghosts,
        }
    }

    /// Check structural invariants.
    ///
    /// Vector fields need at least one component.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("field name must not be empty".to_string());
        }
        if self.kind.components() == 0 {
            return Err(format!("field '{}' has zero components", self.name));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_kinds() {
        assert_eq!(FieldRole::Velocity.kind().components(), 3);
        assert_eq!(FieldRole::Pressure.kind().components(), 1);
        assert_eq!(FieldRole::BasePressureGradient.kind().components(), 3);
        assert_eq!(FieldRole::Viscosity.kind(), FieldKind::Scalar);
    }

    #[test]
    fn role_names_are_unique() {
        let mut names: Vec<&str> = FieldRole::ALL.iter().map(|r| r.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FieldRole::ALL.len());
    }

    #[test]
    fn def_validation() {
        assert!(FieldDef::for_role(FieldRole::Density, 1).validate().is_ok());
        let bad = FieldDef {
            name: "empty".into(),
            kind: FieldKind::Vector { dims: 0 },
            ghosts: 0,
        };
        assert!(bad.validate().unwrap_err().contains("zero components"));
    }
}
