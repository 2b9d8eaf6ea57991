//! Per-face physical boundary conditions.
//!
//! A [`BcTable`] holds one [`FaceBc`] for each of the six domain faces.
//! Faces on periodic axes must be [`BcKind::Periodic`]; every other
//! face carries a physical condition plus the prescribed values used
//! when the condition is of Dirichlet type.

use std::fmt;

use crate::error::GridError;
use crate::geometry::Geometry;

/// One of the six domain faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Face {
    /// Low x face.
    XLo,
    /// High x face.
    XHi,
    /// Low y face.
    YLo,
    /// High y face.
    YHi,
    /// Low z face.
    ZLo,
    /// High z face.
    ZHi,
}

impl Face {
    /// All faces, in table order.
    pub const ALL: [Face; 6] = [
        Face::XLo,
        Face::XHi,
        Face::YLo,
        Face::YHi,
        Face::ZLo,
        Face::ZHi,
    ];

    /// Normal axis of the face.
    pub fn axis(self) -> usize {
        self.index() / 2
    }

    /// Returns `true` for the low face on its axis.
    pub fn is_low(self) -> bool {
        self.index() % 2 == 0
    }

    /// Position in [`Face::ALL`].
    pub fn index(self) -> usize {
        match self {
            Face::XLo => 0,
            Face::XHi => 1,
            Face::YLo => 2,
            Face::YHi => 3,
            Face::ZLo => 4,
            Face::ZHi => 5,
        }
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Face::XLo => "xlo",
            Face::XHi => "xhi",
            Face::YLo => "ylo",
            Face::YHi => "yhi",
            Face::ZLo => "zlo",
            Face::ZHi => "zhi",
        };
        f.write_str(s)
    }
}

/// Physical boundary condition kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BcKind {
    /// Wraps around to the opposite face.
    #[default]
    Periodic,
    /// Solid wall, zero velocity.
    NoSlipWall,
    /// Prescribed inflow velocity, density and tracer.
    MassInflow,
    /// Prescribed pressure, inflow side.
    PressureInflow,
    /// Prescribed pressure, outflow side.
    PressureOutflow,
}

impl BcKind {
    /// Returns `true` if the ghost value of a scalar is prescribed
    /// rather than extrapolated from the interior.
    pub fn prescribes_scalars(self) -> bool {
        matches!(self, BcKind::MassInflow | BcKind::NoSlipWall)
    }

    /// Returns `true` for pressure-driven faces.
    pub fn is_pressure(self) -> bool {
        matches!(self, BcKind::PressureInflow | BcKind::PressureOutflow)
    }
}

/// Condition and prescribed values on one face.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FaceBc {
    /// Condition kind.
    pub kind: BcKind,
    /// Boundary density.
    pub density: f64,
    /// Boundary tracer concentration.
    pub tracer: f64,
    /// Boundary velocity.
    pub velocity: [f64; 3],
    /// Boundary pressure.
    pub pressure: f64,
}

impl FaceBc {
    /// A face of the given kind with all values zero.
    pub fn of_kind(kind: BcKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// No-slip wall with the given wall density.
    pub fn wall(density: f64) -> Self {
        Self {
            kind: BcKind::NoSlipWall,
            density,
            ..Self::default()
        }
    }

    /// Mass inflow with prescribed velocity and density.
    pub fn inflow(velocity: [f64; 3], density: f64) -> Self {
        Self {
            kind: BcKind::MassInflow,
            density,
            velocity,
            ..Self::default()
        }
    }

    /// Pressure outflow at the given pressure.
    pub fn outflow(pressure: f64) -> Self {
        Self {
            kind: BcKind::PressureOutflow,
            pressure,
            ..Self::default()
        }
    }
}

/// Which scalar a fill refers to, selecting the prescribed value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    /// Density: prescribed faces use [`FaceBc::density`].
    Density,
    /// Tracer: prescribed faces use [`FaceBc::tracer`].
    Tracer,
    /// Always extrapolated, whatever the face kind.
    Extrapolated,
}

impl ScalarKind {
    /// Prescribed value on `face`, if the scalar is prescribed there.
    pub fn prescribed(self, face: &FaceBc) -> Option<f64> {
        if !face.kind.prescribes_scalars() {
            return None;
        }
        match self {
            ScalarKind::Density => Some(face.density),
            ScalarKind::Tracer => Some(face.tracer),
            ScalarKind::Extrapolated => None,
        }
    }
}

/// Boundary conditions on all six faces.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BcTable {
    faces: [FaceBc; 6],
}

impl BcTable {
    /// Fully periodic table.
    pub fn periodic() -> Self {
        Self::default()
    }

    /// Copy with the condition on `face` replaced.
    pub fn with_face(mut self, face: Face, bc: FaceBc) -> Self {
        self.faces[face.index()] = bc;
        self
    }

    /// Condition on `face`.
    pub fn face(&self, face: Face) -> &FaceBc {
        &self.faces[face.index()]
    }

    /// Iterate over `(face, condition)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Face, &FaceBc)> {
        Face::ALL.into_iter().zip(self.faces.iter())
    }

    /// Check that periodic faces match the geometry's periodic axes.
    pub fn validate(&self, geometry: &Geometry) -> Result<(), GridError> {
        for (face, bc) in self.iter() {
            let periodic = bc.kind == BcKind::Periodic;
            if periodic != geometry.is_periodic(face.axis()) {
                return Err(GridError::PeriodicityMismatch { face });
            }
        }
        Ok(())
    }
}
