//! Explicit body forces.

use incflow_field::MultiField;
use incflow_ops::{Forcing, OpError, SubStepContext};

use crate::actuator_disk::ActuatorDisk;

/// One body-force contribution.
#[derive(Clone, Debug, PartialEq)]
pub enum ForcingTerm {
    /// Uniform acceleration, e.g. gravity.
    Gravity([f64; 3]),
    /// Force per unit volume; divided by the local density.
    BodyForce([f64; 3]),
    /// Thrust of an actuator disk.
    ActuatorDisk(ActuatorDisk),
}

/// Sum of body-force terms, applied in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ForcingSet {
    terms: Vec<ForcingTerm>,
}

impl ForcingSet {
    /// An empty set; adds nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a term.
    pub fn with(mut self, term: ForcingTerm) -> Self {
        self.terms.push(term);
        self
    }

    /// Terms in application order.
    pub fn terms(&self) -> &[ForcingTerm] {
        &self.terms
    }

    /// Sum of the [`ForcingTerm::Gravity`] vectors, for the stability bound.
    pub fn gravity(&self) -> [f64; 3] {
        let mut g = [0.0; 3];
        for term in &self.terms {
            if let ForcingTerm::Gravity(v) = term {
                for (gi, vi) in g.iter_mut().zip(v) {
                    *gi += vi;
                }
            }
        }
        g
    }
}

impl FromIterator<ForcingTerm> for ForcingSet {
    fn from_iter<I: IntoIterator<Item = ForcingTerm>>(iter: I) -> Self {
        Self {
            terms: iter.into_iter().collect(),
        }
    }
}

fn add_uniform(force: &mut MultiField, ro: Option<&MultiField>, v: [f64; 3]) {
    let ro_boxes = ro.map(|r| r.boxes());
    for (i, b) in force.boxes_mut().iter_mut().enumerate() {
        for iv in b.valid().cells() {
            let scale = ro_boxes.map_or(1.0, |r| 1.0 / r[i].get(iv, 0));
            for (c, vc) in v.iter().enumerate() {
                b.set(iv, c, b.get(iv, c) + scale * vc);
            }
        }
    }
}

impl Forcing for ForcingSet {
    fn name(&self) -> &str {
        "forcing_set"
    }

    fn add_force(
        &self,
        ctx: &SubStepContext<'_>,
        vel: &MultiField,
        ro: &MultiField,
        force: &mut MultiField,
    ) -> Result<(), OpError> {
        force.check_comps(0, 3)?;
        force.ensure_same_layout(ro)?;
        for term in &self.terms {
            match term {
                ForcingTerm::Gravity(g) => add_uniform(force, None, *g),
                ForcingTerm::BodyForce(f) => {
                    ro.check_positive(0, 0)?;
                    add_uniform(force, Some(ro), *f);
                }
                ForcingTerm::ActuatorDisk(disk) => {
                    disk.add_force(ctx, vel, force)?;
                }
            }
        }
        Ok(())
    }
}
