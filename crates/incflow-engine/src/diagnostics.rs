//! Field extrema and NaN reports.
//!
//! Observability only: neither report changes control flow.

use std::fmt;

use incflow_core::Component;
use incflow_field::MultiField;
use incflow_grid::Communicator;
use indexmap::IndexMap;
use log::{log, warn, Level};

use crate::error::StepError;

/// Global `max |.|` of `u`, `v`, `w` and `p`, in that order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtremaReport {
    values: IndexMap<&'static str, f64>,
}

impl ExtremaReport {
    /// Value recorded under `label`.
    pub fn get(&self, label: &str) -> Option<f64> {
        self.values.get(label).copied()
    }

    /// `(label, value)` pairs in report order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }
}

impl fmt::Display for ExtremaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.values.keys().copied().collect();
        write!(f, "max(abs({})) =", labels.join("/"))?;
        for v in self.values.values() {
            write!(f, " {v:e}")?;
        }
        Ok(())
    }
}

/// Compute and log the velocity and pressure extrema at `level`. Collective.
pub fn print_max_vel(
    vel: &MultiField,
    p: &MultiField,
    comm: &dyn Communicator,
    level: Level,
) -> Result<ExtremaReport, StepError> {
    let mut values = IndexMap::with_capacity(4);
    for c in Component::ALL {
        let v = comm.all_reduce_max(vel.local_norm0(c.index())?)?;
        values.insert(c.velocity_label(), v);
    }
    values.insert("p", comm.all_reduce_max(p.local_norm0(0)?)?);
    let report = ExtremaReport { values };
    log!(level, "{report}");
    Ok(report)
}

/// Fields found holding NaN or infinite values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NanReport {
    /// Offending field labels, `u`, `v`, `w`, `p` order.
    pub fields: Vec<&'static str>,
}

impl NanReport {
    /// `true` if every field was finite.
    pub fn is_clean(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Scan velocity components and pressure for non-finite values and
/// warn per offending field. Collective.
///
/// A detection is reported, never returned as an error.
pub fn check_for_nans(
    vel: &MultiField,
    p: &MultiField,
    comm: &dyn Communicator,
) -> Result<NanReport, StepError> {
    let mut report = NanReport::default();
    let mut inspect = |label: &'static str, field: &MultiField, comp: usize| -> Result<(), StepError> {
        let local = if field.contains_non_finite(comp, 1, 0)? {
            1.0
        } else {
            0.0
        };
        if comm.all_reduce_max(local)? > 0.0 {
            warn!("{label} contains NaNs");
            report.fields.push(label);
        }
        Ok(())
    };
    for c in Component::ALL {
        inspect(c.velocity_label(), vel, c.index())?;
    }
    inspect("p", p, 0)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use incflow_grid::{BoxLayout, Geometry, IntVect, LocalComm};

    fn fields() -> (MultiField, MultiField) {
        let geom = Geometry::periodic_cube(4).unwrap();
        let layout = BoxLayout::chop(geom, 2).unwrap().into_shared();
        let vel = MultiField::new(layout.clone(), 0, 3, 1, "vel").unwrap();
        let p = MultiField::new(layout, 0, 1, 1, "p").unwrap();
        (vel, p)
    }

    #[test]
    fn extrema_in_component_order() {
        let (mut vel, mut p) = fields();
        vel.set_valid(|iv, c| if iv == IntVect::new(3, 0, 1) { -(c as f64 + 1.0) } else { 0.5 });
        p.fill(-7.0);
        let r = print_max_vel(&vel, &p, &LocalComm, Level::Debug).unwrap();
        let pairs: Vec<_> = r.iter().collect();
        assert_eq!(pairs, vec![("u", 1.0), ("v", 2.0), ("w", 3.0), ("p", 7.0)]);
        assert_eq!(r.get("w"), Some(3.0));
        assert!(r.to_string().starts_with("max(abs(u/v/w/p)) ="));
    }

    #[test]
    fn nans_are_reported_not_raised() {
        let (mut vel, mut p) = fields();
        assert!(check_for_nans(&vel, &p, &LocalComm).unwrap().is_clean());
        let lo = vel.boxes()[1].valid().lo();
        vel.boxes_mut()[1].set(lo, 1, f64::NAN);
        p.boxes_mut()[0].set(IntVect::ZERO, 0, f64::INFINITY);
        let r = check_for_nans(&vel, &p, &LocalComm).unwrap();
        assert_eq!(r.fields, vec!["v", "p"]);
    }

    #[test]
    fn halo_nans_are_ignored() {
        let (mut vel, p) = fields();
        vel.boxes_mut()[0].set(IntVect::new(-1, 0, 0), 0, f64::NAN);
        assert!(check_for_nans(&vel, &p, &LocalComm).unwrap().is_clean());
    }
}
