//! Uniform-thrust actuator disk.
//!
//! The disk samples the velocity at points one offset upstream of its
//! centre plane, projects the mean onto the disk normal, looks up a
//! thrust coefficient from a `(velocity, ct)` table, and applies a
//! uniform body force over the disk volume.

use incflow_field::MultiField;
use incflow_grid::{Geometry, IntVect};
use incflow_ops::{OpError, SubStepContext};
use log::debug;
use smallvec::SmallVec;

/// Thrust state derived from the current velocity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiskThrust {
    /// Mean upstream velocity.
    pub reference_velocity: [f64; 3],
    /// `(u_ref . n)^2`.
    pub uinf_sqr: f64,
    /// Interpolated thrust coefficient.
    pub ct: f64,
}

impl DiskThrust {
    /// Force per unit mass applied inside the disk, along `-normal`.
    pub fn acceleration(&self, thickness: f64) -> f64 {
        0.5 * self.ct * self.uinf_sqr / thickness
    }
}

/// A disk-shaped momentum sink.
///
/// Constructed via [`ActuatorDisk::builder`].
#[derive(Clone, Debug, PartialEq)]
pub struct ActuatorDisk {
    center: [f64; 3],
    normal: [f64; 3],
    diameter: f64,
    thickness: f64,
    upstream_offset: f64,
    points_per_radius: usize,
    table_velocity: Vec<f64>,
    thrust_coeff: Vec<f64>,
}

/// Builder for [`ActuatorDisk`].
///
/// Required: `diameter` and a thrust table. The normal defaults to `+x`,
/// the thickness to one tenth of the diameter and the upstream offset
/// to one diameter.
pub struct ActuatorDiskBuilder {
    center: [f64; 3],
    normal: [f64; 3],
    diameter: Option<f64>,
    thickness: Option<f64>,
    upstream_offset: Option<f64>,
    points_per_radius: usize,
    table_velocity: Vec<f64>,
    thrust_coeff: Vec<f64>,
}

impl ActuatorDisk {
    /// Start configuring a disk.
    pub fn builder() -> ActuatorDiskBuilder {
        ActuatorDiskBuilder {
            center: [0.0; 3],
            normal: [1.0, 0.0, 0.0],
            diameter: None,
            thickness: None,
            upstream_offset: None,
            points_per_radius: 4,
            table_velocity: Vec::new(),
            thrust_coeff: Vec::new(),
        }
    }

    /// Unit normal, pointing downstream.
    pub fn normal(&self) -> [f64; 3] {
        self.normal
    }

    /// Disk thickness along the normal.
    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    /// Sample points on a diameter line of the plane `offset` along the normal.
    fn sample_points(&self, offset: f64) -> SmallVec<[[f64; 3]; 16]> {
        let t = coplanar_vector(self.normal);
        let radius = 0.5 * self.diameter;
        let n = self.points_per_radius;
        let mut points = SmallVec::new();
        for side in [-1.0, 1.0] {
            for k in 0..n {
                let r = side * radius * (k as f64 + 0.5) / n as f64;
                points.push(std::array::from_fn(|d| {
                    self.center[d] + offset * self.normal[d] + r * t[d]
                }));
            }
        }
        points
    }

    /// Mean upstream velocity and the thrust it implies.
    ///
    /// Each sample point reads the cell that contains it; points outside
    /// the domain are skipped. Collective: every worker must call it.
    pub fn thrust(&self, ctx: &SubStepContext<'_>, vel: &MultiField) -> Result<DiskThrust, OpError> {
        vel.check_comps(0, 3)?;
        let geom = ctx.geometry();
        let mut sum = [0.0; 3];
        let mut count = 0.0;
        for x in self.sample_points(-self.upstream_offset) {
            let Some(iv) = containing_cell(geom, x) else {
                continue;
            };
            if let Some(b) = vel.boxes().iter().find(|b| b.valid().contains(iv)) {
                for (c, s) in sum.iter_mut().enumerate() {
                    *s += b.get(iv, c);
                }
                count += 1.0;
            }
        }
        let comm = ctx.comm();
        let count = comm.all_reduce_sum(count)?;
        let mut reference_velocity = [0.0; 3];
        for (r, s) in reference_velocity.iter_mut().zip(sum) {
            let total = comm.all_reduce_sum(s)?;
            *r = if count > 0.0 { total / count } else { 0.0 };
        }
        let un = dot(reference_velocity, self.normal);
        let uinf_sqr = un * un;
        let ct = interp_linear(&self.table_velocity, &self.thrust_coeff, uinf_sqr.sqrt());
        Ok(DiskThrust {
            reference_velocity,
            uinf_sqr,
            ct,
        })
    }

    /// Add the disk's force per unit mass to `force`.
    pub fn add_force(
        &self,
        ctx: &SubStepContext<'_>,
        vel: &MultiField,
        force: &mut MultiField,
    ) -> Result<DiskThrust, OpError> {
        force.check_comps(0, 3)?;
        let thrust = self.thrust(ctx, vel)?;
        let a = thrust.acceleration(self.thickness);
        debug!(
            "actuator disk: uinf^2 {:.6e}, ct {:.4}, acceleration {:.6e}",
            thrust.uinf_sqr, thrust.ct, a
        );
        let geom = ctx.geometry();
        for b in force.boxes_mut() {
            for iv in b.valid().cells() {
                if self.contains(geom.cell_center(iv)) {
                    for c in 0..3 {
                        b.set(iv, c, b.get(iv, c) - a * self.normal[c]);
                    }
                }
            }
        }
        Ok(thrust)
    }

    fn contains(&self, x: [f64; 3]) -> bool {
        let rel: [f64; 3] = std::array::from_fn(|d| x[d] - self.center[d]);
        let axial = dot(rel, self.normal);
        let radial_sqr = dot(rel, rel) - axial * axial;
        let radius = 0.5 * self.diameter;
        axial.abs() <= 0.5 * self.thickness && radial_sqr <= radius * radius
    }
}

impl ActuatorDiskBuilder {
    /// Disk centre.
    pub fn center(mut self, center: [f64; 3]) -> Self {
        self.center = center;
        self
    }

    /// Downstream normal; normalised by `build`.
    pub fn normal(mut self, normal: [f64; 3]) -> Self {
        self.normal = normal;
        self
    }

    /// Rotor diameter.
    pub fn diameter(mut self, diameter: f64) -> Self {
        self.diameter = Some(diameter);
        self
    }

    /// Thickness of the forcing region.
    pub fn thickness(mut self, thickness: f64) -> Self {
        self.thickness = Some(thickness);
        self
    }

    /// Distance upstream at which the reference velocity is sampled.
    pub fn upstream_offset(mut self, offset: f64) -> Self {
        self.upstream_offset = Some(offset);
        self
    }

    /// Sample points on each side of the centre.
    pub fn points_per_radius(mut self, n: usize) -> Self {
        self.points_per_radius = n;
        self
    }

    /// Thrust table; velocities must be strictly increasing.
    pub fn thrust_table(mut self, velocity: Vec<f64>, ct: Vec<f64>) -> Self {
        self.table_velocity = velocity;
        self.thrust_coeff = ct;
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<ActuatorDisk, String> {
        let diameter = self
            .diameter
            .ok_or_else(|| "diameter is required".to_string())?;
        if !(diameter.is_finite() && diameter > 0.0) {
            return Err(format!("diameter must be finite and > 0, got {diameter}"));
        }
        let thickness = self.thickness.unwrap_or(0.1 * diameter);
        if !(thickness.is_finite() && thickness > 0.0) {
            return Err(format!("thickness must be finite and > 0, got {thickness}"));
        }
        let upstream_offset = self.upstream_offset.unwrap_or(diameter);
        if !upstream_offset.is_finite() {
            return Err(format!("upstream_offset must be finite, got {upstream_offset}"));
        }
        if self.points_per_radius == 0 {
            return Err("points_per_radius must be at least 1".to_string());
        }
        let norm = dot(self.normal, self.normal).sqrt();
        if !(norm.is_finite() && norm > 0.0) {
            return Err("normal must be a non-zero finite vector".to_string());
        }
        if self.table_velocity.is_empty() || self.table_velocity.len() != self.thrust_coeff.len() {
            return Err(format!(
                "thrust table needs matching non-empty columns, got {} velocities and {} coefficients",
                self.table_velocity.len(),
                self.thrust_coeff.len()
            ));
        }
        if self.table_velocity.windows(2).any(|w| w[1] <= w[0]) {
            return Err("thrust table velocities must be strictly increasing".to_string());
        }
        Ok(ActuatorDisk {
            center: self.center,
            normal: self.normal.map(|x| x / norm),
            diameter,
            thickness,
            upstream_offset,
            points_per_radius: self.points_per_radius,
            table_velocity: self.table_velocity,
            thrust_coeff: self.thrust_coeff,
        })
    }
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Unit vector in the plane normal to `n`.
fn coplanar_vector(n: [f64; 3]) -> [f64; 3] {
    // cross with the axis least aligned with n
    let axis = (0..3)
        .min_by(|&a, &b| n[a].abs().total_cmp(&n[b].abs()))
        .unwrap_or(0);
    let e = IntVect::unit(axis, 1).0.map(f64::from);
    let v = [
        n[1] * e[2] - n[2] * e[1],
        n[2] * e[0] - n[0] * e[2],
        n[0] * e[1] - n[1] * e[0],
    ];
    let len = dot(v, v).sqrt();
    v.map(|x| x / len)
}

fn containing_cell(geom: &Geometry, x: [f64; 3]) -> Option<IntVect> {
    let lo = geom.prob_lo();
    let h = geom.cell_size();
    let domain = geom.domain();
    let mut iv = [0; 3];
    for d in 0..3 {
        iv[d] = domain.lo().get(d) + ((x[d] - lo[d]) / h[d]).floor() as i32;
    }
    let iv = IntVect(iv);
    domain.contains(iv).then_some(iv)
}

/// Piecewise-linear lookup, clamped to the end values outside the table.
pub(crate) fn interp_linear(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len();
    if n == 0 {
        return 0.0;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    let i = xs.partition_point(|&v| v <= x);
    let (x0, x1) = (xs[i - 1], xs[i]);
    let (y0, y1) = (ys[i - 1], ys[i]);
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}
