//! Convective, viscous and body-force CFL bound.

use incflow_ops::{StabilityBound, StabilityInputs};

/// Step-size bound combining convection, explicit viscosity and body forces.
///
/// ```text
/// c  = sum_i |u_i|max / dx_i
/// d  = 2 (mu_max / ro_max) sum_i 1 / dx_i^2      (explicit diffusion only)
/// f  = sum_i |g_i - gp0_i,max / ro_max| / dx_i
/// dt = cfl / (0.5 (c + d + sqrt((c + d)^2 + 4 f)))
/// ```
///
/// Outside steady-state mode the step is clamped so that it does not
/// overshoot a positive stop time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CflBound {
    gravity: [f64; 3],
    max_dt: f64,
}

impl Default for CflBound {
    fn default() -> Self {
        Self {
            gravity: [0.0; 3],
            max_dt: f64::INFINITY,
        }
    }
}

impl CflBound {
    /// Bound with the given gravity vector and no upper cap.
    pub fn new(gravity: [f64; 3]) -> Self {
        Self {
            gravity,
            ..Self::default()
        }
    }

    /// Cap the step when every rate vanishes.
    pub fn with_max_dt(mut self, max_dt: f64) -> Self {
        self.max_dt = max_dt;
        self
    }

    /// Gravity vector.
    pub fn gravity(&self) -> [f64; 3] {
        self.gravity
    }

    fn rates(&self, inputs: &StabilityInputs) -> (f64, f64, f64) {
        let e = &inputs.extrema;
        let h = inputs.cell_size;
        let inv_ro = if e.ro > 0.0 { 1.0 / e.ro } else { 0.0 };
        let conv: f64 = (0..3).map(|d| e.vel[d] / h[d]).sum();
        let visc = if inputs.explicit_diffusion {
            2.0 * e.mu * inv_ro * (0..3).map(|d| 1.0 / (h[d] * h[d])).sum::<f64>()
        } else {
            0.0
        };
        let force: f64 = (0..3)
            .map(|d| (self.gravity[d] - e.gp0[d] * inv_ro).abs() / h[d])
            .sum();
        (conv, visc, force)
    }
}

impl StabilityBound for CflBound {
    fn name(&self) -> &str {
        "cfl_bound"
    }

    fn max_stable_dt(&self, inputs: &StabilityInputs) -> f64 {
        let (c, d, f) = self.rates(inputs);
        let cd = c + d;
        let rate = 0.5 * (cd + (cd * cd + 4.0 * f).sqrt());
        let mut dt = if rate > 0.0 {
            (inputs.cfl / rate).min(self.max_dt)
        } else {
            self.max_dt
        };
        if !inputs.steady_state && inputs.stop_time > 0.0 {
            let remaining = inputs.stop_time - inputs.time;
            if remaining > 0.0 && dt > remaining {
                dt = remaining;
            }
        }
        dt
    }
}
