//! Advance configuration, validation, and error types.
//!
//! [`AdvanceConfig`] carries the options the outer loop and the
//! step-size controller read. [`validate()`](AdvanceConfig::validate)
//! checks them once, when an [`Advancer`](crate::Advancer) is built.

use thiserror::Error;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while validating an [`AdvanceConfig`] or assembling
/// an [`Advancer`](crate::Advancer).
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// `cfl` is NaN, infinite, zero, or negative.
    #[error("cfl must be finite and positive, got {value}")]
    InvalidCfl {
        /// The invalid value.
        value: f64,
    },
    /// `fixed_dt` is NaN or infinite.
    #[error("fixed_dt must be finite, got {value}")]
    InvalidFixedDt {
        /// The invalid value.
        value: f64,
    },
    /// `steady_state_tol` is NaN, infinite, zero, or negative.
    #[error("steady_state_tol must be finite and positive, got {value}")]
    InvalidTolerance {
        /// The invalid value.
        value: f64,
    },
    /// `max_steady_iterations` is `Some(0)`.
    #[error("max_steady_iterations must be at least 1")]
    ZeroIterationCap,
    /// Diffusion is implicit but no diffusion solver was supplied.
    #[error("explicit_diffusion is false but no diffusion solver is configured")]
    MissingDiffusionSolver,
}

// ── AdvanceConfig ──────────────────────────────────────────────────

/// Options consumed by [`Advancer`](crate::Advancer).
#[derive(Clone, Debug, PartialEq)]
pub struct AdvanceConfig {
    /// Stability safety factor. Default: 0.5.
    pub cfl: f64,
    /// Forced step size. `None` uses the stability bound.
    pub fixed_dt: Option<f64>,
    /// Repeat the step until the steady-state test passes. Default: false.
    pub steady_state: bool,
    /// Steady-state tolerance. Default: 1e-5.
    pub steady_state_tol: f64,
    /// Treat the whole viscous term explicitly. Default: true.
    pub explicit_diffusion: bool,
    /// Diagnostic print level; 0 is quiet.
    pub verbose: u32,
    /// Projection variant flag. Default: true.
    pub proj_2: bool,
    /// Iteration cap for steady-state mode. `None` is unbounded.
    pub max_steady_iterations: Option<u64>,
}

impl Default for AdvanceConfig {
    fn default() -> Self {
        Self {
            cfl: 0.5,
            fixed_dt: None,
            steady_state: false,
            steady_state_tol: 1e-5,
            explicit_diffusion: true,
            verbose: 0,
            proj_2: true,
            max_steady_iterations: None,
        }
    }
}

impl AdvanceConfig {
    /// Start from the defaults.
    pub fn builder() -> AdvanceConfigBuilder {
        AdvanceConfigBuilder {
            config: Self::default(),
        }
    }

    /// The fixed step, if one is configured and positive.
    ///
    /// Values `<= 0` disable the fixed step.
    pub fn effective_fixed_dt(&self) -> Option<f64> {
        self.fixed_dt.filter(|&dt| dt > 0.0)
    }

    /// Check every option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cfl.is_finite() && self.cfl > 0.0) {
            return Err(ConfigError::InvalidCfl { value: self.cfl });
        }
        if let Some(value) = self.fixed_dt {
            if !value.is_finite() {
                return Err(ConfigError::InvalidFixedDt { value });
            }
        }
        if !(self.steady_state_tol.is_finite() && self.steady_state_tol > 0.0) {
            return Err(ConfigError::InvalidTolerance {
                value: self.steady_state_tol,
            });
        }
        if self.max_steady_iterations == Some(0) {
            return Err(ConfigError::ZeroIterationCap);
        }
        Ok(())
    }
}

/// Builder for [`AdvanceConfig`].
pub struct AdvanceConfigBuilder {
    config: AdvanceConfig,
}

impl AdvanceConfigBuilder {
    /// Stability safety factor.
    pub fn cfl(mut self, cfl: f64) -> Self {
        self.config.cfl = cfl;
        self
    }

    /// Force the step size; `<= 0` disables it.
    pub fn fixed_dt(mut self, dt: f64) -> Self {
        self.config.fixed_dt = (dt > 0.0 || dt.is_nan()).then_some(dt);
        self
    }

    /// Iterate to steady state with tolerance `tol`.
    pub fn steady_state(mut self, tol: f64) -> Self {
        self.config.steady_state = true;
        self.config.steady_state_tol = tol;
        self
    }

    /// Explicit or semi-implicit viscous treatment.
    pub fn explicit_diffusion(mut self, explicit: bool) -> Self {
        self.config.explicit_diffusion = explicit;
        self
    }

    /// Diagnostic print level.
    pub fn verbose(mut self, level: u32) -> Self {
        self.config.verbose = level;
        self
    }

    /// Projection variant flag.
    pub fn proj_2(mut self, proj_2: bool) -> Self {
        self.config.proj_2 = proj_2;
        self
    }

    /// Give up after `n` steady-state iterations.
    pub fn max_steady_iterations(mut self, n: u64) -> Self {
        self.config.max_steady_iterations = Some(n);
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<AdvanceConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = AdvanceConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.cfl, 0.5);
        assert!(c.explicit_diffusion);
        assert!(c.proj_2);
        assert_eq!(c.effective_fixed_dt(), None);
    }

    #[test]
    fn non_positive_fixed_dt_disables() {
        let c = AdvanceConfig::builder().fixed_dt(-1.0).build().unwrap();
        assert_eq!(c.fixed_dt, None);
        let c = AdvanceConfig::builder().fixed_dt(0.0).build().unwrap();
        assert_eq!(c.fixed_dt, None);
        let c = AdvanceConfig {
            fixed_dt: Some(-2.0),
            ..AdvanceConfig::default()
        };
        assert_eq!(c.effective_fixed_dt(), None);
        let c = AdvanceConfig::builder().fixed_dt(0.01).build().unwrap();
        assert_eq!(c.effective_fixed_dt(), Some(0.01));
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            AdvanceConfig::builder().cfl(0.0).build(),
            Err(ConfigError::InvalidCfl { value: 0.0 })
        );
        assert!(matches!(
            AdvanceConfig::builder().fixed_dt(f64::NAN).build(),
            Err(ConfigError::InvalidFixedDt { .. })
        ));
        assert_eq!(
            AdvanceConfig::builder().steady_state(-1e-3).build(),
            Err(ConfigError::InvalidTolerance { value: -1e-3 })
        );
        assert_eq!(
            AdvanceConfig::builder().max_steady_iterations(0).build(),
            Err(ConfigError::ZeroIterationCap)
        );
    }

    #[test]
    fn error_messages() {
        let e = ConfigError::InvalidCfl { value: -0.5 };
        assert_eq!(e.to_string(), "cfl must be finite and positive, got -0.5");
    }
}
