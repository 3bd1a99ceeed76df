//! Scheduler and criteria configuration.

use cadence_core::ConfigError;

use crate::rungs::Timestep;

// ── RungConfig ─────────────────────────────────────────────────────

/// Configuration for the [`RungScheduler`](crate::RungScheduler).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RungConfig {
    /// Ceiling on the number of rungs. Must lie in
    /// `1..=Timestep::MAX_NUM_RUNGS`. Default: 4.
    pub max_rungs: usize,
    /// Fraction of the locally sorted groups at which the reference
    /// timestep is read. Must lie in `[0, 1]`. Default: 0.4.
    pub fast_fraction: f32,
}

impl Default for RungConfig {
    fn default() -> Self {
        Self {
            max_rungs: Timestep::MAX_NUM_RUNGS,
            fast_fraction: 0.4,
        }
    }
}

impl RungConfig {
    /// Check the parameters are within their documented ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rungs == 0 || self.max_rungs > Timestep::MAX_NUM_RUNGS {
            return Err(ConfigError::InvalidParameter {
                name: "max_rungs",
                reason: format!(
                    "must be in 1..={}, got {}",
                    Timestep::MAX_NUM_RUNGS,
                    self.max_rungs
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.fast_fraction) {
            return Err(ConfigError::InvalidParameter {
                name: "fast_fraction",
                reason: format!("must be in [0, 1], got {}", self.fast_fraction),
            });
        }
        Ok(())
    }
}

// ── TimestepConfig ─────────────────────────────────────────────────

/// Coefficients of the two group timestep criteria.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimestepConfig {
    /// Courant-like damping coefficient of the velocity-divergence
    /// criterion. Default: 0.2.
    pub k_cour: f32,
    /// Accuracy parameter of the acceleration criterion. Default: 0.2.
    pub eta_acc: f32,
    /// Softening length entering the acceleration criterion. Default: 0.005.
    pub eps: f32,
    /// Ceiling on every group timestep. Groups neither criterion
    /// constrains (zero divergence and zero acceleration) get exactly
    /// this value. Must be finite and positive. Default: `f32::MAX`.
    pub max_dt: f32,
}

impl Default for TimestepConfig {
    fn default() -> Self {
        Self {
            k_cour: 0.2,
            eta_acc: 0.2,
            eps: 0.005,
            max_dt: f32::MAX,
        }
    }
}

impl TimestepConfig {
    /// Check every coefficient is finite and positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let params = [
            ("k_cour", self.k_cour),
            ("eta_acc", self.eta_acc),
            ("eps", self.eps),
            ("max_dt", self.max_dt),
        ];
        for (name, value) in params {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidParameter {
                    name,
                    reason: format!("must be finite and positive, got {value}"),
                });
            }
        }
        Ok(())
    }

    /// The numerator of the acceleration criterion, `eta_acc * sqrt(eps)`.
    pub fn acc_coefficient(&self) -> f32 {
        self.eta_acc * self.eps.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RungConfig::default().validate().is_ok());
        assert!(TimestepConfig::default().validate().is_ok());
    }

    #[test]
    fn max_rungs_out_of_range_fails() {
        for max_rungs in [0, Timestep::MAX_NUM_RUNGS + 1] {
            let cfg = RungConfig {
                max_rungs,
                ..RungConfig::default()
            };
            match cfg.validate() {
                Err(ConfigError::InvalidParameter { name: "max_rungs", .. }) => {}
                other => panic!("expected InvalidParameter(max_rungs), got {other:?}"),
            }
        }
    }

    #[test]
    fn fast_fraction_nan_fails() {
        let cfg = RungConfig {
            fast_fraction: f32::NAN,
            ..RungConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn non_positive_coefficient_fails() {
        let cfg = TimestepConfig {
            eps: 0.0,
            ..TimestepConfig::default()
        };
        match cfg.validate() {
            Err(ConfigError::InvalidParameter { name: "eps", .. }) => {}
            other => panic!("expected InvalidParameter(eps), got {other:?}"),
        }
    }

    #[test]
    fn infinite_max_dt_fails() {
        let cfg = TimestepConfig {
            max_dt: f32::INFINITY,
            ..TimestepConfig::default()
        };
        match cfg.validate() {
            Err(ConfigError::InvalidParameter { name: "max_dt", .. }) => {}
            other => panic!("expected InvalidParameter(max_dt), got {other:?}"),
        }
    }

    #[test]
    fn acc_coefficient_is_eta_sqrt_eps() {
        let cfg = TimestepConfig {
            k_cour: 1.0,
            eta_acc: 0.5,
            eps: 0.04,
            ..TimestepConfig::default()
        };
        assert!((cfg.acc_coefficient() - 0.1).abs() < 1e-7);
    }
}
