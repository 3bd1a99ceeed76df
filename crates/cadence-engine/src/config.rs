//! Propagator configuration.

use cadence_core::ConfigError;

/// Configuration for an [`NbodyPropagator`](crate::NbodyPropagator).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PropagatorConfig {
    /// Opening angle of the tree traversal. Zero disables multipole
    /// acceptance (exact direct summation). Default: 0.5.
    pub theta: f64,
    /// Maximum particles per octree leaf. Default: 16.
    pub leaf_size: usize,
    /// Gravitational constant written at field activation. Default: 1.0.
    pub g: f64,
    /// Rank that receives the reduced energy and statistics and logs the
    /// step diagnostics. Default: 0.
    pub root_rank: usize,
}

impl Default for PropagatorConfig {
    fn default() -> Self {
        Self {
            theta: 0.5,
            leaf_size: 16,
            g: 1.0,
            root_rank: 0,
        }
    }
}

impl PropagatorConfig {
    /// Check the parameters are within their documented ranges.
    ///
    /// `root_rank` is checked against the communicator at the first
    /// reduction, not here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.theta.is_finite() || self.theta < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "theta",
                reason: format!("must be finite and non-negative, got {}", self.theta),
            });
        }
        if self.leaf_size == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "leaf_size",
                reason: "must be at least 1".into(),
            });
        }
        if !self.g.is_finite() {
            return Err(ConfigError::InvalidParameter {
                name: "g",
                reason: format!("must be finite, got {}", self.g),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(PropagatorConfig::default().validate().is_ok());
    }

    #[test]
    fn negative_theta_fails() {
        let cfg = PropagatorConfig {
            theta: -0.1,
            ..PropagatorConfig::default()
        };
        match cfg.validate() {
            Err(ConfigError::InvalidParameter { name: "theta", .. }) => {}
            other => panic!("expected InvalidParameter(theta), got {other:?}"),
        }
    }

    #[test]
    fn zero_leaf_size_fails() {
        let cfg = PropagatorConfig {
            leaf_size: 0,
            ..PropagatorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_theta_is_allowed() {
        let cfg = PropagatorConfig {
            theta: 0.0,
            ..PropagatorConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
