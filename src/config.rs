//! Filtering thresholds and the amplicon size window.
//!
//! Both are plain numeric options; the binary builds them from its command
//! line and calls `validate` before starting any work.
use crate::error::ConfigError;

/// Thresholds applied by [`crate::metrics::evaluate`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    /// Minimum match percentage (inclusive).
    pub nm_threshold: f64,
    /// Candidates with a higher `tm_max` are rejected.
    pub tm_max_threshold: f64,
    /// Candidates with a lower `tm_min` are rejected.
    pub tm_min_threshold: f64,
    /// Reject candidates with an ambiguity code in this many 3' positions.
    pub limiting_degeneracy: Option<usize>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds { nm_threshold: 80.0, tm_max_threshold: 70.0, tm_min_threshold: 50.0, limiting_degeneracy: None }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("nm_threshold", self.nm_threshold),
            ("tm_max_threshold", self.tm_max_threshold),
            ("tm_min_threshold", self.tm_min_threshold),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { name, value });
            }
        }
        if self.tm_min_threshold > self.tm_max_threshold {
            return Err(ConfigError::TmRange { min: self.tm_min_threshold, max: self.tm_max_threshold });
        }
        match self.limiting_degeneracy {
            Some(n) if !(1..=5).contains(&n) => Err(ConfigError::LimitingDegeneracy(n)),
            _ => Ok(()),
        }
    }
}

/// Closed interval of accepted amplicon sizes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AmpliconWindow {
    pub min: i64,
    pub max: i64,
}

impl AmpliconWindow {
    /// Window used by the in-silico validation stage.
    pub const STEP2: AmpliconWindow = AmpliconWindow { min: 150, max: 490 };
    /// Wider window of the first pairing deployments.
    pub const LEGACY: AmpliconWindow = AmpliconWindow { min: 50, max: 600 };

    pub fn contains(&self, size: i64) -> bool { (self.min..=self.max).contains(&size) }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min < 0 {
            return Err(ConfigError::NegativeAmplicon(self.min));
        }
        if self.min > self.max {
            return Err(ConfigError::AmpliconRange { min: self.min, max: self.max });
        }
        Ok(())
    }
}

impl Default for AmpliconWindow {
    fn default() -> Self { AmpliconWindow::STEP2 }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Thresholds::default().validate().is_ok());
        assert!(AmpliconWindow::default().validate().is_ok());
        assert!(AmpliconWindow::LEGACY.validate().is_ok());
    }

    #[test]
    fn limiting_degeneracy_is_bounded() {
        for n in 1..=5 {
            let t = Thresholds { limiting_degeneracy: Some(n), ..Default::default() };
            assert!(t.validate().is_ok());
        }
        let t = Thresholds { limiting_degeneracy: Some(0), ..Default::default() };
        assert_eq!(t.validate(), Err(ConfigError::LimitingDegeneracy(0)));
        let t = Thresholds { limiting_degeneracy: Some(6), ..Default::default() };
        assert_eq!(t.validate(), Err(ConfigError::LimitingDegeneracy(6)));
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let t = Thresholds { tm_min_threshold: 80.0, ..Default::default() };
        assert!(matches!(t.validate(), Err(ConfigError::TmRange { .. })));
        let t = Thresholds { nm_threshold: f64::NAN, ..Default::default() };
        assert!(matches!(t.validate(), Err(ConfigError::NonFinite { name: "nm_threshold", .. })));
        let w = AmpliconWindow { min: 600, max: 50 };
        assert_eq!(w.validate(), Err(ConfigError::AmpliconRange { min: 600, max: 50 }));
        assert_eq!(AmpliconWindow { min: -1, max: 5 }.validate(), Err(ConfigError::NegativeAmplicon(-1)));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let w = AmpliconWindow { min: 20, max: 30 };
        assert!(w.contains(20) && w.contains(30) && w.contains(25));
        assert!(!w.contains(19) && !w.contains(31));
    }
}
