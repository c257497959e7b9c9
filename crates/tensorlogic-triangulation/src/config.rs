//! Triangulation configuration.
//!
//! The two numeric knobs tune the greedy elimination heuristic. They are
//! tunables inherited from the classic static triangulation, not values
//! with a principled derivation.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TriangulationError};

/// Default upper bound on the fraction of missing edges in the
/// neighbourhood of a quasi-simplicial node.
pub const DEFAULT_QUASI_RATIO: f64 = 0.01;

/// Default slack allowed above the current tree width when eliminating an
/// almost or quasi simplicial node.
pub const DEFAULT_WEIGHT_THRESHOLD: f64 = 0.0;

/// Configuration of a [`Triangulation`](crate::Triangulation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriangulationConfig {
    /// Remove redundant fill-ins after the greedy pass (recursive thinning)
    pub minimality: bool,

    /// Max fraction of missing neighbourhood edges for a quasi-simplicial node, in \[0,1\]
    pub quasi_ratio: f64,

    /// Almost/quasi simplicial nodes are eligible only if their clique weight
    /// is at most `log tree width + ln(1 + weight_threshold)`
    pub weight_threshold: f64,

    /// Keep the set of fill-in edges available to callers
    pub track_fill_ins: bool,
}

impl Default for TriangulationConfig {
    fn default() -> Self {
        Self {
            minimality: false,
            quasi_ratio: DEFAULT_QUASI_RATIO,
            weight_threshold: DEFAULT_WEIGHT_THRESHOLD,
            track_fill_ins: false,
        }
    }
}

impl TriangulationConfig {
    /// Configuration producing minimal triangulations, as required for
    /// maximal prime subgraph decompositions.
    pub fn minimal() -> Self {
        Self::default().with_minimality(true)
    }

    pub fn with_minimality(mut self, minimality: bool) -> Self {
        self.minimality = minimality;
        self
    }

    pub fn with_quasi_ratio(mut self, quasi_ratio: f64) -> Self {
        self.quasi_ratio = quasi_ratio;
        self
    }

    pub fn with_weight_threshold(mut self, weight_threshold: f64) -> Self {
        self.weight_threshold = weight_threshold;
        self
    }

    pub fn with_fill_ins_tracking(mut self, track_fill_ins: bool) -> Self {
        self.track_fill_ins = track_fill_ins;
        self
    }

    /// Check that the numeric parameters are usable.
    pub fn validate(&self) -> Result<()> {
        if !self.quasi_ratio.is_finite() || !(0.0..=1.0).contains(&self.quasi_ratio) {
            return Err(TriangulationError::InvalidConfig(format!(
                "quasi_ratio must lie in [0, 1], got {}",
                self.quasi_ratio
            )));
        }
        if !self.weight_threshold.is_finite() || self.weight_threshold < 0.0 {
            return Err(TriangulationError::InvalidConfig(format!(
                "weight_threshold must be finite and non-negative, got {}",
                self.weight_threshold
            )));
        }
        Ok(())
    }

    /// `ln(1 + weight_threshold)`, the slack used in log space.
    pub(crate) fn log_threshold(&self) -> f64 {
        self.weight_threshold.ln_1p()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TriangulationConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.minimality);
        assert!(!config.track_fill_ins);
        assert_eq!(config.log_threshold(), 0.0);
    }

    #[test]
    fn test_builder() {
        let config = TriangulationConfig::minimal()
            .with_quasi_ratio(0.25)
            .with_weight_threshold(1.5)
            .with_fill_ins_tracking(true);
        assert!(config.minimality);
        assert!(config.track_fill_ins);
        assert_eq!(config.quasi_ratio, 0.25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_values_rejected() {
        let config = TriangulationConfig::default().with_quasi_ratio(-0.1);
        assert!(matches!(
            config.validate(),
            Err(TriangulationError::InvalidConfig(_))
        ));

        let config = TriangulationConfig::default().with_weight_threshold(-1.0);
        assert!(config.validate().is_err());

        let config = TriangulationConfig::default().with_quasi_ratio(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TriangulationConfig = serde_json::from_str(r#"{"minimality": true}"#).unwrap();
        assert!(config.minimality);
        assert_eq!(config.quasi_ratio, DEFAULT_QUASI_RATIO);
        assert_eq!(config.weight_threshold, DEFAULT_WEIGHT_THRESHOLD);
    }
}
