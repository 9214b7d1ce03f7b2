//! Residual between text sentiment and the reviewer's own score.
//!
//! Scores 1..=10 map linearly onto [-1, 1] (`(score - 5.5) / 4.5`), so the
//! residual `compound - normalized_score` lies in [-2, 2]. A positive residual
//! means the text reads warmer than the number the reviewer gave.

use crate::config::DivergenceConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Magnitude class of a residual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResidualBucket {
    /// Up to the first threshold, zero included
    Low,
    /// Up to the second threshold
    Medium,
    /// Up to the third threshold
    High,
    /// Beyond the third threshold
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl ResidualBucket {
    /// Display label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ResidualBucket::Low => "Low",
            ResidualBucket::Medium => "Medium",
            ResidualBucket::High => "High",
            ResidualBucket::VeryHigh => "Very High",
        }
    }

    /// High or Very High.
    #[must_use]
    pub fn is_high(self) -> bool {
        matches!(self, ResidualBucket::High | ResidualBucket::VeryHigh)
    }
}

impl fmt::Display for ResidualBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Divergence of one review.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Divergence {
    /// Score mapped onto [-1, 1]
    pub normalized_score: f64,
    /// `compound - normalized_score`
    pub residual: f64,
    /// Bucket of `|residual|`
    pub bucket: ResidualBucket,
}

/// Map a 1..=10 score onto [-1, 1].
#[must_use]
pub fn normalize_score(score: f64) -> f64 {
    (score - 5.5) / 4.5
}

/// Computes divergence with configured bucket edges.
#[derive(Debug, Clone, PartialEq)]
pub struct DivergenceCalculator {
    thresholds: [f64; 3],
}

impl Default for DivergenceCalculator {
    fn default() -> Self {
        Self {
            thresholds: crate::config::DEFAULT_RESIDUAL_THRESHOLDS,
        }
    }
}

impl DivergenceCalculator {
    /// Calculator with the default edges `[0.2, 0.5, 1.0]`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculator from configuration.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` unless the thresholds are three ascending positive values.
    pub fn from_config(config: &DivergenceConfig) -> Result<Self> {
        config.validate()?;
        let t = &config.residual_bucket_thresholds;
        Ok(Self {
            thresholds: [t[0], t[1], t[2]],
        })
    }

    /// Bucket edges.
    #[must_use]
    pub fn thresholds(&self) -> [f64; 3] {
        self.thresholds
    }

    /// Bucket of a residual magnitude. Buckets are right-closed: an edge
    /// belongs to the bucket below it.
    #[must_use]
    pub fn bucket(&self, residual: f64) -> ResidualBucket {
        let magnitude = residual.abs();
        let [low, medium, high] = self.thresholds;
        if magnitude <= low {
            ResidualBucket::Low
        } else if magnitude <= medium {
            ResidualBucket::Medium
        } else if magnitude <= high {
            ResidualBucket::High
        } else {
            ResidualBucket::VeryHigh
        }
    }

    /// Divergence for one review. `None` when the score is absent.
    #[must_use]
    pub fn compute(&self, user_score: Option<u8>, compound: f64) -> Option<Divergence> {
        let score = user_score?;
        let normalized_score = normalize_score(f64::from(score));
        let residual = (compound.clamp(-1.0, 1.0) - normalized_score).clamp(-2.0, 2.0);
        Some(Divergence {
            normalized_score,
            residual,
            bucket: self.bucket(residual),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_score_range() {
        assert!((normalize_score(1.0) + 1.0).abs() < 1e-12);
        assert!((normalize_score(10.0) - 1.0).abs() < 1e-12);
        assert!(normalize_score(5.5).abs() < 1e-12);
    }

    #[test]
    fn test_missing_score_is_none() {
        assert!(DivergenceCalculator::new().compute(None, 0.9).is_none());
    }

    #[test]
    fn test_scenario_residuals() {
        let calc = DivergenceCalculator::new();
        let a = calc.compute(Some(9), 0.8271).expect("scored");
        assert!((a.normalized_score - 7.0 / 9.0).abs() < 1e-12);
        assert!((a.residual - (0.8271 - 7.0 / 9.0)).abs() < 1e-12);
        assert_eq!(a.bucket, ResidualBucket::Low);

        let c = calc.compute(Some(2), -0.7845).expect("scored");
        assert_eq!(c.bucket, ResidualBucket::Low);

        let warm_text_low_score = calc.compute(Some(1), 0.9).expect("scored");
        assert!((warm_text_low_score.residual - 1.9).abs() < 1e-12);
        assert_eq!(warm_text_low_score.bucket, ResidualBucket::VeryHigh);
    }

    #[test]
    fn test_bucket_edges() {
        let calc = DivergenceCalculator::new();
        assert_eq!(calc.bucket(0.0), ResidualBucket::Low);
        assert_eq!(calc.bucket(0.19), ResidualBucket::Low);
        assert_eq!(calc.bucket(0.2), ResidualBucket::Low);
        assert_eq!(calc.bucket(0.21), ResidualBucket::Medium);
        assert_eq!(calc.bucket(-0.5), ResidualBucket::Medium);
        assert_eq!(calc.bucket(0.51), ResidualBucket::High);
        assert_eq!(calc.bucket(1.0), ResidualBucket::High);
        assert_eq!(calc.bucket(-1.0), ResidualBucket::High);
        assert_eq!(calc.bucket(1.01), ResidualBucket::VeryHigh);
        assert!(calc.bucket(-1.5).is_high());
    }

    #[test]
    fn test_neutral_text_at_extreme_scores_is_high() {
        let calc = DivergenceCalculator::new();
        let top = calc.compute(Some(10), 0.0).expect("scored");
        assert!((top.residual + 1.0).abs() < 1e-12);
        assert_eq!(top.bucket, ResidualBucket::High);

        let bottom = calc.compute(Some(1), 0.0).expect("scored");
        assert!((bottom.residual - 1.0).abs() < 1e-12);
        assert_eq!(bottom.bucket, ResidualBucket::High);
    }

    #[test]
    fn test_from_config() {
        let config = DivergenceConfig {
            residual_bucket_thresholds: vec![0.1, 0.3, 0.6],
        };
        let calc = DivergenceCalculator::from_config(&config).expect("valid");
        assert_eq!(calc.bucket(0.35), ResidualBucket::High);

        let bad = DivergenceConfig {
            residual_bucket_thresholds: vec![0.5, 0.2, 1.0],
        };
        assert!(DivergenceCalculator::from_config(&bad).is_err());
    }

    #[test]
    fn test_bucket_serializes_with_space() {
        let json = serde_json::to_string(&ResidualBucket::VeryHigh).expect("serialize");
        assert_eq!(json, "\"Very High\"");
    }

    proptest! {
        #[test]
        fn prop_residual_bounded(score in 1u8..=10, compound in -1.0f64..=1.0) {
            let d = DivergenceCalculator::new().compute(Some(score), compound).expect("scored");
            prop_assert!((-2.0..=2.0).contains(&d.residual));
            prop_assert!((-1.0..=1.0).contains(&d.normalized_score));
        }
    }
}
