//! Percentile bootstrap for the mean.

use super::{mean, quantile_sorted};
use crate::config::StatsConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Point estimate with a percentile confidence interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapEstimate {
    /// Sample mean
    pub mean: f64,
    /// Lower interval bound
    pub ci_lower: f64,
    /// Upper interval bound
    pub ci_upper: f64,
    /// Nominal coverage
    pub confidence_level: f64,
    /// Sample size
    pub n: usize,
}

impl BootstrapEstimate {
    /// Interval width.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.ci_upper - self.ci_lower
    }
}

/// Resampling settings. Every call reseeds, so the same sample always
/// produces the same interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Bootstrap {
    resamples: usize,
    seed: u64,
    confidence_level: f64,
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self::from_config(&StatsConfig::default())
    }
}

impl Bootstrap {
    /// Bootstrap with a 95% interval.
    #[must_use]
    pub fn new(resamples: usize, seed: u64) -> Self {
        Self {
            resamples: resamples.max(1),
            seed,
            confidence_level: 0.95,
        }
    }

    /// From the stats section of the configuration.
    #[must_use]
    pub fn from_config(config: &StatsConfig) -> Self {
        Self::new(config.bootstrap_resamples, config.random_seed)
            .with_confidence_level(config.confidence_level)
    }

    /// Set the interval coverage.
    #[must_use]
    pub fn with_confidence_level(mut self, level: f64) -> Self {
        self.confidence_level = level;
        self
    }

    /// Mean of `sample` with its percentile interval; `None` when empty.
    #[must_use]
    pub fn mean_ci(&self, sample: &[f64]) -> Option<BootstrapEstimate> {
        let point = mean(sample)?;
        let n = sample.len();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut means: Vec<f64> = (0..self.resamples)
            .map(|_| {
                let total: f64 = (0..n).map(|_| sample[rng.gen_range(0..n)]).sum();
                total / n as f64
            })
            .collect();
        means.sort_by(f64::total_cmp);

        let tail = (1.0 - self.confidence_level) / 2.0;
        Some(BootstrapEstimate {
            mean: point,
            ci_lower: quantile_sorted(&means, tail)?,
            ci_upper: quantile_sorted(&means, 1.0 - tail)?,
            confidence_level: self.confidence_level,
            n,
        })
    }
}
