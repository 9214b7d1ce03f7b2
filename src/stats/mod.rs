//! Comparative statistics over enriched reviews.
//!
//! - Bootstrap percentile intervals for group means ([`bootstrap`])
//! - Rank tests: Kruskal–Wallis H and Mann–Whitney U ([`hypothesis`])
//! - Cliff's delta effect sizes ([`effect_size`])
//! - Per-entity, per-topic and per-aspect comparisons ([`compare`])
//!
//! # Examples
//!
//! ```
//! use reviewlens::stats::{mean, median, std_dev};
//!
//! let data = [1.0, 2.0, 3.0, 4.0];
//! assert_eq!(mean(&data), Some(2.5));
//! assert_eq!(median(&data), Some(2.5));
//! assert!((std_dev(&data).expect("n >= 2") - 1.290_994).abs() < 1e-6);
//! ```

pub mod bootstrap;
pub mod compare;
pub mod effect_size;
pub mod hypothesis;

pub use bootstrap::{Bootstrap, BootstrapEstimate};
pub use compare::{
    ComparativeStatistics, ComparisonSet, Estimate, GroupEstimate, Metric, PairwiseComparison,
    PairwiseTest, ScoreBaseline, Scope, StatisticsReport,
};
pub use effect_size::{cliffs_delta, CliffsDelta, EffectMagnitude};
pub use hypothesis::{
    kruskal_wallis, mann_whitney_u, KruskalWallisResult, MannWhitneyResult, OmnibusTest,
};

/// Arithmetic mean; `None` for empty input.
#[must_use]
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Median (mean of the two middle values for even lengths).
#[must_use]
pub fn median(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Sample standard deviation (n - 1 denominator); `None` below two values.
#[must_use]
pub fn std_dev(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    let m = mean(data)?;
    let ss: f64 = data.iter().map(|x| (x - m) * (x - m)).sum();
    Some((ss / (data.len() - 1) as f64).sqrt())
}

/// Linear-interpolation quantile of sorted data (R-7).
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let h = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    Some(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}
