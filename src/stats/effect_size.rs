//! Cliff's delta: ordinal effect size between two samples.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Conventional magnitude bands for |delta|.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectMagnitude {
    /// |delta| < 0.147
    Negligible,
    /// |delta| < 0.33
    Small,
    /// |delta| < 0.474
    Medium,
    /// |delta| ≥ 0.474
    Large,
}

impl EffectMagnitude {
    /// Band of a delta value.
    #[must_use]
    pub fn of(delta: f64) -> Self {
        let d = delta.abs();
        if d < 0.147 {
            EffectMagnitude::Negligible
        } else if d < 0.33 {
            EffectMagnitude::Small
        } else if d < 0.474 {
            EffectMagnitude::Medium
        } else {
            EffectMagnitude::Large
        }
    }
}

impl fmt::Display for EffectMagnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EffectMagnitude::Negligible => "negligible",
            EffectMagnitude::Small => "small",
            EffectMagnitude::Medium => "medium",
            EffectMagnitude::Large => "large",
        };
        f.write_str(s)
    }
}

/// Delta in [-1, 1] with its magnitude band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CliffsDelta {
    /// `P(a > b) - P(a < b)`
    pub delta: f64,
    /// Band of |delta|
    pub magnitude: EffectMagnitude,
}

/// Cliff's delta of `a` over `b`; `None` when either is empty.
///
/// Sorts `b` once and counts dominance with binary searches, O((n + m) log m).
///
/// # Examples
///
/// ```
/// use reviewlens::stats::{cliffs_delta, EffectMagnitude};
///
/// let d = cliffs_delta(&[3.0, 4.0], &[1.0, 2.0]).expect("non-empty");
/// assert_eq!(d.delta, 1.0);
/// assert_eq!(d.magnitude, EffectMagnitude::Large);
/// ```
#[must_use]
pub fn cliffs_delta(a: &[f64], b: &[f64]) -> Option<CliffsDelta> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let mut sorted = b.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut greater = 0usize;
    let mut less = 0usize;
    for &x in a {
        let below = sorted.partition_point(|&y| y.total_cmp(&x) == Ordering::Less);
        let not_above = sorted.partition_point(|&y| y.total_cmp(&x) != Ordering::Greater);
        greater += below;
        less += sorted.len() - not_above;
    }

    let delta = (greater as f64 - less as f64) / (a.len() * b.len()) as f64;
    Some(CliffsDelta {
        delta,
        magnitude: EffectMagnitude::of(delta),
    })
}
