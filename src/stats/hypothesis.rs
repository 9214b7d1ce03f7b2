//! Rank-based hypothesis tests.
//!
//! # Tests
//!
//! - **Kruskal–Wallis H**: do k ≥ 2 independent groups share a distribution?
//!   Tie-corrected, p-value from χ² with k - 1 degrees of freedom.
//! - **Mann–Whitney U**: two-group version, normal approximation with tie
//!   correction and continuity correction.
//!
//! # Example
//!
//! ```
//! use reviewlens::stats::hypothesis::{kruskal_wallis, mann_whitney_u};
//!
//! let low = [0.1, 0.2, 0.15, 0.3, 0.25];
//! let high = [0.8, 0.9, 0.85, 0.7, 0.95];
//!
//! let u = mann_whitney_u(&low, &high).expect("non-empty groups");
//! assert!(u.p_value < 0.05);
//!
//! let h = kruskal_wallis(&[&low, &high]).expect("two groups");
//! assert_eq!(h.df, 1);
//! ```

use crate::error::{InsightError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Result of a Kruskal–Wallis test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KruskalWallisResult {
    /// Tie-corrected H statistic
    pub h: f64,
    /// p-value
    pub p_value: f64,
    /// Degrees of freedom (groups - 1)
    pub df: usize,
}

/// Result of a Mann–Whitney U test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MannWhitneyResult {
    /// U of the first sample
    pub u: f64,
    /// Standardized statistic
    pub z: f64,
    /// Two-sided p-value
    pub p_value: f64,
}

/// Omnibus test chosen for a set of groups.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum OmnibusTest {
    /// Three or more groups
    KruskalWallis(KruskalWallisResult),
    /// Exactly two groups
    MannWhitneyU(MannWhitneyResult),
}

impl OmnibusTest {
    /// Pick the test by group count.
    ///
    /// # Errors
    ///
    /// Fails with fewer than two groups or an empty group.
    pub fn for_groups(groups: &[&[f64]]) -> Result<Self> {
        match groups {
            [a, b] => Ok(OmnibusTest::MannWhitneyU(mann_whitney_u(a, b)?)),
            _ => Ok(OmnibusTest::KruskalWallis(kruskal_wallis(groups)?)),
        }
    }

    /// p-value of whichever test ran.
    #[must_use]
    pub fn p_value(&self) -> f64 {
        match self {
            OmnibusTest::KruskalWallis(r) => r.p_value,
            OmnibusTest::MannWhitneyU(r) => r.p_value,
        }
    }
}

/// Kruskal–Wallis H test across `groups`.
///
/// # Errors
///
/// Fails with fewer than two groups or an empty group.
pub fn kruskal_wallis(groups: &[&[f64]]) -> Result<KruskalWallisResult> {
    if groups.len() < 2 {
        return Err(InsightError::Other(
            "Kruskal-Wallis needs at least two groups".to_string(),
        ));
    }
    if groups.iter().any(|g| g.is_empty()) {
        return Err(InsightError::Other(
            "Kruskal-Wallis groups must be non-empty".to_string(),
        ));
    }

    let pooled: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let (ranks, tie_sum) = rank_with_ties(&pooled);
    let n = pooled.len() as f64;

    let mut offset = 0;
    let mut sum_term = 0.0;
    for group in groups {
        let r: f64 = ranks[offset..offset + group.len()].iter().sum();
        sum_term += r * r / group.len() as f64;
        offset += group.len();
    }

    let df = groups.len() - 1;
    let h_raw = 12.0 / (n * (n + 1.0)) * sum_term - 3.0 * (n + 1.0);
    let correction = 1.0 - tie_sum / (n * n * n - n);
    if correction <= 0.0 {
        // every value tied
        return Ok(KruskalWallisResult {
            h: 0.0,
            p_value: 1.0,
            df,
        });
    }
    let h = (h_raw / correction).max(0.0);
    Ok(KruskalWallisResult {
        h,
        p_value: chi_square_pvalue(h, df),
        df,
    })
}

/// Two-sided Mann–Whitney U test of `a` against `b`.
///
/// # Errors
///
/// Fails when either sample is empty.
pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> Result<MannWhitneyResult> {
    if a.is_empty() || b.is_empty() {
        return Err(InsightError::Other(
            "Mann-Whitney U samples must be non-empty".to_string(),
        ));
    }
    let pooled: Vec<f64> = a.iter().chain(b).copied().collect();
    let (ranks, tie_sum) = rank_with_ties(&pooled);
    let n1 = a.len() as f64;
    let n2 = b.len() as f64;
    let n = n1 + n2;

    let r1: f64 = ranks[..a.len()].iter().sum();
    let u = r1 - n1 * (n1 + 1.0) / 2.0;
    let mu = n1 * n2 / 2.0;
    let variance = n1 * n2 / 12.0 * ((n + 1.0) - tie_sum / (n * (n - 1.0)));
    if n < 2.0 || variance <= 0.0 {
        return Ok(MannWhitneyResult {
            u,
            z: 0.0,
            p_value: 1.0,
        });
    }

    let diff = u - mu;
    let corrected = (diff.abs() - 0.5).max(0.0) * diff.signum();
    let z = corrected / variance.sqrt();
    Ok(MannWhitneyResult {
        u,
        z,
        p_value: (2.0 * normal_sf(z.abs())).min(1.0),
    })
}

/// Average ranks (1-based) and `Σ (t³ - t)` over tie groups.
fn rank_with_ties(values: &[f64]) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    let mut ranks = vec![0.0; values.len()];
    let mut tie_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let avg = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg;
        }
        let t = (end - start) as f64;
        tie_sum += t * t * t - t;
        start = end;
    }
    (ranks, tie_sum)
}

// ============================================================================
// Distribution tails
// ============================================================================

/// Upper tail of χ² with `df` degrees of freedom.
fn chi_square_pvalue(chi2: f64, df: usize) -> f64 {
    if chi2 <= 0.0 {
        return 1.0;
    }
    upper_incomplete_gamma(df as f64 / 2.0, chi2 / 2.0).clamp(0.0, 1.0)
}

/// Upper tail of the standard normal.
fn normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / std::f64::consts::SQRT_2)
}

/// Complementary error function (Chebyshev fit, |error| < 1.2e-7).
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let ans = t * poly.exp();
    if x >= 0.0 {
        ans
    } else {
        2.0 - ans
    }
}

/// Regularized upper incomplete gamma `Q(a, x)`.
///
/// Series below `a + 1`, Lentz continued fraction above.
fn upper_incomplete_gamma(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    let log_prefix = a * x.ln() - x - ln_gamma(a);
    if x < a + 1.0 {
        let mut sum = 1.0 / a;
        let mut term = sum;
        for n in 1..500 {
            term *= x / (a + f64::from(n));
            sum += term;
            if term.abs() < sum.abs() * 1e-15 {
                break;
            }
        }
        1.0 - sum * log_prefix.exp()
    } else {
        let tiny = 1e-300;
        let mut b = x + 1.0 - a;
        let mut c = 1.0 / tiny;
        let mut d = 1.0 / b;
        let mut h = d;
        for i in 1..500 {
            let i = f64::from(i);
            let an = -i * (i - a);
            b += 2.0;
            d = an * d + b;
            if d.abs() < tiny {
                d = tiny;
            }
            c = b + an / c;
            if c.abs() < tiny {
                c = tiny;
            }
            d = 1.0 / d;
            let del = d * c;
            h *= del;
            if (del - 1.0).abs() < 1e-15 {
                break;
            }
        }
        log_prefix.exp() * h
    }
}

/// ln Γ(z) (Lanczos approximation).
fn ln_gamma(z: f64) -> f64 {
    if z < 0.5 {
        // Reflection formula: Γ(z) = π / (sin(πz) * Γ(1-z))
        (PI / (PI * z).sin()).ln() - ln_gamma(1.0 - z)
    } else {
        let z = z - 1.0;
        let tmp = z + 5.5;
        let tmp = (z + 0.5) * tmp.ln() - tmp;
        let ser = 1.000_000_000_190_015 + 76.180_091_729_471_46 / (z + 1.0)
            - 86.505_320_329_416_77 / (z + 2.0)
            + 24.014_098_240_830_91 / (z + 3.0)
            - 1.231_739_572_450_155 / (z + 4.0)
            + 0.001_208_650_973_866_179 / (z + 5.0)
            - 0.000_005_395_239_384_953 / (z + 6.0);
        tmp + (2.0 * PI).sqrt().ln() + ser.ln()
    }
}
