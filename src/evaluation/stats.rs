//! Classical tests for comparing strategies
//!
//! Pairwise tests take two equally long samples, one value per dataset.
//! Multi-strategy tests take a matrix with one row per strategy and one column
//! per dataset. All p-values are two-sided.
//!
//! Distribution functions come from `statrs`; the studentized range
//! distribution (infinite degrees of freedom) is integrated numerically.

use super::ranking::{average_ranks, tie_group_sizes, SortOrder};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{
    Binomial, ChiSquared, Continuous, ContinuousCDF, Discrete, Normal, StudentsT,
};

/// Largest sample for which the exact signed-rank distribution is used.
pub const WILCOXON_EXACT_MAX_N: usize = 25;

/// Relative slack when collecting binomial outcomes as extreme as observed.
const PMF_TOLERANCE: f64 = 1e-7;

/// Simpson intervals for the studentized range integral (must be even).
const RANGE_INTERVALS: usize = 4000;
const RANGE_LIMIT: f64 = 8.0;

/// Statistic and two-sided p-value of a test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Test statistic
    pub statistic: f64,
    /// Two-sided p-value
    pub p_value: f64,
}

/// Friedman test outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriedmanResult {
    /// Tie-corrected chi-square statistic
    pub statistic: f64,
    /// Upper tail probability of the chi-square distribution
    pub p_value: f64,
    /// Degrees of freedom (`k - 1`)
    pub degrees_of_freedom: usize,
    /// Average rank of each strategy over datasets (1 = best)
    pub average_ranks: Vec<f64>,
}

fn stats_error(e: impl std::fmt::Display) -> Error {
    Error::Statistics(e.to_string())
}

fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(stats_error)
}

fn check_paired(a: &[f64], b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(Error::InvalidInput(format!(
            "Paired samples differ in length: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    if a.iter().chain(b).any(|v| !v.is_finite()) {
        return Err(Error::InvalidInput(
            "Samples must contain only finite values".to_string(),
        ));
    }
    Ok(())
}

/// Paired t-test on `a - b`.
///
/// When every difference is equal the statistic is 0 (p = 1) if they are all
/// zero and infinite (p = 0) otherwise.
///
/// # Errors
///
/// Returns `InvalidInput` for mismatched lengths, non-finite values or fewer
/// than two pairs.
#[allow(clippy::cast_precision_loss)]
pub fn paired_t_test(a: &[f64], b: &[f64]) -> Result<TestResult> {
    check_paired(a, b)?;
    let n = a.len();
    if n < 2 {
        return Err(Error::InvalidInput(
            "Paired t-test needs at least two pairs".to_string(),
        ));
    }

    let diffs: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
    let nf = n as f64;
    let mean = diffs.iter().sum::<f64>() / nf;
    let variance = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (nf - 1.0);
    let sd = variance.sqrt();

    if sd == 0.0 {
        return Ok(if mean == 0.0 {
            TestResult {
                statistic: 0.0,
                p_value: 1.0,
            }
        } else {
            TestResult {
                statistic: mean.signum() * f64::INFINITY,
                p_value: 0.0,
            }
        });
    }

    let statistic = mean / (sd / nf.sqrt());
    let dist = StudentsT::new(0.0, 1.0, nf - 1.0).map_err(stats_error)?;
    let p_value = (2.0 * dist.sf(statistic.abs())).min(1.0);
    Ok(TestResult { statistic, p_value })
}

/// Exact sign test. The statistic is the number of pairs where `a > b`.
///
/// Ties are dropped; with no untied pairs the p-value is 1.
///
/// # Errors
///
/// Returns `InvalidInput` for mismatched lengths or non-finite values.
#[allow(clippy::cast_precision_loss)]
pub fn sign_test(a: &[f64], b: &[f64]) -> Result<TestResult> {
    check_paired(a, b)?;
    let wins = a.iter().zip(b).filter(|(x, y)| x > y).count() as u64;
    let losses = a.iter().zip(b).filter(|(x, y)| x < y).count() as u64;
    let n = wins + losses;
    if n == 0 {
        return Ok(TestResult {
            statistic: 0.0,
            p_value: 1.0,
        });
    }

    let dist = Binomial::new(0.5, n).map_err(stats_error)?;
    let observed = dist.pmf(wins);
    let p_value: f64 = (0..=n)
        .map(|k| dist.pmf(k))
        .filter(|&pmf| pmf <= observed * (1.0 + PMF_TOLERANCE))
        .sum();

    Ok(TestResult {
        statistic: wins as f64,
        p_value: p_value.min(1.0),
    })
}

/// Wilcoxon rank-sum test (normal approximation, no tie correction).
///
/// The statistic is the z-score of the rank sum of `a` in the pooled sample.
///
/// # Errors
///
/// Returns `InvalidInput` if either sample is empty or contains non-finite
/// values.
#[allow(clippy::cast_precision_loss)]
pub fn rank_sum_test(a: &[f64], b: &[f64]) -> Result<TestResult> {
    if a.is_empty() || b.is_empty() {
        return Err(Error::InvalidInput(
            "Rank-sum test needs two non-empty samples".to_string(),
        ));
    }
    if a.iter().chain(b).any(|v| !v.is_finite()) {
        return Err(Error::InvalidInput(
            "Samples must contain only finite values".to_string(),
        ));
    }

    let pooled: Vec<f64> = a.iter().chain(b).copied().collect();
    let ranks = average_ranks(&pooled, SortOrder::Ascending);
    let rank_sum: f64 = ranks[..a.len()].iter().sum();

    let n1 = a.len() as f64;
    let n2 = b.len() as f64;
    let expected = n1 * (n1 + n2 + 1.0) / 2.0;
    let sd = (n1 * n2 * (n1 + n2 + 1.0) / 12.0).sqrt();
    let statistic = (rank_sum - expected) / sd;

    let p_value = (2.0 * standard_normal()?.sf(statistic.abs())).min(1.0);
    Ok(TestResult { statistic, p_value })
}

/// Wilcoxon signed-rank test on `a - b`.
///
/// Zero differences are dropped. The statistic is `min(W+, W-)`. Small
/// samples without tied magnitudes use the exact null distribution; the rest
/// use the tie-corrected normal approximation. When every difference is zero
/// there is no evidence either way: statistic 0, p = 1.
///
/// # Errors
///
/// Returns `InvalidInput` for mismatched lengths or non-finite values.
#[allow(clippy::cast_precision_loss)]
pub fn wilcoxon_signed_rank_test(a: &[f64], b: &[f64]) -> Result<TestResult> {
    check_paired(a, b)?;
    let diffs: Vec<f64> = a
        .iter()
        .zip(b)
        .map(|(x, y)| x - y)
        .filter(|d| *d != 0.0)
        .collect();
    let n = diffs.len();
    if n == 0 {
        return Ok(TestResult {
            statistic: 0.0,
            p_value: 1.0,
        });
    }

    let magnitudes: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
    let ranks = average_ranks(&magnitudes, SortOrder::Ascending);
    let w_plus: f64 = diffs
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();
    let nf = n as f64;
    let w_minus = nf * (nf + 1.0) / 2.0 - w_plus;
    let statistic = w_plus.min(w_minus);

    let ties = tie_group_sizes(&magnitudes);
    let has_ties = ties.iter().any(|&t| t > 1);

    let p_value = if n <= WILCOXON_EXACT_MAX_N && !has_ties {
        signed_rank_lower_tail(n, statistic)
    } else {
        let tie_term: f64 = ties
            .iter()
            .map(|&t| {
                let t = t as f64;
                t.powi(3) - t
            })
            .sum::<f64>()
            / 48.0;
        let variance = nf * (nf + 1.0) * (2.0 * nf + 1.0) / 24.0 - tie_term;
        let z = (statistic - nf * (nf + 1.0) / 4.0) / variance.sqrt();
        standard_normal()?.cdf(-z.abs())
    };

    Ok(TestResult {
        statistic,
        p_value: (2.0 * p_value).min(1.0),
    })
}

/// `P(W <= w)` for the signed-rank statistic of `n` untied differences.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn signed_rank_lower_tail(n: usize, w: f64) -> f64 {
    let max_sum = n * (n + 1) / 2;
    // counts[s] = number of rank subsets summing to s
    let mut counts = vec![0_u64; max_sum + 1];
    counts[0] = 1;
    for rank in 1..=n {
        for s in (rank..=max_sum).rev() {
            counts[s] += counts[s - rank];
        }
    }

    let limit = (w.floor().max(0.0) as usize).min(max_sum);
    let below: u64 = counts[..=limit].iter().sum();
    below as f64 / 2_f64.powi(n as i32)
}

fn check_matrix(scores: &[Vec<f64>]) -> Result<(usize, usize)> {
    let k = scores.len();
    let n = scores.first().map_or(0, Vec::len);
    if scores.iter().any(|row| row.len() != n) {
        return Err(Error::InvalidInput(
            "Every strategy needs one score per dataset".to_string(),
        ));
    }
    if scores.iter().flatten().any(|v| !v.is_finite()) {
        return Err(Error::InvalidInput(
            "Scores must contain only finite values".to_string(),
        ));
    }
    Ok((k, n))
}

/// Rank strategies within each dataset and return (rank sums, tie sizes).
fn rank_columns(scores: &[Vec<f64>], order: SortOrder) -> (Vec<f64>, Vec<usize>) {
    let k = scores.len();
    let n = scores.first().map_or(0, Vec::len);
    let mut rank_sums = vec![0.0; k];
    let mut ties = Vec::new();
    for dataset in 0..n {
        let column: Vec<f64> = scores.iter().map(|row| row[dataset]).collect();
        for (sum, rank) in rank_sums.iter_mut().zip(average_ranks(&column, order)) {
            *sum += rank;
        }
        ties.extend(tie_group_sizes(&column));
    }
    (rank_sums, ties)
}

/// Friedman test over a strategies × datasets score matrix.
///
/// `order` only affects the reported average ranks; the statistic is the same
/// in either direction.
///
/// # Errors
///
/// Returns `InvalidInput` for fewer than three strategies, fewer than two
/// datasets, ragged rows or non-finite values, and `Statistics` when every
/// dataset ties all strategies.
#[allow(clippy::cast_precision_loss)]
pub fn friedman_test(scores: &[Vec<f64>], order: SortOrder) -> Result<FriedmanResult> {
    let (k, n) = check_matrix(scores)?;
    if k < 3 {
        return Err(Error::InvalidInput(format!(
            "Friedman test needs at least 3 strategies, got {k}"
        )));
    }
    if n < 2 {
        return Err(Error::InvalidInput(format!(
            "Friedman test needs at least 2 datasets, got {n}"
        )));
    }

    let (rank_sums, ties) = rank_columns(scores, order);
    let kf = k as f64;
    let nf = n as f64;

    let sum_sq: f64 = rank_sums.iter().map(|r| r * r).sum();
    let raw = 12.0 / (nf * kf * (kf + 1.0)) * sum_sq - 3.0 * nf * (kf + 1.0);

    let tie_sum: f64 = ties
        .iter()
        .map(|&t| {
            let t = t as f64;
            t.powi(3) - t
        })
        .sum();
    let correction = 1.0 - tie_sum / (nf * kf * (kf * kf - 1.0));
    if correction <= 0.0 {
        return Err(Error::Statistics(
            "All strategies tie on every dataset".to_string(),
        ));
    }
    let statistic = raw / correction;

    let df = k - 1;
    let dist = ChiSquared::new(df as f64).map_err(stats_error)?;
    let p_value = dist.sf(statistic.max(0.0));

    Ok(FriedmanResult {
        statistic,
        p_value,
        degrees_of_freedom: df,
        average_ranks: rank_sums.iter().map(|r| r / nf).collect(),
    })
}

/// Nemenyi post-hoc test from average ranks over `n_datasets` datasets.
///
/// Returns a symmetric `k × k` matrix of p-values with ones on the diagonal.
///
/// # Errors
///
/// Returns `InvalidInput` for fewer than two strategies or zero datasets.
#[allow(clippy::cast_precision_loss)]
pub fn nemenyi_test(average_ranks: &[f64], n_datasets: usize) -> Result<Vec<Vec<f64>>> {
    let k = average_ranks.len();
    if k < 2 {
        return Err(Error::InvalidInput(
            "Nemenyi test needs at least 2 strategies".to_string(),
        ));
    }
    if n_datasets == 0 {
        return Err(Error::InvalidInput(
            "Nemenyi test needs at least 1 dataset".to_string(),
        ));
    }

    let kf = k as f64;
    let se = (kf * (kf + 1.0) / (6.0 * n_datasets as f64)).sqrt();
    let normal = standard_normal()?;

    let mut p_values = vec![vec![1.0; k]; k];
    for i in 0..k {
        for j in (i + 1)..k {
            let q = (average_ranks[i] - average_ranks[j]).abs() / se * std::f64::consts::SQRT_2;
            let p = (1.0 - range_cdf(&normal, q, k)).clamp(0.0, 1.0);
            p_values[i][j] = p;
            p_values[j][i] = p;
        }
    }
    Ok(p_values)
}

/// CDF of the studentized range of `k` standard normals (infinite df).
///
/// # Errors
///
/// Returns `InvalidInput` for fewer than two groups.
pub fn studentized_range_cdf(q: f64, k: usize) -> Result<f64> {
    if k < 2 {
        return Err(Error::InvalidInput(
            "Studentized range needs at least 2 groups".to_string(),
        ));
    }
    Ok(range_cdf(&standard_normal()?, q, k))
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn range_cdf(normal: &Normal, q: f64, k: usize) -> f64 {
    if q <= 0.0 || q.is_nan() {
        return 0.0;
    }
    if q.is_infinite() {
        return 1.0;
    }

    let exponent = (k - 1) as i32;
    let integrand = |z: f64| normal.pdf(z) * (normal.cdf(z) - normal.cdf(z - q)).powi(exponent);

    // Simpson's rule on [-RANGE_LIMIT, RANGE_LIMIT + q]
    let lo = -RANGE_LIMIT;
    let hi = RANGE_LIMIT + q;
    let h = (hi - lo) / RANGE_INTERVALS as f64;
    let mut total = integrand(lo) + integrand(hi);
    for i in 1..RANGE_INTERVALS {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        total += weight * integrand((i as f64).mul_add(h, lo));
    }
    (k as f64 * total * h / 3.0).clamp(0.0, 1.0)
}

/// Upper `alpha` quantile of the studentized range (infinite df), by bisection.
fn range_quantile(normal: &Normal, k: usize, alpha: f64) -> f64 {
    let target = 1.0 - alpha;
    let (mut lo, mut hi) = (0.0_f64, 20.0_f64);
    for _ in 0..60 {
        let mid = 0.5 * (lo + hi);
        if range_cdf(normal, mid, k) < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Nemenyi critical difference between average ranks.
///
/// Two strategies differ significantly at level `alpha` when their average
/// ranks differ by more than this value.
///
/// # Errors
///
/// Returns `InvalidInput` for fewer than two strategies, zero datasets, or
/// `alpha` outside (0, 1).
#[allow(clippy::cast_precision_loss)]
pub fn critical_difference(n_strategies: usize, n_datasets: usize, alpha: f64) -> Result<f64> {
    if n_strategies < 2 || n_datasets == 0 {
        return Err(Error::InvalidInput(format!(
            "Critical difference needs >= 2 strategies and >= 1 dataset, got {n_strategies} and {n_datasets}"
        )));
    }
    check_alpha(alpha)?;

    let q_alpha = range_quantile(&standard_normal()?, n_strategies, alpha);
    let k = n_strategies as f64;
    Ok(q_alpha / std::f64::consts::SQRT_2 * (k * (k + 1.0) / (6.0 * n_datasets as f64)).sqrt())
}

/// Per-comparison threshold for `alpha` over all pairs of `n_strategies`.
///
/// # Errors
///
/// Returns `InvalidInput` for fewer than two strategies or `alpha` outside
/// (0, 1).
#[allow(clippy::cast_precision_loss)]
pub fn bonferroni_threshold(alpha: f64, n_strategies: usize) -> Result<f64> {
    check_alpha(alpha)?;
    if n_strategies < 2 {
        return Err(Error::InvalidInput(
            "Bonferroni correction needs at least 2 strategies".to_string(),
        ));
    }
    let comparisons = n_strategies * (n_strategies - 1) / 2;
    Ok(alpha / comparisons as f64)
}

fn check_alpha(alpha: f64) -> Result<()> {
    if alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "alpha must be in (0, 1), got {alpha}"
        )))
    }
}
