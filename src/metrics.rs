//! Classification metrics with standard errors
//!
//! Two flavours:
//! - [`PairwiseMetric`] wraps a function of the whole label vectors (e.g.
//!   accuracy). Its standard error is the jackknife estimate over
//!   leave-one-out resamples.
//! - [`AggregateMetric`] wraps a pointwise score or loss. The mean is the mean
//!   of pointwise values and the standard error is `std / sqrt(n)`.
//!
//! ```rust
//! use trueno_bench::metrics::{Metric, PairwiseMetric};
//!
//! # fn main() -> trueno_bench::Result<()> {
//! let y_true: Vec<String> = ["a", "a", "b", "b"].iter().map(|s| s.to_string()).collect();
//! let y_pred: Vec<String> = ["a", "b", "b", "b"].iter().map(|s| s.to_string()).collect();
//!
//! let score = PairwiseMetric::accuracy().compute(&y_true, &y_pred)?;
//! assert!((score.mean - 0.75).abs() < 1e-12);
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Mean value and its standard error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    /// Point estimate
    pub mean: f64,
    /// Standard error of the estimate
    pub stderr: f64,
}

/// A metric computed from true and predicted labels.
pub trait Metric {
    /// Metric name, used to select it in evaluator queries.
    fn name(&self) -> &str;

    /// Whether larger values are better (scores) or worse (losses).
    fn greater_is_better(&self) -> bool {
        true
    }

    /// Score one prediction set.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the inputs are empty or differ in length.
    fn compute(&self, y_true: &[String], y_pred: &[String]) -> Result<MetricScore>;
}

/// Function of whole label vectors.
pub type LabelMetricFn = fn(&[&str], &[&str]) -> f64;

/// Function of one (true, predicted) pair.
pub type PointwiseFn = fn(&str, &str) -> f64;

/// Metric over whole label vectors with a jackknife standard error.
#[derive(Debug, Clone)]
pub struct PairwiseMetric {
    name: String,
    func: LabelMetricFn,
    greater_is_better: bool,
}

impl PairwiseMetric {
    /// Wrap a label-vector function.
    #[must_use]
    pub fn new(name: impl Into<String>, func: LabelMetricFn, greater_is_better: bool) -> Self {
        Self {
            name: name.into(),
            func,
            greater_is_better,
        }
    }

    /// Fraction of correct predictions.
    #[must_use]
    pub fn accuracy() -> Self {
        Self::new("accuracy", |t, p| accuracy_score(t, p), true)
    }

    /// Mean per-class recall over the classes present in `y_true`.
    #[must_use]
    pub fn balanced_accuracy() -> Self {
        Self::new("balanced_accuracy", |t, p| balanced_accuracy_score(t, p), true)
    }
}

impl Metric for PairwiseMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn greater_is_better(&self) -> bool {
        self.greater_is_better
    }

    #[allow(clippy::cast_precision_loss)]
    fn compute(&self, y_true: &[String], y_pred: &[String]) -> Result<MetricScore> {
        check_inputs(y_true, y_pred)?;
        let y_true: Vec<&str> = y_true.iter().map(String::as_str).collect();
        let y_pred: Vec<&str> = y_pred.iter().map(String::as_str).collect();
        let mean = (self.func)(&y_true, &y_pred);

        let n = y_true.len();
        if n < 2 {
            return Ok(MetricScore { mean, stderr: 0.0 });
        }

        // Leave-one-out resamples share two borrowed buffers.
        let mut t = Vec::with_capacity(n - 1);
        let mut p = Vec::with_capacity(n - 1);
        let resamples: Vec<f64> = (0..n)
            .map(|i| {
                t.clear();
                t.extend_from_slice(&y_true[..i]);
                t.extend_from_slice(&y_true[i + 1..]);
                p.clear();
                p.extend_from_slice(&y_pred[..i]);
                p.extend_from_slice(&y_pred[i + 1..]);
                (self.func)(&t, &p)
            })
            .collect();
        let jack_mean = resamples.iter().sum::<f64>() / n as f64;
        let spread: f64 = resamples.iter().map(|v| (v - jack_mean).powi(2)).sum();
        let stderr = ((n - 1) as f64 / n as f64 * spread).sqrt();

        Ok(MetricScore { mean, stderr })
    }
}

/// Mean of a pointwise function with `std / sqrt(n)` standard error.
#[derive(Debug, Clone)]
pub struct AggregateMetric {
    name: String,
    func: PointwiseFn,
    greater_is_better: bool,
}

impl AggregateMetric {
    /// Wrap a pointwise function.
    #[must_use]
    pub fn new(name: impl Into<String>, func: PointwiseFn, greater_is_better: bool) -> Self {
        Self {
            name: name.into(),
            func,
            greater_is_better,
        }
    }

    /// Mean 0/1 loss (misclassification rate).
    #[must_use]
    pub fn zero_one_loss() -> Self {
        Self::new("zero_one_loss", zero_one_loss, false)
    }
}

impl Metric for AggregateMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn greater_is_better(&self) -> bool {
        self.greater_is_better
    }

    #[allow(clippy::cast_precision_loss)]
    fn compute(&self, y_true: &[String], y_pred: &[String]) -> Result<MetricScore> {
        check_inputs(y_true, y_pred)?;
        let values: Vec<f64> = y_true
            .iter()
            .zip(y_pred)
            .map(|(t, p)| (self.func)(t, p))
            .collect();

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let stderr = if values.len() < 2 {
            0.0
        } else {
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            variance.sqrt() / n.sqrt()
        };
        Ok(MetricScore { mean, stderr })
    }
}

fn check_inputs(y_true: &[String], y_pred: &[String]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(Error::InvalidInput(format!(
            "{} true labels but {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(Error::InvalidInput(
            "Cannot score an empty prediction set".to_string(),
        ));
    }
    Ok(())
}

/// Fraction of positions where prediction equals truth. Zero for empty input.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn accuracy_score<S: AsRef<str>>(y_true: &[S], y_pred: &[S]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred)
        .filter(|(t, p)| t.as_ref() == p.as_ref())
        .count();
    correct as f64 / y_true.len() as f64
}

/// Mean recall over classes present in `y_true`. Zero for empty input.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn balanced_accuracy_score<S: AsRef<str>>(y_true: &[S], y_pred: &[S]) -> f64 {
    // class -> (support, correct)
    let mut per_class: FxHashMap<&str, (usize, usize)> = FxHashMap::default();
    for (t, p) in y_true.iter().zip(y_pred) {
        let entry = per_class.entry(t.as_ref()).or_insert((0, 0));
        entry.0 += 1;
        if t.as_ref() == p.as_ref() {
            entry.1 += 1;
        }
    }
    if per_class.is_empty() {
        return 0.0;
    }
    let recall_sum: f64 = per_class
        .values()
        .map(|&(support, correct)| correct as f64 / support as f64)
        .sum();
    recall_sum / per_class.len() as f64
}

/// 1.0 for a wrong prediction, 0.0 for a correct one.
#[must_use]
pub fn zero_one_loss(y_true: &str, y_pred: &str) -> f64 {
    if y_true == y_pred {
        0.0
    } else {
        1.0
    }
}
