//! Evaluation of stored predictions
//!
//! The [`Evaluator`] reads records back from a [`ResultsStore`], scores each
//! (strategy, dataset) pair with a [`Metric`], and compares strategies.
//!
//! ## Pipeline
//!
//! ```text
//! ResultsStore ──> evaluate(metric) ──> per (strategy, dataset) scores
//!                                          │
//!                     ┌────────────────────┼─────────────────────┐
//!                     ▼                    ▼                     ▼
//!            metrics_by_strategy      rank(order)          metric_matrix
//!                                                                │
//!                                          t / sign / rank-sum / signed-rank
//!                                          Friedman / Nemenyi / Bonferroni
//! ```
//!
//! Several metrics can be evaluated on one evaluator. Queries take the metric
//! name as `Option<&str>`; `None` is accepted when exactly one metric has been
//! evaluated.
//!
//! ```rust
//! use trueno_bench::evaluation::{Evaluator, FoldSelection};
//! use trueno_bench::metrics::PairwiseMetric;
//! use trueno_bench::results::{MemoryResults, Partition, ResultKey, ResultRecord, ResultsStore};
//!
//! # fn main() -> trueno_bench::Result<()> {
//! let store = MemoryResults::new();
//! let labels = vec!["a".to_string(), "b".to_string()];
//! for (strategy, pred) in [("good", ["a", "b"]), ("bad", ["b", "b"])] {
//!     let pred = pred.iter().map(|p| p.to_string()).collect();
//!     store.save_predictions(ResultRecord::new(
//!         ResultKey::test(strategy, "toy", 0),
//!         vec![0, 1],
//!         labels.clone(),
//!         pred,
//!     )?)?;
//! }
//!
//! let mut evaluator = Evaluator::new(&store);
//! evaluator.evaluate(&PairwiseMetric::accuracy(), Partition::Test, FoldSelection::All)?;
//!
//! let summary = evaluator.metrics_by_strategy(None)?;
//! assert_eq!(summary[0].strategy, "bad");
//! assert!((summary[1].mean - 1.0).abs() < 1e-12);
//! # Ok(())
//! # }
//! ```

mod ranking;
pub mod stats;

pub use ranking::{average_ranks, SortOrder};
pub use stats::{FriedmanResult, TestResult};

use crate::metrics::{Metric, MetricScore};
use crate::results::{Partition, ResultsStore};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which folds to score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldSelection {
    /// Score every fold and average them
    #[default]
    All,
    /// Score a single fold
    Fold(usize),
}

impl FoldSelection {
    const fn includes(self, fold: usize) -> bool {
        match self {
            Self::All => true,
            Self::Fold(selected) => selected == fold,
        }
    }
}

/// Score of one strategy on one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairScore {
    /// Strategy name
    pub strategy: String,
    /// Dataset name
    pub dataset: String,
    /// Mean over the selected folds
    pub mean: f64,
    /// Standard error averaged over the selected folds
    pub stderr: f64,
    /// Number of folds scored
    pub n_folds: usize,
}

/// Aggregate of one strategy over datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyScore {
    /// Strategy name
    pub strategy: String,
    /// Mean of the per-dataset means
    pub mean: f64,
    /// Sample standard deviation of per-dataset means over `sqrt(n)`
    pub stderr: f64,
    /// Number of datasets aggregated
    pub n_datasets: usize,
}

/// Strategies × datasets table of per-dataset means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricMatrix {
    /// Metric name
    pub metric: String,
    /// Row labels, sorted
    pub strategies: Vec<String>,
    /// Column labels, sorted
    pub datasets: Vec<String>,
    /// `values[strategy][dataset]`
    pub values: Vec<Vec<f64>>,
}

impl MetricMatrix {
    /// Row of a strategy, if present.
    #[must_use]
    pub fn row(&self, strategy: &str) -> Option<&[f64]> {
        self.strategies
            .iter()
            .position(|s| s == strategy)
            .map(|i| self.values[i].as_slice())
    }
}

/// Per-dataset and average ranks of every strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    /// Metric name
    pub metric: String,
    /// Direction used to rank
    pub order: SortOrder,
    /// Strategies in alphabetical order
    pub strategies: Vec<String>,
    /// Datasets in alphabetical order
    pub datasets: Vec<String>,
    /// `ranks[strategy][dataset]`, 1 = best, averaged over ties
    pub ranks: Vec<Vec<f64>>,
    /// Mean rank of each strategy across datasets
    pub average_ranks: Vec<f64>,
}

impl Ranking {
    /// Average rank of a strategy, if present.
    #[must_use]
    pub fn average_rank(&self, strategy: &str) -> Option<f64> {
        self.strategies
            .iter()
            .position(|s| s == strategy)
            .map(|i| self.average_ranks[i])
    }
}

/// Result of a two-strategy test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseComparison {
    /// First strategy (alphabetically)
    pub strategy_a: String,
    /// Second strategy
    pub strategy_b: String,
    /// Test statistic (oriented as `a` versus `b`)
    pub statistic: f64,
    /// Two-sided p-value
    pub p_value: f64,
}

/// Pairwise t-tests judged against a Bonferroni-corrected threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceTable {
    /// Family-wise significance level
    pub alpha: f64,
    /// Per-comparison threshold (`alpha / m`)
    pub threshold: f64,
    /// Comparisons with their verdicts
    pub comparisons: Vec<SignificantComparison>,
}

/// One row of a [`SignificanceTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificantComparison {
    /// Test outcome
    pub comparison: PairwiseComparison,
    /// Whether `p_value < threshold`
    pub significant: bool,
}

/// Nemenyi post-hoc p-values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NemenyiResult {
    /// Strategies in alphabetical order
    pub strategies: Vec<String>,
    /// Average rank of each strategy
    pub average_ranks: Vec<f64>,
    /// Symmetric p-value matrix
    pub p_values: Vec<Vec<f64>>,
}

#[derive(Debug, Clone)]
struct EvaluatedMetric {
    greater_is_better: bool,
    scores: BTreeMap<(String, String), PairScore>,
}

/// Scores stored predictions and compares strategies.
#[derive(Debug)]
pub struct Evaluator<'a, R: ResultsStore + ?Sized> {
    results: &'a R,
    metrics: BTreeMap<String, EvaluatedMetric>,
}

impl<'a, R: ResultsStore + ?Sized> Evaluator<'a, R> {
    /// Evaluator over a results store.
    #[must_use]
    pub const fn new(results: &'a R) -> Self {
        Self {
            results,
            metrics: BTreeMap::new(),
        }
    }

    /// Names of the metrics evaluated so far, sorted.
    #[must_use]
    pub fn metric_names(&self) -> Vec<&str> {
        self.metrics.keys().map(String::as_str).collect()
    }

    /// Score every (strategy, dataset) pair with `metric`.
    ///
    /// Each selected fold is scored separately; the pair's mean and stderr are
    /// the averages over folds. Re-evaluating a metric replaces its scores.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if no record matches the partition and fold
    /// selection, and propagates store and metric errors.
    #[allow(clippy::cast_precision_loss)]
    pub fn evaluate(
        &mut self,
        metric: &dyn Metric,
        partition: Partition,
        folds: FoldSelection,
    ) -> Result<Vec<PairScore>> {
        let mut per_pair: BTreeMap<(String, String), Vec<MetricScore>> = BTreeMap::new();
        for key in self.results.keys()? {
            if key.partition() != partition || !folds.includes(key.cv_fold()) {
                continue;
            }
            let Some(record) = self.results.load_predictions(&key)? else {
                continue;
            };
            let score = metric.compute(record.y_true(), record.y_pred())?;
            per_pair
                .entry((key.strategy().to_string(), key.dataset().to_string()))
                .or_default()
                .push(score);
        }

        if per_pair.is_empty() {
            return Err(Error::InvalidInput(format!(
                "No {partition} predictions match fold selection {folds:?}"
            )));
        }

        let scores: BTreeMap<(String, String), PairScore> = per_pair
            .into_iter()
            .map(|((strategy, dataset), fold_scores)| {
                let n = fold_scores.len() as f64;
                let score = PairScore {
                    mean: fold_scores.iter().map(|s| s.mean).sum::<f64>() / n,
                    stderr: fold_scores.iter().map(|s| s.stderr).sum::<f64>() / n,
                    n_folds: fold_scores.len(),
                    strategy: strategy.clone(),
                    dataset: dataset.clone(),
                };
                ((strategy, dataset), score)
            })
            .collect();

        tracing::info!(
            metric = metric.name(),
            partition = %partition,
            pairs = scores.len(),
            "Evaluated metric"
        );

        let result = scores.values().cloned().collect();
        self.metrics.insert(
            metric.name().to_string(),
            EvaluatedMetric {
                greater_is_better: metric.greater_is_better(),
                scores,
            },
        );
        Ok(result)
    }

    fn resolve(&self, metric: Option<&str>) -> Result<(&str, &EvaluatedMetric)> {
        match metric {
            Some(name) => self
                .metrics
                .get_key_value(name)
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| {
                    Error::InvalidInput(format!("Metric '{name}' has not been evaluated"))
                }),
            None => {
                let mut iter = self.metrics.iter();
                match (iter.next(), iter.next()) {
                    (Some((k, v)), None) => Ok((k.as_str(), v)),
                    (None, _) => Err(Error::InvalidInput(
                        "No metric has been evaluated".to_string(),
                    )),
                    (Some(_), Some(_)) => Err(Error::InvalidInput(format!(
                        "Several metrics evaluated ({}); name one",
                        self.metric_names().join(", ")
                    ))),
                }
            }
        }
    }

    /// Per-pair scores, ordered by (strategy, dataset).
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the metric cannot be resolved.
    pub fn metrics_by_strategy_dataset(&self, metric: Option<&str>) -> Result<Vec<PairScore>> {
        let (_, evaluated) = self.resolve(metric)?;
        Ok(evaluated.scores.values().cloned().collect())
    }

    /// Per-strategy aggregate over the datasets it was scored on.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the metric cannot be resolved.
    #[allow(clippy::cast_precision_loss)]
    pub fn metrics_by_strategy(&self, metric: Option<&str>) -> Result<Vec<StrategyScore>> {
        let (_, evaluated) = self.resolve(metric)?;

        let mut per_strategy: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for ((strategy, _), score) in &evaluated.scores {
            per_strategy.entry(strategy).or_default().push(score.mean);
        }

        Ok(per_strategy
            .into_iter()
            .map(|(strategy, means)| {
                let n = means.len() as f64;
                let mean = means.iter().sum::<f64>() / n;
                let stderr = if means.len() < 2 {
                    0.0
                } else {
                    let variance =
                        means.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / (n - 1.0);
                    variance.sqrt() / n.sqrt()
                };
                StrategyScore {
                    strategy: strategy.to_string(),
                    mean,
                    stderr,
                    n_datasets: means.len(),
                }
            })
            .collect())
    }

    /// Strategies × datasets matrix of per-dataset means.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the metric cannot be resolved or a strategy
    /// lacks a score on some dataset.
    pub fn metric_matrix(&self, metric: Option<&str>) -> Result<MetricMatrix> {
        let (name, evaluated) = self.resolve(metric)?;

        let mut strategies: Vec<String> = evaluated.scores.keys().map(|(s, _)| s.clone()).collect();
        strategies.dedup();
        let mut datasets: Vec<String> = evaluated.scores.keys().map(|(_, d)| d.clone()).collect();
        datasets.sort();
        datasets.dedup();

        let values = strategies
            .iter()
            .map(|strategy| {
                datasets
                    .iter()
                    .map(|dataset| {
                        evaluated
                            .scores
                            .get(&(strategy.clone(), dataset.clone()))
                            .map(|score| score.mean)
                            .ok_or_else(|| {
                                Error::InvalidInput(format!(
                                    "Strategy '{strategy}' has no '{name}' score on dataset '{dataset}'"
                                ))
                            })
                    })
                    .collect::<Result<Vec<f64>>>()
            })
            .collect::<Result<Vec<Vec<f64>>>>()?;

        Ok(MetricMatrix {
            metric: name.to_string(),
            strategies,
            datasets,
            values,
        })
    }

    /// Rank strategies within each dataset (1 = best) and average the ranks.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the metric cannot be resolved or the matrix
    /// is incomplete.
    #[allow(clippy::cast_precision_loss)]
    pub fn rank(&self, metric: Option<&str>, order: SortOrder) -> Result<Ranking> {
        let matrix = self.metric_matrix(metric)?;
        let k = matrix.strategies.len();
        let n = matrix.datasets.len();

        let mut ranks = vec![vec![0.0; n]; k];
        for dataset in 0..n {
            let column: Vec<f64> = matrix.values.iter().map(|row| row[dataset]).collect();
            for (strategy, rank) in average_ranks(&column, order).into_iter().enumerate() {
                ranks[strategy][dataset] = rank;
            }
        }
        let average_ranks = ranks
            .iter()
            .map(|row| row.iter().sum::<f64>() / n as f64)
            .collect();

        Ok(Ranking {
            metric: matrix.metric,
            order,
            strategies: matrix.strategies,
            datasets: matrix.datasets,
            ranks,
            average_ranks,
        })
    }

    fn order_for(&self, metric: Option<&str>) -> Result<SortOrder> {
        let (_, evaluated) = self.resolve(metric)?;
        Ok(SortOrder::for_metric(evaluated.greater_is_better))
    }

    fn pairwise(
        &self,
        metric: Option<&str>,
        test: fn(&[f64], &[f64]) -> Result<TestResult>,
    ) -> Result<Vec<PairwiseComparison>> {
        let matrix = self.metric_matrix(metric)?;
        if matrix.strategies.len() < 2 {
            return Err(Error::InvalidInput(
                "Pairwise tests need at least 2 strategies".to_string(),
            ));
        }

        let mut comparisons = Vec::new();
        for i in 0..matrix.strategies.len() {
            for j in (i + 1)..matrix.strategies.len() {
                let result = test(&matrix.values[i], &matrix.values[j])?;
                comparisons.push(PairwiseComparison {
                    strategy_a: matrix.strategies[i].clone(),
                    strategy_b: matrix.strategies[j].clone(),
                    statistic: result.statistic,
                    p_value: result.p_value,
                });
            }
        }
        Ok(comparisons)
    }

    /// Paired t-test for every pair of strategies over datasets.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is incomplete or a test cannot be run.
    pub fn t_test(&self, metric: Option<&str>) -> Result<Vec<PairwiseComparison>> {
        self.pairwise(metric, stats::paired_t_test)
    }

    /// Sign test for every pair of strategies over datasets.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is incomplete or a test cannot be run.
    pub fn sign_test(&self, metric: Option<&str>) -> Result<Vec<PairwiseComparison>> {
        self.pairwise(metric, stats::sign_test)
    }

    /// Wilcoxon rank-sum test for every pair of strategies.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is incomplete or a test cannot be run.
    pub fn ranksum_test(&self, metric: Option<&str>) -> Result<Vec<PairwiseComparison>> {
        self.pairwise(metric, stats::rank_sum_test)
    }

    /// Wilcoxon signed-rank test for every pair of strategies.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is incomplete. A pair with identical
    /// scores on every dataset reports statistic 0 and p = 1.
    pub fn wilcoxon_test(&self, metric: Option<&str>) -> Result<Vec<PairwiseComparison>> {
        self.pairwise(metric, stats::wilcoxon_signed_rank_test)
    }

    /// Friedman test across all strategies.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is incomplete or too small.
    pub fn friedman_test(&self, metric: Option<&str>) -> Result<FriedmanResult> {
        let order = self.order_for(metric)?;
        let matrix = self.metric_matrix(metric)?;
        let result = stats::friedman_test(&matrix.values, order)?;
        tracing::debug!(
            metric = %matrix.metric,
            statistic = result.statistic,
            p_value = result.p_value,
            "Friedman test"
        );
        Ok(result)
    }

    /// Nemenyi post-hoc test from average ranks.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is incomplete or has fewer than two
    /// strategies.
    pub fn nemenyi(&self, metric: Option<&str>) -> Result<NemenyiResult> {
        let ranking = self.rank(metric, self.order_for(metric)?)?;
        let p_values = stats::nemenyi_test(&ranking.average_ranks, ranking.datasets.len())?;
        Ok(NemenyiResult {
            strategies: ranking.strategies,
            average_ranks: ranking.average_ranks,
            p_values,
        })
    }

    /// Paired t-tests judged at `alpha / m` for `m` strategy pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if `alpha` is outside (0, 1) or the tests cannot run.
    pub fn t_test_with_bonferroni_correction(
        &self,
        metric: Option<&str>,
        alpha: f64,
    ) -> Result<SignificanceTable> {
        let comparisons = self.t_test(metric)?;
        let n_strategies = self.metric_matrix(metric)?.strategies.len();
        let threshold = stats::bonferroni_threshold(alpha, n_strategies)?;

        Ok(SignificanceTable {
            alpha,
            threshold,
            comparisons: comparisons
                .into_iter()
                .map(|comparison| SignificantComparison {
                    significant: comparison.p_value < threshold,
                    comparison,
                })
                .collect(),
        })
    }

    /// Nemenyi critical difference for the evaluated strategies and datasets.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is incomplete or `alpha` is invalid.
    pub fn critical_difference(&self, metric: Option<&str>, alpha: f64) -> Result<f64> {
        let matrix = self.metric_matrix(metric)?;
        stats::critical_difference(matrix.strategies.len(), matrix.datasets.len(), alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{AggregateMetric, PairwiseMetric};
    use crate::results::{MemoryResults, ResultKey, ResultRecord};

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    fn save(store: &MemoryResults, strategy: &str, dataset: &str, fold: usize, pred: &[&str]) {
        let y_true = labels(&["a", "b", "a", "b"]);
        store
            .save_predictions(
                ResultRecord::new(
                    ResultKey::test(strategy, dataset, fold),
                    (0..4).collect(),
                    y_true,
                    labels(pred),
                )
                .unwrap(),
            )
            .unwrap();
    }

    fn two_by_two() -> MemoryResults {
        let store = MemoryResults::new();
        save(&store, "knn", "d1", 0, &["a", "b", "a", "b"]); // 1.0
        save(&store, "knn", "d2", 0, &["a", "b", "a", "a"]); // 0.75
        save(&store, "dummy", "d1", 0, &["a", "a", "a", "a"]); // 0.5
        save(&store, "dummy", "d2", 0, &["b", "b", "a", "a"]); // 0.25
        store
    }

    #[test]
    fn test_evaluate_hand_computed_accuracy() {
        let store = two_by_two();
        let mut evaluator = Evaluator::new(&store);
        let scores = evaluator
            .evaluate(&PairwiseMetric::accuracy(), Partition::Test, FoldSelection::All)
            .unwrap();

        let means: Vec<(&str, &str, f64)> = scores
            .iter()
            .map(|s| (s.strategy.as_str(), s.dataset.as_str(), s.mean))
            .collect();
        assert_eq!(
            means,
            vec![
                ("dummy", "d1", 0.5),
                ("dummy", "d2", 0.25),
                ("knn", "d1", 1.0),
                ("knn", "d2", 0.75),
            ]
        );
    }

    #[test]
    fn test_folds_averaged_and_selected() {
        let store = MemoryResults::new();
        save(&store, "s", "d", 0, &["a", "b", "a", "b"]); // 1.0
        save(&store, "s", "d", 1, &["b", "a", "b", "a"]); // 0.0

        let mut evaluator = Evaluator::new(&store);
        let all = evaluator
            .evaluate(&PairwiseMetric::accuracy(), Partition::Test, FoldSelection::All)
            .unwrap();
        assert!((all[0].mean - 0.5).abs() < 1e-12);
        assert_eq!(all[0].n_folds, 2);

        let one = evaluator
            .evaluate(&PairwiseMetric::accuracy(), Partition::Test, FoldSelection::Fold(1))
            .unwrap();
        assert!(one[0].mean.abs() < 1e-12);
        assert_eq!(one[0].n_folds, 1);
    }

    #[test]
    fn test_no_matching_records() {
        let store = two_by_two();
        let mut evaluator = Evaluator::new(&store);
        let result =
            evaluator.evaluate(&PairwiseMetric::accuracy(), Partition::Train, FoldSelection::All);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_metric_resolution() {
        let store = two_by_two();
        let mut evaluator = Evaluator::new(&store);
        assert!(evaluator.metrics_by_strategy(None).is_err());

        evaluator
            .evaluate(&PairwiseMetric::accuracy(), Partition::Test, FoldSelection::All)
            .unwrap();
        assert!(evaluator.metrics_by_strategy(None).is_ok());

        evaluator
            .evaluate(&AggregateMetric::zero_one_loss(), Partition::Test, FoldSelection::All)
            .unwrap();
        assert!(evaluator.metrics_by_strategy(None).is_err());
        assert!(evaluator.metrics_by_strategy(Some("zero_one_loss")).is_ok());
        assert!(evaluator.metrics_by_strategy(Some("f1")).is_err());
        assert_eq!(evaluator.metric_names(), vec!["accuracy", "zero_one_loss"]);
    }

    #[test]
    fn test_metrics_by_strategy_mean_and_stderr() {
        let store = two_by_two();
        let mut evaluator = Evaluator::new(&store);
        evaluator
            .evaluate(&PairwiseMetric::accuracy(), Partition::Test, FoldSelection::All)
            .unwrap();

        let summary = evaluator.metrics_by_strategy(None).unwrap();
        assert_eq!(summary[1].strategy, "knn");
        assert!((summary[1].mean - 0.875).abs() < 1e-12);
        // sample std of (1.0, 0.75) is 0.125 * sqrt(2); over sqrt(2) -> 0.125
        assert!((summary[1].stderr - 0.125).abs() < 1e-12);
        assert_eq!(summary[1].n_datasets, 2);
    }

    #[test]
    fn test_rank_best_is_one() {
        let store = two_by_two();
        let mut evaluator = Evaluator::new(&store);
        evaluator
            .evaluate(&PairwiseMetric::accuracy(), Partition::Test, FoldSelection::All)
            .unwrap();

        let ranking = evaluator.rank(None, SortOrder::Descending).unwrap();
        assert_eq!(ranking.strategies, vec!["dummy", "knn"]);
        assert_eq!(ranking.ranks, vec![vec![2.0, 2.0], vec![1.0, 1.0]]);
        assert_eq!(ranking.average_rank("knn"), Some(1.0));

        let reversed = evaluator.rank(None, SortOrder::Ascending).unwrap();
        assert_eq!(reversed.average_rank("knn"), Some(2.0));
    }

    #[test]
    fn test_incomplete_matrix_rejected() {
        let store = two_by_two();
        save(&store, "extra", "d1", 0, &["a", "b", "a", "b"]);
        let mut evaluator = Evaluator::new(&store);
        evaluator
            .evaluate(&PairwiseMetric::accuracy(), Partition::Test, FoldSelection::All)
            .unwrap();

        assert!(evaluator.metric_matrix(None).is_err());
        // per-strategy summary does not need a complete matrix
        assert_eq!(evaluator.metrics_by_strategy(None).unwrap().len(), 3);
    }

    #[test]
    fn test_pairwise_tests_cover_unique_pairs() {
        let store = two_by_two();
        save(&store, "third", "d1", 0, &["a", "b", "b", "b"]);
        save(&store, "third", "d2", 0, &["a", "a", "a", "b"]);
        let mut evaluator = Evaluator::new(&store);
        evaluator
            .evaluate(&PairwiseMetric::accuracy(), Partition::Test, FoldSelection::All)
            .unwrap();

        let comparisons = evaluator.sign_test(None).unwrap();
        let pairs: Vec<(&str, &str)> = comparisons
            .iter()
            .map(|c| (c.strategy_a.as_str(), c.strategy_b.as_str()))
            .collect();
        assert_eq!(pairs, vec![("dummy", "knn"), ("dummy", "third"), ("knn", "third")]);

        let table = evaluator.t_test_with_bonferroni_correction(None, 0.05).unwrap();
        assert!((table.threshold - 0.05 / 3.0).abs() < 1e-15);
        assert_eq!(table.comparisons.len(), 3);
    }
}
