//! Fit/predict orchestration
//!
//! The [`Orchestrator`] runs every strategy on every dataset, fold by fold,
//! and writes the predictions to a [`ResultsStore`].
//!
//! ## Failure isolation
//!
//! A dataset that fails to load, or a strategy that fails to fit or predict,
//! only fails its own (strategy, dataset) pairs. The failure is logged and
//! recorded in the [`OrchestrationReport`]; the remaining pairs still run.
//! Only misconfiguration is rejected up front by [`Orchestrator::new`].
//!
//! ```rust
//! use trueno_bench::config::OrchestratorConfig;
//! use trueno_bench::cv::PresplitFilesCv;
//! use trueno_bench::data::{build_labelled_batch, Dataset, InMemoryDataset, Task};
//! use trueno_bench::estimator::{MostFrequentClassifier, Strategy};
//! use trueno_bench::orchestration::Orchestrator;
//! use trueno_bench::results::{MemoryResults, ResultsStore};
//!
//! # fn main() -> trueno_bench::Result<()> {
//! let train = build_labelled_batch("target", &[vec![0.0], vec![1.0], vec![2.0]], &["a", "a", "b"])?;
//! let test = build_labelled_batch("target", &[vec![0.5], vec![1.5]], &["a", "b"])?;
//! let datasets: Vec<Box<dyn Dataset>> = vec![Box::new(InMemoryDataset::new("toy", train, Some(test)))];
//!
//! let orchestrator = Orchestrator::new(
//!     datasets,
//!     vec![Task::default()],
//!     vec![Strategy::new("majority", MostFrequentClassifier::new())],
//!     Box::new(PresplitFilesCv),
//!     MemoryResults::new(),
//! )?;
//!
//! let report = orchestrator.fit_predict(&OrchestratorConfig::default());
//! assert!(report.is_success());
//! assert_eq!(orchestrator.results().len()?, 1);
//! # Ok(())
//! # }
//! ```

use crate::config::OrchestratorConfig;
use crate::cv::Splitter;
use crate::data::{Dataset, FeatureTable, Task};
use crate::estimator::{Estimator, Strategy};
use crate::results::{Partition, ResultKey, ResultRecord, ResultsStore};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// What happened to one (strategy, dataset) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PairStatus {
    /// At least one fold was fitted and predicted
    Completed {
        /// Folds fitted and predicted in this run
        folds_run: usize,
        /// Folds whose predictions already existed
        folds_skipped: usize,
    },
    /// Every fold already had predictions
    Skipped {
        /// Number of folds skipped
        folds: usize,
    },
    /// The pair stopped on an error
    Failed {
        /// Folds completed before the failure
        folds_run: usize,
        /// Error message
        error: String,
    },
}

/// Outcome of one (strategy, dataset) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairOutcome {
    /// Strategy name
    pub strategy: String,
    /// Dataset name
    pub dataset: String,
    /// Outcome
    pub status: PairStatus,
}

impl PairOutcome {
    /// Whether the pair failed.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self.status, PairStatus::Failed { .. })
    }
}

/// Per-pair outcomes of one orchestration run, in dataset-major order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationReport {
    outcomes: Vec<PairOutcome>,
}

impl OrchestrationReport {
    /// All outcomes.
    #[must_use]
    pub fn outcomes(&self) -> &[PairOutcome] {
        &self.outcomes
    }

    /// Outcome of one pair.
    #[must_use]
    pub fn outcome(&self, strategy: &str, dataset: &str) -> Option<&PairOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.strategy == strategy && o.dataset == dataset)
    }

    /// Failed pairs.
    #[must_use]
    pub fn failures(&self) -> Vec<&PairOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure()).collect()
    }

    /// Number of completed pairs.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.count(|s| matches!(s, PairStatus::Completed { .. }))
    }

    /// Number of fully skipped pairs.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(|s| matches!(s, PairStatus::Skipped { .. }))
    }

    /// Number of failed pairs.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, PairStatus::Failed { .. }))
    }

    /// True when no pair failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    fn count(&self, predicate: impl Fn(&PairStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.status)).count()
    }

    fn push(&mut self, strategy: &str, dataset: &str, status: PairStatus) {
        self.outcomes.push(PairOutcome {
            strategy: strategy.to_string(),
            dataset: dataset.to_string(),
            status,
        });
    }
}

/// A fold with features and labels extracted for both sides.
struct PreparedFold {
    index: usize,
    x_train: FeatureTable,
    y_train: Vec<String>,
    train_indices: Vec<u64>,
    x_test: FeatureTable,
    y_test: Vec<String>,
    test_indices: Vec<u64>,
}

enum FoldOutcome {
    Ran,
    Skipped,
}

/// Runs strategies × datasets and stores predictions.
pub struct Orchestrator<R: ResultsStore> {
    datasets: Vec<Box<dyn Dataset>>,
    tasks: Vec<Task>,
    strategies: Vec<Strategy>,
    cv: Box<dyn Splitter>,
    results: R,
}

impl<R: ResultsStore> Orchestrator<R> {
    /// Create an orchestrator.
    ///
    /// `tasks` holds one task per dataset in the same order, or a single task
    /// shared by all datasets.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if there are no datasets or strategies, the task
    /// count does not fit, or dataset or strategy names repeat.
    pub fn new(
        datasets: Vec<Box<dyn Dataset>>,
        tasks: Vec<Task>,
        strategies: Vec<Strategy>,
        cv: Box<dyn Splitter>,
        results: R,
    ) -> Result<Self> {
        if datasets.is_empty() {
            return Err(Error::InvalidInput("No datasets to run".to_string()));
        }
        if strategies.is_empty() {
            return Err(Error::InvalidInput("No strategies to run".to_string()));
        }
        if tasks.len() != 1 && tasks.len() != datasets.len() {
            return Err(Error::InvalidInput(format!(
                "Got {} tasks for {} datasets; pass one task per dataset or a single shared task",
                tasks.len(),
                datasets.len()
            )));
        }
        check_unique("dataset", datasets.iter().map(|d| d.name()))?;
        check_unique("strategy", strategies.iter().map(Strategy::name))?;

        Ok(Self {
            datasets,
            tasks,
            strategies,
            cv,
            results,
        })
    }

    /// The results store.
    #[must_use]
    pub const fn results(&self) -> &R {
        &self.results
    }

    /// Consume the orchestrator and return its results store.
    #[must_use]
    pub fn into_results(self) -> R {
        self.results
    }

    /// Names of the configured strategies.
    #[must_use]
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(Strategy::name).collect()
    }

    /// Names of the configured datasets.
    #[must_use]
    pub fn dataset_names(&self) -> Vec<&str> {
        self.datasets.iter().map(|d| d.name()).collect()
    }

    fn task_for(&self, dataset: usize) -> &Task {
        if self.tasks.len() == 1 {
            &self.tasks[0]
        } else {
            &self.tasks[dataset]
        }
    }

    /// Fit and predict every (strategy, dataset) pair.
    ///
    /// Never fails as a whole: per-pair errors are logged and returned in
    /// the report.
    pub fn fit_predict(&self, config: &OrchestratorConfig) -> OrchestrationReport {
        let mut report = OrchestrationReport::default();
        tracing::info!(
            datasets = self.datasets.len(),
            strategies = self.strategies.len(),
            cv = self.cv.name(),
            overwrite = config.overwrite_predictions,
            "Starting orchestration"
        );

        for (position, dataset) in self.datasets.iter().enumerate() {
            let name = dataset.name();
            let folds = match self.prepare(dataset.as_ref(), self.task_for(position)) {
                Ok(folds) => folds,
                Err(e) => {
                    tracing::warn!(dataset = name, error = %e, "Dataset unavailable; skipping its pairs");
                    for strategy in &self.strategies {
                        report.push(
                            strategy.name(),
                            name,
                            PairStatus::Failed {
                                folds_run: 0,
                                error: e.to_string(),
                            },
                        );
                    }
                    continue;
                }
            };

            for strategy in &self.strategies {
                let status = self.run_pair(strategy, name, &folds, config);
                match &status {
                    PairStatus::Completed {
                        folds_run,
                        folds_skipped,
                    } => tracing::info!(
                        strategy = strategy.name(),
                        dataset = name,
                        folds_run,
                        folds_skipped,
                        "Pair completed"
                    ),
                    PairStatus::Skipped { folds } => tracing::debug!(
                        strategy = strategy.name(),
                        dataset = name,
                        folds,
                        "Pair skipped; predictions exist"
                    ),
                    PairStatus::Failed { error, .. } => tracing::warn!(
                        strategy = strategy.name(),
                        dataset = name,
                        error = %error,
                        "Pair failed"
                    ),
                }
                report.push(strategy.name(), name, status);
            }
        }

        tracing::info!(
            completed = report.completed_count(),
            skipped = report.skipped_count(),
            failed = report.failed_count(),
            "Orchestration finished"
        );
        report
    }

    fn prepare(&self, dataset: &dyn Dataset, task: &Task) -> Result<Vec<PreparedFold>> {
        let splits = dataset.load()?;
        self.cv
            .split(&splits)?
            .into_iter()
            .map(|fold| {
                let (x_train, y_train) = task.features_and_labels(&fold.train)?;
                let (x_test, y_test) = task.features_and_labels(&fold.test)?;
                Ok(PreparedFold {
                    index: fold.index,
                    x_train,
                    y_train,
                    train_indices: fold.train_indices,
                    x_test,
                    y_test,
                    test_indices: fold.test_indices,
                })
            })
            .collect()
    }

    fn run_pair(
        &self,
        strategy: &Strategy,
        dataset: &str,
        folds: &[PreparedFold],
        config: &OrchestratorConfig,
    ) -> PairStatus {
        let mut folds_run = 0;
        let mut folds_skipped = 0;
        for fold in folds {
            match self.run_fold(strategy, dataset, fold, config) {
                Ok(FoldOutcome::Ran) => folds_run += 1,
                Ok(FoldOutcome::Skipped) => folds_skipped += 1,
                Err(e) => {
                    return PairStatus::Failed {
                        folds_run,
                        error: e.to_string(),
                    }
                }
            }
        }

        if folds_run == 0 {
            PairStatus::Skipped {
                folds: folds_skipped,
            }
        } else {
            PairStatus::Completed {
                folds_run,
                folds_skipped,
            }
        }
    }

    fn run_fold(
        &self,
        strategy: &Strategy,
        dataset: &str,
        fold: &PreparedFold,
        config: &OrchestratorConfig,
    ) -> Result<FoldOutcome> {
        let name = strategy.name();
        let test_key = ResultKey::new(name, dataset, fold.index, Partition::Test);
        let train_key = ResultKey::new(name, dataset, fold.index, Partition::Train);

        if !config.overwrite_predictions
            && self.results.contains(&test_key)?
            && (!config.predict_on_train || self.results.contains(&train_key)?)
        {
            return Ok(FoldOutcome::Skipped);
        }

        let mut estimator = strategy.instantiate();
        let started = Instant::now();
        estimator
            .fit(&fold.x_train, &fold.y_train)
            .map_err(|e| Error::FitFailed {
                strategy: name.to_string(),
                dataset: dataset.to_string(),
                reason: e.to_string(),
            })?;
        let fit_seconds = started.elapsed().as_secs_f64();

        let started = Instant::now();
        let y_pred = predict(estimator.as_ref(), name, dataset, &fold.x_test)?;
        let predict_seconds = started.elapsed().as_secs_f64();

        self.results.save_predictions(
            ResultRecord::new(
                test_key,
                fold.test_indices.clone(),
                fold.y_test.clone(),
                y_pred,
            )?
            .with_timings(fit_seconds, predict_seconds),
        )?;

        if config.predict_on_train {
            let started = Instant::now();
            let y_pred = predict(estimator.as_ref(), name, dataset, &fold.x_train)?;
            let predict_seconds = started.elapsed().as_secs_f64();
            self.results.save_predictions(
                ResultRecord::new(
                    train_key,
                    fold.train_indices.clone(),
                    fold.y_train.clone(),
                    y_pred,
                )?
                .with_timings(fit_seconds, predict_seconds),
            )?;
        }

        if config.save_fitted_strategies {
            match estimator.to_bytes() {
                Ok(Some(bytes)) => {
                    self.results
                        .save_fitted_strategy(name, dataset, fold.index, &bytes)?;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    strategy = name,
                    dataset,
                    fold = fold.index,
                    error = %e,
                    "Could not serialize fitted estimator"
                ),
            }
        }

        Ok(FoldOutcome::Ran)
    }
}

fn predict(
    estimator: &dyn Estimator,
    strategy: &str,
    dataset: &str,
    features: &FeatureTable,
) -> Result<Vec<String>> {
    let failed = |reason: String| Error::PredictFailed {
        strategy: strategy.to_string(),
        dataset: dataset.to_string(),
        reason,
    };
    let y_pred = estimator.predict(features).map_err(|e| failed(e.to_string()))?;
    if y_pred.len() != features.n_rows() {
        return Err(failed(format!(
            "returned {} predictions for {} rows",
            y_pred.len(),
            features.n_rows()
        )));
    }
    Ok(y_pred)
}

fn check_unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut sorted: Vec<&str> = names.collect();
    sorted.sort_unstable();
    match sorted.windows(2).find(|pair| pair[0] == pair[1]) {
        Some(pair) => Err(Error::InvalidInput(format!(
            "Duplicate {kind} name '{}'",
            pair[0]
        ))),
        None => Ok(()),
    }
}

impl<R: ResultsStore + std::fmt::Debug> std::fmt::Debug for Orchestrator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("datasets", &self.dataset_names())
            .field("strategies", &self.strategy_names())
            .field("cv", &self.cv.name())
            .field("results", &self.results)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cv::{KFold, PresplitFilesCv};
    use crate::data::{build_labelled_batch, InMemoryDataset};
    use crate::estimator::{MostFrequentClassifier, NearestNeighborClassifier};
    use crate::results::MemoryResults;

    fn toy_dataset(name: &str) -> Box<dyn Dataset> {
        let train = build_labelled_batch(
            "target",
            &[vec![0.0], vec![0.1], vec![1.0], vec![1.1]],
            &["a", "a", "b", "b"],
        )
        .unwrap();
        let test = build_labelled_batch("target", &[vec![0.05], vec![1.05]], &["a", "b"]).unwrap();
        Box::new(InMemoryDataset::new(name, train, Some(test)))
    }

    fn strategies() -> Vec<Strategy> {
        vec![
            Strategy::new("1nn", NearestNeighborClassifier::new(1)),
            Strategy::new("majority", MostFrequentClassifier::new()),
        ]
    }

    fn orchestrator() -> Orchestrator<MemoryResults> {
        Orchestrator::new(
            vec![toy_dataset("d1"), toy_dataset("d2")],
            vec![Task::default()],
            strategies(),
            Box::new(PresplitFilesCv),
            MemoryResults::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_runs_every_pair() {
        let orchestrator = orchestrator();
        let report = orchestrator.fit_predict(&OrchestratorConfig::default());

        assert!(report.is_success());
        assert_eq!(report.completed_count(), 4);
        assert_eq!(orchestrator.results().len().unwrap(), 4);

        let record = orchestrator
            .results()
            .load_predictions(&ResultKey::test("1nn", "d1", 0))
            .unwrap()
            .unwrap();
        assert_eq!(record.y_pred(), record.y_true());
        assert_eq!(record.index(), &[0, 1]);
    }

    #[test]
    fn test_rerun_without_overwrite_skips() {
        let orchestrator = orchestrator();
        orchestrator.fit_predict(&OrchestratorConfig::default());
        let report = orchestrator.fit_predict(&OrchestratorConfig::default());

        assert_eq!(report.skipped_count(), 4);
        assert_eq!(orchestrator.results().len().unwrap(), 4);
    }

    #[test]
    fn test_predict_on_train_and_fitted_bytes() {
        let orchestrator = orchestrator();
        let config = OrchestratorConfig::builder().predict_on_train(true).build();
        orchestrator.fit_predict(&config);

        assert_eq!(orchestrator.results().len().unwrap(), 8);
        assert!(orchestrator
            .results()
            .contains(&ResultKey::new("majority", "d2", 0, Partition::Train))
            .unwrap());
        assert!(orchestrator
            .results()
            .load_fitted_strategy("majority", "d2", 0)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_no_fitted_bytes_when_disabled() {
        let orchestrator = orchestrator();
        let config = OrchestratorConfig::builder()
            .save_fitted_strategies(false)
            .build();
        orchestrator.fit_predict(&config);
        assert!(orchestrator
            .results()
            .load_fitted_strategy("1nn", "d1", 0)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_missing_test_table_fails_only_that_dataset() {
        let train =
            build_labelled_batch("target", &[vec![0.0], vec![1.0]], &["a", "b"]).unwrap();
        let orchestrator = Orchestrator::new(
            vec![toy_dataset("ok"), Box::new(InMemoryDataset::new("no_test", train, None))],
            vec![Task::default()],
            strategies(),
            Box::new(PresplitFilesCv),
            MemoryResults::new(),
        )
        .unwrap();

        let report = orchestrator.fit_predict(&OrchestratorConfig::default());
        assert_eq!(report.failed_count(), 2);
        assert_eq!(report.completed_count(), 2);
        assert!(report.outcome("1nn", "no_test").unwrap().is_failure());
    }

    #[test]
    fn test_k_fold_writes_one_record_per_fold() {
        let orchestrator = Orchestrator::new(
            vec![toy_dataset("d")],
            vec![Task::default()],
            vec![Strategy::new("majority", MostFrequentClassifier::new())],
            Box::new(KFold::new(3, true, 1).unwrap()),
            MemoryResults::new(),
        )
        .unwrap();

        let report = orchestrator.fit_predict(&OrchestratorConfig::default());
        assert_eq!(
            report.outcome("majority", "d").unwrap().status,
            PairStatus::Completed {
                folds_run: 3,
                folds_skipped: 0
            }
        );
        assert_eq!(orchestrator.into_results().len().unwrap(), 3);
    }

    #[test]
    fn test_misconfiguration_rejected() {
        let duplicate = Orchestrator::new(
            vec![toy_dataset("d")],
            vec![Task::default()],
            vec![
                Strategy::new("same", MostFrequentClassifier::new()),
                Strategy::new("same", MostFrequentClassifier::new()),
            ],
            Box::new(PresplitFilesCv),
            MemoryResults::new(),
        );
        assert!(matches!(duplicate, Err(Error::InvalidInput(_))));

        let task_mismatch = Orchestrator::new(
            vec![toy_dataset("a"), toy_dataset("b"), toy_dataset("c")],
            vec![Task::default(), Task::default()],
            strategies(),
            Box::new(PresplitFilesCv),
            MemoryResults::new(),
        );
        assert!(matches!(task_mismatch, Err(Error::InvalidInput(_))));
    }
}
