//! End-to-end orchestration tests
//!
//! Toyota Way: Jidoka (one failing strategy must not stop the line)

use std::cell::Cell;
use std::rc::Rc;
use trueno_bench::config::OrchestratorConfig;
use trueno_bench::cv::{PresplitFilesCv, SingleSplit};
use trueno_bench::data::{build_labelled_batch, Dataset, FeatureTable, InMemoryDataset, Task};
use trueno_bench::estimator::{
    Estimator, MostFrequentClassifier, NearestNeighborClassifier, Strategy,
};
use trueno_bench::orchestration::{Orchestrator, PairStatus};
use trueno_bench::results::{MemoryResults, Partition, ResultKey, ResultsStore};
use trueno_bench::{Error, Result};

/// Always fails to fit.
struct BrokenFit;

impl Estimator for BrokenFit {
    fn name(&self) -> &str {
        "broken_fit"
    }

    fn fit(&mut self, _features: &FeatureTable, _labels: &[String]) -> Result<()> {
        Err(Error::Other("singular matrix".to_string()))
    }

    fn predict(&self, _features: &FeatureTable) -> Result<Vec<String>> {
        Err(Error::NotFitted(self.name().to_string()))
    }

    fn fresh(&self) -> Box<dyn Estimator> {
        Box::new(Self)
    }
}

/// Fits, then returns one prediction too few.
struct ShortPredictions;

impl Estimator for ShortPredictions {
    fn name(&self) -> &str {
        "short"
    }

    fn fit(&mut self, _features: &FeatureTable, _labels: &[String]) -> Result<()> {
        Ok(())
    }

    fn predict(&self, features: &FeatureTable) -> Result<Vec<String>> {
        Ok(vec!["a".to_string(); features.n_rows().saturating_sub(1)])
    }

    fn fresh(&self) -> Box<dyn Estimator> {
        Box::new(Self)
    }
}

/// Predicts `fit{n}` for every row, where `n` counts fits across all copies.
struct FitCounter {
    fits: Rc<Cell<usize>>,
    label: String,
}

impl FitCounter {
    fn new() -> Self {
        Self {
            fits: Rc::new(Cell::new(0)),
            label: String::new(),
        }
    }
}

impl Estimator for FitCounter {
    fn name(&self) -> &str {
        "fit_counter"
    }

    fn fit(&mut self, _features: &FeatureTable, _labels: &[String]) -> Result<()> {
        self.label = format!("fit{}", self.fits.get());
        self.fits.set(self.fits.get() + 1);
        Ok(())
    }

    fn predict(&self, features: &FeatureTable) -> Result<Vec<String>> {
        Ok(vec![self.label.clone(); features.n_rows()])
    }

    fn fresh(&self) -> Box<dyn Estimator> {
        Box::new(Self {
            fits: Rc::clone(&self.fits),
            label: String::new(),
        })
    }
}

fn dataset(name: &str, shift: f32) -> Box<dyn Dataset> {
    let train_rows: Vec<Vec<f32>> = (0..8_u8)
        .map(|i| {
            let cluster = if i < 4 { 0.0 } else { 5.0 };
            vec![shift + cluster + f32::from(i) * 0.1]
        })
        .collect();
    let train_labels = ["a", "a", "a", "a", "b", "b", "b", "b"];
    let test_rows = vec![vec![shift + 0.2], vec![shift + 5.2], vec![shift + 5.3]];
    let test_labels = ["a", "b", "b"];

    let train = build_labelled_batch("target", &train_rows, &train_labels).unwrap();
    let test = build_labelled_batch("target", &test_rows, &test_labels).unwrap();
    Box::new(InMemoryDataset::new(name, train, Some(test)))
}

fn datasets() -> Vec<Box<dyn Dataset>> {
    vec![dataset("alpha", 0.0), dataset("beta", 10.0)]
}

fn good_strategies() -> Vec<Strategy> {
    vec![
        Strategy::new("1nn", NearestNeighborClassifier::new(1)),
        Strategy::new("majority", MostFrequentClassifier::new()),
    ]
}

fn orchestrator(strategies: Vec<Strategy>) -> Orchestrator<MemoryResults> {
    Orchestrator::new(
        datasets(),
        vec![Task::default()],
        strategies,
        Box::new(PresplitFilesCv),
        MemoryResults::new(),
    )
    .unwrap()
}

#[test]
fn test_one_test_record_per_pair() {
    let orchestrator = orchestrator(good_strategies());
    let report = orchestrator.fit_predict(&OrchestratorConfig::default());

    assert!(report.is_success());
    assert_eq!(report.outcomes().len(), 4);

    let keys = orchestrator.results().keys().unwrap();
    assert_eq!(keys.len(), 4);
    assert!(keys.iter().all(|k| k.partition() == Partition::Test));
}

#[test]
fn test_overwrite_replaces_records() {
    let orchestrator = orchestrator(vec![Strategy::new("counter", FitCounter::new())]);
    orchestrator.fit_predict(&OrchestratorConfig::default());
    let key = ResultKey::test("counter", "alpha", 0);
    let first = orchestrator.results().load_predictions(&key).unwrap().unwrap();
    assert_eq!(first.y_pred(), &["fit0", "fit0", "fit0"]);

    let overwrite = OrchestratorConfig::builder()
        .overwrite_predictions(true)
        .build();
    let report = orchestrator.fit_predict(&overwrite);
    assert_eq!(report.completed_count(), 2);

    // alpha and beta took fits 0 and 1; the rewrite of alpha is fit 2
    let second = orchestrator.results().load_predictions(&key).unwrap().unwrap();
    assert_eq!(orchestrator.results().len().unwrap(), 2);
    assert_eq!(second.y_pred(), &["fit2", "fit2", "fit2"]);
    assert!(second.created_at() >= first.created_at());
}

#[test]
fn test_rerun_without_overwrite_adds_nothing() {
    let orchestrator = orchestrator(good_strategies());
    orchestrator.fit_predict(&OrchestratorConfig::default());
    let before = orchestrator.results().keys().unwrap();

    let report = orchestrator.fit_predict(&OrchestratorConfig::default());
    assert_eq!(report.skipped_count(), 4);
    assert_eq!(orchestrator.results().keys().unwrap(), before);
}

#[test]
fn test_predict_on_train_after_test_only_run() {
    let orchestrator = orchestrator(good_strategies());
    orchestrator.fit_predict(&OrchestratorConfig::default());

    // train predictions are missing, so folds are re-run rather than skipped
    let config = OrchestratorConfig::builder().predict_on_train(true).build();
    let report = orchestrator.fit_predict(&config);
    assert_eq!(report.completed_count(), 4);
    assert_eq!(orchestrator.results().len().unwrap(), 8);

    let train = orchestrator
        .results()
        .load_predictions(&ResultKey::new("majority", "beta", 0, Partition::Train))
        .unwrap()
        .unwrap();
    assert_eq!(train.len(), 8);
}

#[test]
fn test_failing_strategy_is_isolated() {
    let mut strategies = good_strategies();
    strategies.push(Strategy::new("broken", BrokenFit));
    strategies.push(Strategy::new("short", ShortPredictions));
    let orchestrator = orchestrator(strategies);

    let report = orchestrator.fit_predict(&OrchestratorConfig::default());
    assert_eq!(report.completed_count(), 4);
    assert_eq!(report.failed_count(), 4);

    match &report.outcome("broken", "alpha").unwrap().status {
        PairStatus::Failed { error, folds_run } => {
            assert_eq!(*folds_run, 0);
            assert!(error.contains("Fit failed"));
            assert!(error.contains("singular matrix"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    match &report.outcome("short", "beta").unwrap().status {
        PairStatus::Failed { error, .. } => assert!(error.contains("2 predictions for 3 rows")),
        other => panic!("expected failure, got {other:?}"),
    }

    let results = orchestrator.results();
    assert_eq!(results.strategy_names().unwrap(), vec!["1nn", "majority"]);
    assert!(!results.contains(&ResultKey::test("broken", "alpha", 0)).unwrap());
}

#[test]
fn test_per_dataset_tasks() {
    let relabelled = {
        let train = build_labelled_batch(
            "class",
            &[vec![0.0], vec![1.0], vec![2.0]],
            &["x", "y", "y"],
        )
        .unwrap();
        let test = build_labelled_batch("class", &[vec![1.5]], &["y"]).unwrap();
        Box::new(InMemoryDataset::new("gamma", train, Some(test))) as Box<dyn Dataset>
    };

    let orchestrator = Orchestrator::new(
        vec![dataset("alpha", 0.0), relabelled],
        vec![Task::new("target"), Task::new("class")],
        good_strategies(),
        Box::new(PresplitFilesCv),
        MemoryResults::new(),
    )
    .unwrap();

    let report = orchestrator.fit_predict(&OrchestratorConfig::default());
    assert!(report.is_success());
    let record = orchestrator
        .results()
        .load_predictions(&ResultKey::test("majority", "gamma", 0))
        .unwrap()
        .unwrap();
    assert_eq!(record.y_pred(), &["y".to_string()]);
}

#[test]
fn test_random_split_indices_refer_to_pooled_rows() {
    let orchestrator = Orchestrator::new(
        datasets(),
        vec![Task::default()],
        good_strategies(),
        Box::new(SingleSplit::new(0.25, 42).unwrap()),
        MemoryResults::new(),
    )
    .unwrap();
    orchestrator.fit_predict(&OrchestratorConfig::default());

    let record = orchestrator
        .results()
        .load_predictions(&ResultKey::test("1nn", "alpha", 0))
        .unwrap()
        .unwrap();
    // 11 pooled rows, 25% held out -> 3 test rows
    assert_eq!(record.len(), 3);
    assert!(record.index().iter().all(|&i| i < 11));
}
