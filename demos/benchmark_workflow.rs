//! Benchmark Workflow Example
//!
//! Writes a few synthetic Parquet datasets, benchmarks two baselines on them,
//! and compares the baselines with the evaluator's statistical tests.
//!
//! Run with: cargo run --example benchmark_workflow
//! More detail: RUST_LOG=trueno_bench=debug cargo run --example benchmark_workflow

use anyhow::Context;
use std::path::Path;
use trueno_bench::config::OrchestratorConfig;
use trueno_bench::cv::KFold;
use trueno_bench::data::{build_labelled_batch, make_datasets, Task};
use trueno_bench::estimator::{MostFrequentClassifier, NearestNeighborClassifier, Strategy};
use trueno_bench::evaluation::{Evaluator, FoldSelection, SortOrder};
use trueno_bench::logging;
use trueno_bench::metrics::{AggregateMetric, PairwiseMetric};
use trueno_bench::orchestration::Orchestrator;
use trueno_bench::results::{HddResults, Partition, ResultsStore};
use trueno_bench::storage::StorageEngine;

const DATASETS: [&str; 4] = ["Blobs", "Rings", "Stripes", "Noise"];

/// Two-class dataset whose class separation shrinks with `difficulty`.
#[allow(clippy::cast_precision_loss)]
fn write_dataset(root: &Path, name: &str, difficulty: f32) -> anyhow::Result<()> {
    let n = 60;
    let rows: Vec<Vec<f32>> = (0..n)
        .map(|i| {
            let jitter = ((i * 37) % 11) as f32 / 11.0;
            let centre = if i % 3 == 0 { 0.0 } else { 4.0 - 3.5 * difficulty };
            vec![centre + jitter, centre - jitter, jitter * 2.0]
        })
        .collect();
    let labels: Vec<&str> = (0..n).map(|i| if i % 3 == 0 { "neg" } else { "pos" }).collect();

    let batch = build_labelled_batch("target", &rows, &labels)?;
    StorageEngine::new(vec![batch])
        .write_parquet(root.join(name).join(format!("{name}_TRAIN.parquet")))?;
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn main() -> anyhow::Result<()> {
    logging::init("info");
    println!("=== Trueno-Bench Benchmark Workflow ===\n");

    let workspace = tempfile::tempdir().context("creating workspace")?;
    let data_root = workspace.path().join("data");
    let results_root = workspace.path().join("results");

    // -------------------------------------------------------------------------
    // 1. Datasets
    // -------------------------------------------------------------------------
    println!("1. Writing {} synthetic datasets...", DATASETS.len());
    for (i, name) in DATASETS.iter().enumerate() {
        write_dataset(&data_root, name, i as f32 / DATASETS.len() as f32)?;
    }
    let registry = make_datasets(&data_root, &DATASETS)?;
    println!("   Registered: {:?}", registry.names());

    // -------------------------------------------------------------------------
    // 2. Orchestration
    // -------------------------------------------------------------------------
    println!("\n2. Running 2 strategies x {} datasets x 5 folds...", DATASETS.len());
    let orchestrator = Orchestrator::new(
        registry.into_datasets(),
        vec![Task::default()],
        vec![
            Strategy::new("3nn", NearestNeighborClassifier::new(3)),
            Strategy::new("majority", MostFrequentClassifier::new()),
        ],
        Box::new(KFold::new(5, true, 2024)?),
        HddResults::create(&results_root)?,
    )?;

    let config = OrchestratorConfig::builder().predict_on_train(true).build();
    let report = orchestrator.fit_predict(&config);
    println!(
        "   Completed: {}, skipped: {}, failed: {}",
        report.completed_count(),
        report.skipped_count(),
        report.failed_count()
    );
    println!("   Stored records: {}", orchestrator.results().len()?);

    // Re-running without overwrite is a no-op.
    let rerun = orchestrator.fit_predict(&OrchestratorConfig::default());
    println!("   Re-run skipped {} pairs", rerun.skipped_count());

    // -------------------------------------------------------------------------
    // 3. Evaluation
    // -------------------------------------------------------------------------
    println!("\n3. Evaluating...");
    let mut evaluator = Evaluator::new(orchestrator.results());
    evaluator.evaluate(&PairwiseMetric::accuracy(), Partition::Test, FoldSelection::All)?;
    evaluator.evaluate(&AggregateMetric::zero_one_loss(), Partition::Train, FoldSelection::All)?;

    for score in evaluator.metrics_by_strategy(Some("accuracy"))? {
        println!(
            "   {:<10} accuracy {:.3} ± {:.3} over {} datasets",
            score.strategy, score.mean, score.stderr, score.n_datasets
        );
    }
    for score in evaluator.metrics_by_strategy(Some("zero_one_loss"))? {
        println!("   {:<10} train loss {:.3}", score.strategy, score.mean);
    }

    let ranking = evaluator.rank(Some("accuracy"), SortOrder::Descending)?;
    println!("\n   Average ranks:");
    for (strategy, rank) in ranking.strategies.iter().zip(&ranking.average_ranks) {
        println!("   {strategy:<10} {rank:.2}");
    }

    // -------------------------------------------------------------------------
    // 4. Statistical tests
    // -------------------------------------------------------------------------
    println!("\n4. Comparing strategies...");
    let metric = Some("accuracy");
    for comparison in evaluator.t_test(metric)? {
        println!(
            "   t-test       {} vs {}: t = {:.3}, p = {:.4}",
            comparison.strategy_a, comparison.strategy_b, comparison.statistic, comparison.p_value
        );
    }
    for comparison in evaluator.sign_test(metric)? {
        println!(
            "   sign test    {} vs {}: wins = {}, p = {:.4}",
            comparison.strategy_a, comparison.strategy_b, comparison.statistic, comparison.p_value
        );
    }
    for comparison in evaluator.ranksum_test(metric)? {
        println!(
            "   rank-sum     {} vs {}: z = {:.3}, p = {:.4}",
            comparison.strategy_a, comparison.strategy_b, comparison.statistic, comparison.p_value
        );
    }
    match evaluator.wilcoxon_test(metric) {
        Ok(comparisons) => {
            for comparison in comparisons {
                println!(
                    "   signed-rank  {} vs {}: W = {}, p = {:.4}",
                    comparison.strategy_a,
                    comparison.strategy_b,
                    comparison.statistic,
                    comparison.p_value
                );
            }
        }
        Err(e) => println!("   signed-rank  skipped: {e}"),
    }

    let table = evaluator.t_test_with_bonferroni_correction(metric, 0.05)?;
    println!("   Bonferroni threshold: {:.4}", table.threshold);
    for row in &table.comparisons {
        println!(
            "   {} vs {} significant: {}",
            row.comparison.strategy_a, row.comparison.strategy_b, row.significant
        );
    }

    let nemenyi = evaluator.nemenyi(metric)?;
    println!("   Nemenyi p-values: {:?}", nemenyi.p_values);
    println!(
        "   Critical difference (alpha = 0.05): {:.3}",
        evaluator.critical_difference(metric, 0.05)?
    );

    // Friedman needs three or more strategies.
    if let Err(e) = evaluator.friedman_test(metric) {
        println!("   Friedman skipped: {e}");
    }

    // -------------------------------------------------------------------------
    // 5. Persistence
    // -------------------------------------------------------------------------
    println!("\n5. Re-opening results from {}", results_root.display());
    let reopened = HddResults::open(&results_root)?;
    println!(
        "   Strategies: {:?}, datasets: {:?}",
        reopened.strategy_names()?,
        reopened.dataset_names()?
    );

    println!("\n=== Done ===");
    Ok(())
}
