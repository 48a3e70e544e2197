//! # Trueno-Bench: Benchmarking and Evaluation of Classification Strategies
//!
//! **Version**: 0.1.0
//!
//! Trueno-Bench runs a set of classification strategies over a set of
//! datasets, persists every prediction, and compares the strategies with
//! classical statistical tests.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Jidoka**: A failing (strategy, dataset) pair stops itself, never the run
//! - **Poka-Yoke safety**: Result keys are unique; re-runs skip or replace,
//!   never duplicate
//! - **Genchi Genbutsu**: Every score is recomputed from stored predictions
//! - **Kaizen**: On-disk results re-open and grow incrementally
//!
//! ## Workflow
//!
//! ```text
//! DatasetRegistry ──┐
//! Strategies ───────┼──> Orchestrator ──> ResultsStore ──> Evaluator
//! Splitter ─────────┘      (fit/predict)    (Parquet)       (rank, tests)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use trueno_bench::config::OrchestratorConfig;
//! use trueno_bench::cv::PresplitFilesCv;
//! use trueno_bench::data::{make_datasets, Task};
//! use trueno_bench::estimator::{MostFrequentClassifier, NearestNeighborClassifier, Strategy};
//! use trueno_bench::evaluation::{Evaluator, FoldSelection, SortOrder};
//! use trueno_bench::metrics::PairwiseMetric;
//! use trueno_bench::orchestration::Orchestrator;
//! use trueno_bench::results::{HddResults, Partition};
//!
//! let datasets = make_datasets("data", &["GunPoint", "ItalyPowerDemand"])?;
//! let orchestrator = Orchestrator::new(
//!     datasets.into_datasets(),
//!     vec![Task::default()],
//!     vec![
//!         Strategy::new("1nn", NearestNeighborClassifier::new(1)),
//!         Strategy::new("majority", MostFrequentClassifier::new()),
//!     ],
//!     Box::new(PresplitFilesCv),
//!     HddResults::open("results")?,
//! )?;
//! let report = orchestrator.fit_predict(&OrchestratorConfig::default());
//! println!("{} pairs failed", report.failed_count());
//!
//! let mut evaluator = Evaluator::new(orchestrator.results());
//! evaluator.evaluate(&PairwiseMetric::accuracy(), Partition::Test, FoldSelection::All)?;
//! let ranking = evaluator.rank(None, SortOrder::Descending)?;
//! println!("{:?}", ranking.average_ranks);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod cv;
pub mod data;
pub mod error;
pub mod estimator;
pub mod evaluation;
pub mod logging;
pub mod metrics;
pub mod orchestration;
pub mod results;
pub mod storage;

pub use error::{Error, Result};
