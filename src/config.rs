//! Run configuration
//!
//! [`OrchestratorConfig`] holds the per-run switches of the orchestrator.
//! [`BenchmarkConfig`] is a JSON document describing a whole benchmark: where
//! the datasets and results live, which datasets to run, the target column,
//! the splitter, and the orchestration switches.
//!
//! ```rust
//! use trueno_bench::config::BenchmarkConfig;
//!
//! # fn main() -> trueno_bench::Result<()> {
//! let config = BenchmarkConfig::from_json_str(r#"{
//!     "data_root": "data",
//!     "results_root": "results",
//!     "datasets": ["GunPoint", "ItalyPowerDemand"],
//!     "cv": { "kind": "k_fold", "n_splits": 5, "shuffle": true, "seed": 7 },
//!     "orchestration": { "overwrite_predictions": true }
//! }"#)?;
//!
//! assert_eq!(config.target, "target");
//! assert!(config.orchestration.overwrite_predictions);
//! assert!(config.orchestration.save_fitted_strategies);
//! # Ok(())
//! # }
//! ```

use crate::cv::{KFold, PresplitFilesCv, SingleSplit, Splitter};
use crate::data::{make_datasets, DatasetRegistry, Task};
use crate::results::HddResults;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Orchestrator switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Recompute and replace existing predictions instead of skipping them
    pub overwrite_predictions: bool,
    /// Also predict the training fold and store it under `train`
    pub predict_on_train: bool,
    /// Persist fitted estimators that support serialization
    pub save_fitted_strategies: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            overwrite_predictions: false,
            predict_on_train: false,
            save_fitted_strategies: true,
        }
    }
}

impl OrchestratorConfig {
    /// Builder starting from the defaults.
    #[must_use]
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder::default()
    }
}

/// Builder for [`OrchestratorConfig`].
#[derive(Debug, Default)]
pub struct OrchestratorConfigBuilder {
    config: OrchestratorConfig,
}

impl OrchestratorConfigBuilder {
    /// Replace existing predictions.
    #[must_use]
    pub const fn overwrite_predictions(mut self, overwrite: bool) -> Self {
        self.config.overwrite_predictions = overwrite;
        self
    }

    /// Predict the training fold as well.
    #[must_use]
    pub const fn predict_on_train(mut self, predict_on_train: bool) -> Self {
        self.config.predict_on_train = predict_on_train;
        self
    }

    /// Persist fitted estimators.
    #[must_use]
    pub const fn save_fitted_strategies(mut self, save: bool) -> Self {
        self.config.save_fitted_strategies = save;
        self
    }

    /// Build the config.
    #[must_use]
    pub const fn build(self) -> OrchestratorConfig {
        self.config
    }
}

/// Splitter choice in a [`BenchmarkConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CvConfig {
    /// Use the dataset's own train/test files
    #[default]
    Presplit,
    /// One seeded random split
    SingleSplit {
        /// Fraction of rows held out
        test_fraction: f64,
        /// Shuffle seed
        #[serde(default)]
        seed: u64,
    },
    /// K-fold cross-validation
    KFold {
        /// Number of folds
        n_splits: usize,
        /// Shuffle rows before folding
        #[serde(default)]
        shuffle: bool,
        /// Shuffle seed
        #[serde(default)]
        seed: u64,
    },
}

impl CvConfig {
    /// Build the splitter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for out-of-range parameters.
    pub fn splitter(self) -> Result<Box<dyn Splitter>> {
        Ok(match self {
            Self::Presplit => Box::new(PresplitFilesCv),
            Self::SingleSplit {
                test_fraction,
                seed,
            } => Box::new(SingleSplit::new(test_fraction, seed)?),
            Self::KFold {
                n_splits,
                shuffle,
                seed,
            } => Box::new(KFold::new(n_splits, shuffle, seed)?),
        })
    }
}

fn default_target() -> String {
    "target".to_string()
}

/// A benchmark run described as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Directory holding `{name}/{name}_TRAIN.parquet` datasets
    pub data_root: PathBuf,
    /// Directory of the on-disk results store
    pub results_root: PathBuf,
    /// Dataset names, in run order
    pub datasets: Vec<String>,
    /// Target column shared by every dataset
    #[serde(default = "default_target")]
    pub target: String,
    /// Splitter
    #[serde(default)]
    pub cv: CvConfig,
    /// Orchestrator switches
    #[serde(default)]
    pub orchestration: OrchestratorConfig,
}

impl BenchmarkConfig {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `Json` for malformed documents and `InvalidInput` if
    /// validation fails.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, otherwise as
    /// [`Self::from_json_str`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check the document for obvious mistakes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty or duplicated dataset list, an
    /// empty target, or invalid splitter parameters.
    pub fn validate(&self) -> Result<()> {
        if self.datasets.is_empty() {
            return Err(Error::InvalidInput("No datasets configured".to_string()));
        }
        let mut names: Vec<&str> = self.datasets.iter().map(String::as_str).collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(Error::InvalidInput(format!(
                "Dataset '{}' listed twice",
                pair[0]
            )));
        }
        if self.target.is_empty() {
            return Err(Error::InvalidInput("Target column name is empty".to_string()));
        }
        self.cv.splitter().map(|_| ())
    }

    /// Registry of the configured Parquet datasets.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for duplicate dataset names.
    pub fn registry(&self) -> Result<DatasetRegistry> {
        make_datasets(&self.data_root, &self.datasets)
    }

    /// The shared task.
    #[must_use]
    pub fn task(&self) -> Task {
        Task::new(self.target.clone())
    }

    /// The configured splitter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for out-of-range parameters.
    pub fn splitter(&self) -> Result<Box<dyn Splitter>> {
        self.cv.splitter()
    }

    /// Open (or create) the on-disk results store.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or its manifest cannot be read.
    pub fn open_results(&self) -> Result<HddResults> {
        HddResults::open(&self.results_root)
    }
}
