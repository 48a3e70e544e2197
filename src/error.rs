//! Error types for trueno-bench
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// trueno-bench error types
#[derive(Error, Debug)]
pub enum Error {
    /// Dataset could not be resolved or its files are missing
    #[error("Dataset not found: {name} (looked in {location})")]
    DatasetNotFound {
        /// Dataset name
        name: String,
        /// Where the loader looked
        location: String,
    },

    /// Estimator failed while fitting one (strategy, dataset) pair
    #[error("Fit failed for strategy '{strategy}' on dataset '{dataset}': {reason}")]
    FitFailed {
        /// Strategy name
        strategy: String,
        /// Dataset name
        dataset: String,
        /// Underlying failure
        reason: String,
    },

    /// Estimator failed while predicting one (strategy, dataset) pair
    #[error("Predict failed for strategy '{strategy}' on dataset '{dataset}': {reason}")]
    PredictFailed {
        /// Strategy name
        strategy: String,
        /// Dataset name
        dataset: String,
        /// Underlying failure
        reason: String,
    },

    /// Results already exist at the target location
    #[error("Results already exist at {0}\nUse HddResults::open to update them in place")]
    ResultsPathConflict(String),

    /// Estimator used before `fit`
    #[error("Estimator '{0}' is not fitted: call fit() before predict()")]
    NotFitted(String),

    /// Invalid argument or inconsistent input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Statistical procedure could not be applied
    #[error("Statistics error: {0}")]
    Statistics(String),

    /// Storage error (Parquet/Arrow layout, manifest)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
