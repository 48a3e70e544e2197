//! Result Record - predictions of one strategy on one dataset fold

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of a fold the predictions were made on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    /// Predictions on the training rows the estimator was fitted on.
    Train,
    /// Predictions on held-out rows.
    Test,
}

impl Partition {
    /// Lower-case name used in file names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a stored prediction set.
///
/// Ordering is (strategy, dataset, fold, partition), which is the order
/// stores list their keys in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResultKey {
    strategy: String,
    dataset: String,
    cv_fold: usize,
    partition: Partition,
}

impl ResultKey {
    /// Create a key.
    #[must_use]
    pub fn new(
        strategy: impl Into<String>,
        dataset: impl Into<String>,
        cv_fold: usize,
        partition: Partition,
    ) -> Self {
        Self {
            strategy: strategy.into(),
            dataset: dataset.into(),
            cv_fold,
            partition,
        }
    }

    /// Key of the test predictions for a fold.
    #[must_use]
    pub fn test(strategy: impl Into<String>, dataset: impl Into<String>, cv_fold: usize) -> Self {
        Self::new(strategy, dataset, cv_fold, Partition::Test)
    }

    /// Strategy name.
    #[must_use]
    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    /// Dataset name.
    #[must_use]
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Fold number.
    #[must_use]
    pub const fn cv_fold(&self) -> usize {
        self.cv_fold
    }

    /// Train or test.
    #[must_use]
    pub const fn partition(&self) -> Partition {
        self.partition
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}_fold{}",
            self.strategy, self.dataset, self.partition, self.cv_fold
        )
    }
}

/// True and predicted labels for one [`ResultKey`].
///
/// Immutable once built: fields are private and only readable through
/// getters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultRecord {
    key: ResultKey,
    index: Vec<u64>,
    y_true: Vec<String>,
    y_pred: Vec<String>,
    fit_seconds: f64,
    predict_seconds: f64,
    created_at: DateTime<Utc>,
}

impl ResultRecord {
    /// Create a record stamped with the current time.
    ///
    /// # Arguments
    ///
    /// * `key` - Strategy, dataset, fold and partition
    /// * `index` - Row position of each prediction in the source table
    /// * `y_true` - True labels
    /// * `y_pred` - Predicted labels
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the three vectors differ in length.
    pub fn new(
        key: ResultKey,
        index: Vec<u64>,
        y_true: Vec<String>,
        y_pred: Vec<String>,
    ) -> Result<Self> {
        if index.len() != y_true.len() || y_true.len() != y_pred.len() {
            return Err(Error::InvalidInput(format!(
                "Record {key}: {} indices, {} true labels, {} predictions",
                index.len(),
                y_true.len(),
                y_pred.len()
            )));
        }
        Ok(Self {
            key,
            index,
            y_true,
            y_pred,
            fit_seconds: 0.0,
            predict_seconds: 0.0,
            created_at: Utc::now(),
        })
    }

    /// Attach fit and predict wall-clock durations.
    #[must_use]
    pub fn with_timings(mut self, fit_seconds: f64, predict_seconds: f64) -> Self {
        self.fit_seconds = fit_seconds;
        self.predict_seconds = predict_seconds;
        self
    }

    /// Rebuild a record read back from storage, keeping its original timestamp.
    pub(crate) fn restore(
        key: ResultKey,
        index: Vec<u64>,
        y_true: Vec<String>,
        y_pred: Vec<String>,
        fit_seconds: f64,
        predict_seconds: f64,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let record = Self::new(key, index, y_true, y_pred)?;
        Ok(Self {
            fit_seconds,
            predict_seconds,
            created_at,
            ..record
        })
    }

    /// The record key.
    #[must_use]
    pub const fn key(&self) -> &ResultKey {
        &self.key
    }

    /// Strategy name.
    #[must_use]
    pub fn strategy_name(&self) -> &str {
        self.key.strategy()
    }

    /// Dataset name.
    #[must_use]
    pub fn dataset_name(&self) -> &str {
        self.key.dataset()
    }

    /// Row positions of the predictions.
    #[must_use]
    pub fn index(&self) -> &[u64] {
        &self.index
    }

    /// True labels.
    #[must_use]
    pub fn y_true(&self) -> &[String] {
        &self.y_true
    }

    /// Predicted labels.
    #[must_use]
    pub fn y_pred(&self) -> &[String] {
        &self.y_pred
    }

    /// Seconds spent fitting.
    #[must_use]
    pub const fn fit_seconds(&self) -> f64 {
        self.fit_seconds
    }

    /// Seconds spent predicting.
    #[must_use]
    pub const fn predict_seconds(&self) -> f64 {
        self.predict_seconds
    }

    /// When the record was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Number of predictions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.y_pred.len()
    }

    /// Whether the record holds no predictions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.y_pred.is_empty()
    }
}
