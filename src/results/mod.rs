//! Results store
//!
//! Predictions are stored as [`ResultRecord`]s keyed by [`ResultKey`]
//! (strategy, dataset, fold, partition). Writing an existing key replaces the
//! record; every other write appends. Fitted estimators can be stored next to
//! the predictions as opaque bytes.
//!
//! Two backends:
//! - [`MemoryResults`]: in-memory, lost on process exit
//! - [`HddResults`]: Parquet files plus a JSON manifest under a root directory
//!
//! ```rust
//! use trueno_bench::results::{MemoryResults, ResultKey, ResultRecord, ResultsStore};
//!
//! # fn main() -> trueno_bench::Result<()> {
//! let store = MemoryResults::new();
//! let key = ResultKey::test("1nn", "GunPoint", 0);
//! let record = ResultRecord::new(
//!     key.clone(),
//!     vec![0, 1],
//!     vec!["1".to_string(), "2".to_string()],
//!     vec!["1".to_string(), "1".to_string()],
//! )?;
//!
//! store.save_predictions(record)?;
//! assert!(store.contains(&key)?);
//! assert_eq!(store.strategy_names()?, vec!["1nn"]);
//! # Ok(())
//! # }
//! ```

mod hdd;
mod memory;
mod record;

pub use hdd::HddResults;
pub use memory::MemoryResults;
pub use record::{Partition, ResultKey, ResultRecord};

use crate::Result;

/// Keyed, append-only store of predictions.
///
/// Methods take `&self`; backends use interior mutability so a store can be
/// read by an evaluator while an orchestrator owns it.
pub trait ResultsStore {
    /// Store a record, replacing any record with the same key.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be persisted.
    fn save_predictions(&self, record: ResultRecord) -> Result<()>;

    /// Load the record for a key, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if stored data cannot be read back.
    fn load_predictions(&self, key: &ResultKey) -> Result<Option<ResultRecord>>;

    /// Whether a record exists for a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    fn contains(&self, key: &ResultKey) -> Result<bool>;

    /// All stored keys in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    fn keys(&self) -> Result<Vec<ResultKey>>;

    /// Store a fitted estimator's bytes for (strategy, dataset, fold).
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be persisted.
    fn save_fitted_strategy(
        &self,
        strategy: &str,
        dataset: &str,
        cv_fold: usize,
        bytes: &[u8],
    ) -> Result<()>;

    /// Load a fitted estimator's bytes, if stored.
    ///
    /// # Errors
    ///
    /// Returns an error if stored data cannot be read back.
    fn load_fitted_strategy(
        &self,
        strategy: &str,
        dataset: &str,
        cv_fold: usize,
    ) -> Result<Option<Vec<u8>>>;

    /// Number of stored prediction records.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    fn len(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    /// Whether the store holds no prediction records.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Distinct strategy names, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    fn strategy_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .keys()?
            .into_iter()
            .map(|key| key.strategy().to_string())
            .collect();
        names.dedup();
        Ok(names)
    }

    /// Distinct dataset names, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    fn dataset_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .keys()?
            .into_iter()
            .map(|key| key.dataset().to_string())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}
