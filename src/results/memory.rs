//! In-memory results store using `DashMap`.
//!
//! Data is lost on process exit; use [`super::HddResults`] for persistence.

use super::{ResultKey, ResultRecord, ResultsStore};
use crate::Result;
use dashmap::DashMap;

/// In-memory results store.
#[derive(Debug, Default)]
pub struct MemoryResults {
    predictions: DashMap<ResultKey, ResultRecord>,
    fitted: DashMap<(String, String, usize), Vec<u8>>,
}

impl MemoryResults {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove everything.
    pub fn clear(&self) {
        self.predictions.clear();
        self.fitted.clear();
    }
}

impl ResultsStore for MemoryResults {
    fn save_predictions(&self, record: ResultRecord) -> Result<()> {
        self.predictions.insert(record.key().clone(), record);
        Ok(())
    }

    fn load_predictions(&self, key: &ResultKey) -> Result<Option<ResultRecord>> {
        Ok(self.predictions.get(key).map(|r| r.value().clone()))
    }

    fn contains(&self, key: &ResultKey) -> Result<bool> {
        Ok(self.predictions.contains_key(key))
    }

    fn keys(&self) -> Result<Vec<ResultKey>> {
        let mut keys: Vec<ResultKey> = self.predictions.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }

    fn save_fitted_strategy(
        &self,
        strategy: &str,
        dataset: &str,
        cv_fold: usize,
        bytes: &[u8],
    ) -> Result<()> {
        self.fitted.insert(
            (strategy.to_string(), dataset.to_string(), cv_fold),
            bytes.to_vec(),
        );
        Ok(())
    }

    fn load_fitted_strategy(
        &self,
        strategy: &str,
        dataset: &str,
        cv_fold: usize,
    ) -> Result<Option<Vec<u8>>> {
        Ok(self
            .fitted
            .get(&(strategy.to_string(), dataset.to_string(), cv_fold))
            .map(|v| v.value().clone()))
    }
}
