//! Majority-class baseline

use super::{check_fit_input, Estimator};
use crate::data::FeatureTable;
use crate::{Error, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Predicts the most frequent training label for every row.
///
/// Ties are broken by the lexicographically smallest label so repeated runs
/// agree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MostFrequentClassifier {
    majority: Option<String>,
}

impl MostFrequentClassifier {
    /// Create an unfitted classifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The learned label, once fitted.
    #[must_use]
    pub fn majority(&self) -> Option<&str> {
        self.majority.as_deref()
    }
}

impl Estimator for MostFrequentClassifier {
    fn name(&self) -> &str {
        "most_frequent"
    }

    fn fit(&mut self, features: &FeatureTable, labels: &[String]) -> Result<()> {
        check_fit_input(features, labels)?;

        let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
        for label in labels {
            *counts.entry(label.as_str()).or_insert(0) += 1;
        }

        self.majority = counts
            .into_iter()
            .max_by(|(a_label, a_count), (b_label, b_count)| {
                a_count.cmp(b_count).then_with(|| b_label.cmp(a_label))
            })
            .map(|(label, _)| label.to_string());
        Ok(())
    }

    fn predict(&self, features: &FeatureTable) -> Result<Vec<String>> {
        let majority = self
            .majority
            .as_ref()
            .ok_or_else(|| Error::NotFitted(self.name().to_string()))?;
        Ok(vec![majority.clone(); features.n_rows()])
    }

    fn fresh(&self) -> Box<dyn Estimator> {
        Box::new(Self::new())
    }

    fn to_bytes(&self) -> Result<Option<Vec<u8>>> {
        Ok(Some(serde_json::to_vec(self)?))
    }
}
