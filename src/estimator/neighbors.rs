//! k-nearest-neighbour baseline
//!
//! Squared Euclidean distance is the SIMD sum of squares of the difference
//! vector `q - x` via `trueno::Vector`. The expanded form
//! `|q|^2 + |x|^2 - 2 q.x` cancels catastrophically in `f32` once features
//! are large relative to their gaps, so it is not used.

use super::{check_fit_input, Estimator};
use crate::data::FeatureTable;
use crate::{Error, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use trueno::Vector;

/// k-NN classifier with majority vote.
///
/// Vote ties go to the label of the closest neighbour among the tied labels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NearestNeighborClassifier {
    n_neighbors: usize,
    train_rows: Vec<Vec<f32>>,
    train_labels: Vec<String>,
}

impl NearestNeighborClassifier {
    /// Create an unfitted classifier using `n_neighbors` neighbours.
    #[must_use]
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors,
            train_rows: Vec::new(),
            train_labels: Vec::new(),
        }
    }

    /// Configured neighbour count.
    #[must_use]
    pub const fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    fn is_fitted(&self) -> bool {
        !self.train_rows.is_empty()
    }

    fn vote(&self, neighbours: &[(f32, usize)]) -> String {
        // label -> (votes, rank of closest occurrence)
        let mut tally: FxHashMap<&str, (usize, usize)> = FxHashMap::default();
        for (rank, &(_, index)) in neighbours.iter().enumerate() {
            let entry = tally
                .entry(self.train_labels[index].as_str())
                .or_insert((0, rank));
            entry.0 += 1;
        }

        tally
            .into_iter()
            .max_by(|(_, (a_votes, a_rank)), (_, (b_votes, b_rank))| {
                a_votes.cmp(b_votes).then_with(|| b_rank.cmp(a_rank))
            })
            .map(|(label, _)| label.to_string())
            .unwrap_or_default()
    }
}

impl Default for NearestNeighborClassifier {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Estimator for NearestNeighborClassifier {
    fn name(&self) -> &str {
        "nearest_neighbor"
    }

    fn fit(&mut self, features: &FeatureTable, labels: &[String]) -> Result<()> {
        check_fit_input(features, labels)?;
        if self.n_neighbors == 0 {
            return Err(Error::InvalidInput("n_neighbors must be at least 1".to_string()));
        }

        self.train_rows = features.rows().to_vec();
        self.train_labels = labels.to_vec();
        Ok(())
    }

    fn predict(&self, features: &FeatureTable) -> Result<Vec<String>> {
        if !self.is_fitted() {
            return Err(Error::NotFitted(self.name().to_string()));
        }

        let width = self.train_rows[0].len();
        if features.n_features() != width {
            return Err(Error::InvalidInput(format!(
                "Fitted on {width} features, got {}",
                features.n_features()
            )));
        }

        let k = self.n_neighbors.min(self.train_rows.len());
        let mut predictions = Vec::with_capacity(features.n_rows());

        for row in features.rows() {
            let query = Vector::from_slice(row.as_slice());

            let mut distances = Vec::with_capacity(self.train_rows.len());
            for (index, train) in self.train_rows.iter().enumerate() {
                distances.push((squared_distance(&query, train)?, index));
            }

            distances.sort_by(|a, b| {
                a.0.partial_cmp(&b.0)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.1.cmp(&b.1))
            });
            predictions.push(self.vote(&distances[..k]));
        }

        Ok(predictions)
    }

    fn fresh(&self) -> Box<dyn Estimator> {
        Box::new(Self::new(self.n_neighbors))
    }

    fn to_bytes(&self) -> Result<Option<Vec<u8>>> {
        Ok(Some(serde_json::to_vec(self)?))
    }
}

fn squared_distance(query: &Vector<f32>, train: &[f32]) -> Result<f32> {
    query
        .sub(&Vector::from_slice(train))
        .and_then(|diff| diff.sum_of_squares())
        .map_err(simd_error)
}

fn simd_error(e: impl std::fmt::Display) -> Error {
    Error::Other(format!("SIMD dot product failed: {e}"))
}
