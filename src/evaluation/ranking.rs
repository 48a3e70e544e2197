//! Ranking with averaged ties
//!
//! Rank 1 is the best value. Tied values share the mean of the positions they
//! occupy (1, 2.5, 2.5, 4). NaN values always rank last.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Which direction is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Smallest value gets rank 1 (losses, errors)
    Ascending,
    /// Largest value gets rank 1 (scores, accuracy)
    Descending,
}

impl SortOrder {
    /// Order matching a metric's direction.
    #[must_use]
    pub const fn for_metric(greater_is_better: bool) -> Self {
        if greater_is_better {
            Self::Descending
        } else {
            Self::Ascending
        }
    }

    fn compare(self, a: f64, b: f64) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match self {
                Self::Ascending => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                Self::Descending => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
            },
        }
    }
}

/// Rank `values` (1 = best) with ties sharing their average position.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average_ranks(values: &[f64], order: SortOrder) -> Vec<f64> {
    let mut positions: Vec<usize> = (0..values.len()).collect();
    positions.sort_by(|&a, &b| order.compare(values[a], values[b]).then(a.cmp(&b)));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < positions.len() {
        let mut end = start + 1;
        while end < positions.len()
            && order.compare(values[positions[start]], values[positions[end]]) == Ordering::Equal
        {
            end += 1;
        }
        // positions start..end are tied at 1-based ranks start+1..=end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &position in &positions[start..end] {
            ranks[position] = rank;
        }
        start = end;
    }
    ranks
}

/// Sizes of the tie groups in `values` (groups of one included).
pub(crate) fn tie_group_sizes(values: &[f64]) -> Vec<usize> {
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| SortOrder::Ascending.compare(*a, *b));

    let mut sizes = Vec::new();
    let mut start = 0;
    while start < sorted.len() {
        let mut end = start + 1;
        while end < sorted.len()
            && SortOrder::Ascending.compare(sorted[start], sorted[end]) == Ordering::Equal
        {
            end += 1;
        }
        sizes.push(end - start);
        start = end;
    }
    sizes
}
