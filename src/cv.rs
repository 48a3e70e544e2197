//! Cross-validation splitters
//!
//! A splitter turns loaded [`DatasetSplits`] into one or more train/test
//! [`Fold`]s. Row indices recorded on a fold refer to the table the fold was
//! cut from: the pre-split test file for [`PresplitFilesCv`], or the pooled
//! train+test table for the random splitters.

use crate::data::DatasetSplits;
use crate::{Error, Result};
use arrow::array::UInt64Array;
use arrow::compute::{concat_batches, take_record_batch};
use arrow::record_batch::RecordBatch;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// One train/test partition of a dataset.
#[derive(Debug, Clone)]
pub struct Fold {
    /// Zero-based fold number
    pub index: usize,
    /// Training rows
    pub train: RecordBatch,
    /// Test rows
    pub test: RecordBatch,
    /// Row positions of the training rows in the source table
    pub train_indices: Vec<u64>,
    /// Row positions of the test rows in the source table
    pub test_indices: Vec<u64>,
}

/// Produces folds from a loaded dataset.
pub trait Splitter {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Split the dataset into folds.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the dataset cannot be split with this
    /// splitter's parameters.
    fn split(&self, data: &DatasetSplits) -> Result<Vec<Fold>>;
}

/// Uses the dataset's own train/test files as a single fold.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresplitFilesCv;

impl Splitter for PresplitFilesCv {
    fn name(&self) -> &str {
        "presplit"
    }

    fn split(&self, data: &DatasetSplits) -> Result<Vec<Fold>> {
        let test = data.test.clone().ok_or_else(|| {
            Error::InvalidInput(
                "Dataset has no pre-split test table; use a random splitter".to_string(),
            )
        })?;
        Ok(vec![Fold {
            index: 0,
            train_indices: (0..data.train.num_rows() as u64).collect(),
            test_indices: (0..test.num_rows() as u64).collect(),
            train: data.train.clone(),
            test,
        }])
    }
}

/// One seeded random train/test split of the pooled data.
#[derive(Debug, Clone, Copy)]
pub struct SingleSplit {
    test_fraction: f64,
    seed: u64,
}

impl SingleSplit {
    /// Create a single split holding out `test_fraction` of the rows.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` unless `0 < test_fraction < 1`.
    pub fn new(test_fraction: f64, seed: u64) -> Result<Self> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(Error::InvalidInput(format!(
                "test_fraction must be in (0, 1), got {test_fraction}"
            )));
        }
        Ok(Self {
            test_fraction,
            seed,
        })
    }
}

impl Splitter for SingleSplit {
    fn name(&self) -> &str {
        "single_split"
    }

    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::cast_sign_loss)]
    fn split(&self, data: &DatasetSplits) -> Result<Vec<Fold>> {
        let pooled = pool(data)?;
        let n = pooled.num_rows();
        if n < 2 {
            return Err(Error::InvalidInput(format!(
                "Need at least 2 rows to split, got {n}"
            )));
        }

        let n_test = ((n as f64 * self.test_fraction).round() as usize).clamp(1, n - 1);
        let order = shuffled_indices(n, Some(self.seed));
        let (test, train) = order.split_at(n_test);

        Ok(vec![make_fold(&pooled, 0, train.to_vec(), test.to_vec())?])
    }
}

/// K-fold cross-validation over the pooled data.
#[derive(Debug, Clone, Copy)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    seed: u64,
}

impl KFold {
    /// Create a k-fold splitter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `n_splits < 2`.
    pub fn new(n_splits: usize, shuffle: bool, seed: u64) -> Result<Self> {
        if n_splits < 2 {
            return Err(Error::InvalidInput(format!(
                "n_splits must be at least 2, got {n_splits}"
            )));
        }
        Ok(Self {
            n_splits,
            shuffle,
            seed,
        })
    }
}

impl Splitter for KFold {
    fn name(&self) -> &str {
        "k_fold"
    }

    fn split(&self, data: &DatasetSplits) -> Result<Vec<Fold>> {
        let pooled = pool(data)?;
        let n = pooled.num_rows();
        if n < self.n_splits {
            return Err(Error::InvalidInput(format!(
                "Cannot make {} folds from {n} rows",
                self.n_splits
            )));
        }

        let order = shuffled_indices(n, self.shuffle.then_some(self.seed));

        // The first n % k folds take one extra row.
        let base = n / self.n_splits;
        let extra = n % self.n_splits;
        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for index in 0..self.n_splits {
            let size = base + usize::from(index < extra);
            let test = order[start..start + size].to_vec();
            let train = order[..start]
                .iter()
                .chain(&order[start + size..])
                .copied()
                .collect();
            folds.push(make_fold(&pooled, index, train, test)?);
            start += size;
        }
        Ok(folds)
    }
}

fn pool(data: &DatasetSplits) -> Result<RecordBatch> {
    match &data.test {
        None => Ok(data.train.clone()),
        Some(test) => {
            if test.schema() != data.train.schema() {
                return Err(Error::InvalidInput(
                    "Train and test tables have different schemas".to_string(),
                ));
            }
            Ok(concat_batches(&data.train.schema(), [&data.train, test])?)
        }
    }
}

fn shuffled_indices(n: usize, seed: Option<u64>) -> Vec<u64> {
    let mut order: Vec<u64> = (0..n as u64).collect();
    if let Some(seed) = seed {
        let mut rng = StdRng::seed_from_u64(seed);
        order.shuffle(&mut rng);
    }
    order
}

fn make_fold(
    pooled: &RecordBatch,
    index: usize,
    mut train_indices: Vec<u64>,
    mut test_indices: Vec<u64>,
) -> Result<Fold> {
    train_indices.sort_unstable();
    test_indices.sort_unstable();
    let train = take_record_batch(pooled, &UInt64Array::from(train_indices.clone()))?;
    let test = take_record_batch(pooled, &UInt64Array::from(test_indices.clone()))?;
    Ok(Fold {
        index,
        train,
        test,
        train_indices,
        test_indices,
    })
}
