//! Dataset registry
//!
//! Datasets are resolved by name to Arrow tables. A loaded dataset always has a
//! training table and, in the UEA/UCR convention, an optional pre-split test
//! table. Converting a table into features and labels is the job of [`Task`].
//!
//! ```rust
//! use trueno_bench::data::{build_labelled_batch, Dataset, DatasetRegistry, InMemoryDataset};
//!
//! # fn main() -> trueno_bench::Result<()> {
//! let train = build_labelled_batch("target", &[vec![0.0, 1.0], vec![1.0, 0.0]], &["a", "b"])?;
//! let mut registry = DatasetRegistry::new();
//! registry.register(Box::new(InMemoryDataset::new("toy", train, None)))?;
//!
//! let splits = registry.get("toy")?.load()?;
//! assert_eq!(splits.train.num_rows(), 2);
//! assert!(registry.get("missing").is_err());
//! # Ok(())
//! # }
//! ```

mod parquet_dataset;
mod task;

pub use parquet_dataset::{make_datasets, ParquetDataset};
pub use task::Task;

use crate::{Error, Result};
use arrow::array::{ArrayRef, Float32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::path::Path;
use std::sync::Arc;

/// Row-major numeric feature matrix handed to estimators.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    feature_names: Vec<String>,
    rows: Vec<Vec<f32>>,
}

impl FeatureTable {
    /// Create a feature table.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if any row length differs from the number of
    /// feature names.
    pub fn new(feature_names: Vec<String>, rows: Vec<Vec<f32>>) -> Result<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != feature_names.len())
        {
            return Err(Error::InvalidInput(format!(
                "Row {i} has {} values, expected {} features",
                row.len(),
                feature_names.len()
            )));
        }
        Ok(Self {
            feature_names,
            rows,
        })
    }

    /// Create a feature table with generated names `dim_0`, `dim_1`, ...
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for ragged rows.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let width = rows.first().map_or(0, Vec::len);
        Self::new(dimension_names(width), rows)
    }

    /// Feature (column) names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Number of instances.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of features per instance.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f32>] {
        &self.rows
    }

    /// One row, if in bounds.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        self.rows.get(index).map(Vec::as_slice)
    }
}

/// Train table plus optional pre-split test table.
#[derive(Debug, Clone)]
pub struct DatasetSplits {
    /// Training table (features and target column)
    pub train: RecordBatch,
    /// Test table, present when the dataset ships pre-split
    pub test: Option<RecordBatch>,
}

/// A named, loadable dataset.
pub trait Dataset {
    /// Dataset name; used as a results grouping key.
    fn name(&self) -> &str;

    /// Where the dataset lives, if it is backed by files.
    fn location(&self) -> Option<&Path> {
        None
    }

    /// Load the dataset tables.
    ///
    /// # Errors
    ///
    /// Returns `DatasetNotFound` if the backing data is missing, or a storage
    /// error if it cannot be parsed.
    fn load(&self) -> Result<DatasetSplits>;
}

/// Dataset held entirely in memory.
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    name: String,
    splits: DatasetSplits,
}

impl InMemoryDataset {
    /// Create an in-memory dataset.
    #[must_use]
    pub fn new(name: impl Into<String>, train: RecordBatch, test: Option<RecordBatch>) -> Self {
        Self {
            name: name.into(),
            splits: DatasetSplits { train, test },
        }
    }
}

impl Dataset for InMemoryDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<DatasetSplits> {
        Ok(self.splits.clone())
    }
}

/// Ordered collection of datasets with lookup by name.
#[derive(Default)]
pub struct DatasetRegistry {
    datasets: Vec<Box<dyn Dataset>>,
}

impl DatasetRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a dataset with the same name is registered.
    pub fn register(&mut self, dataset: Box<dyn Dataset>) -> Result<()> {
        if self.contains(dataset.name()) {
            return Err(Error::InvalidInput(format!(
                "Dataset '{}' is already registered",
                dataset.name()
            )));
        }
        self.datasets.push(dataset);
        Ok(())
    }

    /// Whether a dataset with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.datasets.iter().any(|d| d.name() == name)
    }

    /// Resolve a dataset by name.
    ///
    /// # Errors
    ///
    /// Returns `DatasetNotFound` for unknown names.
    pub fn get(&self, name: &str) -> Result<&dyn Dataset> {
        self.datasets
            .iter()
            .find(|d| d.name() == name)
            .map(|d| &**d)
            .ok_or_else(|| Error::DatasetNotFound {
                name: name.to_string(),
                location: "dataset registry".to_string(),
            })
    }

    /// Dataset names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.datasets.iter().map(|d| d.name()).collect()
    }

    /// Number of datasets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Hand the datasets over, e.g. to an orchestrator.
    #[must_use]
    pub fn into_datasets(self) -> Vec<Box<dyn Dataset>> {
        self.datasets
    }
}

impl std::fmt::Debug for DatasetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetRegistry")
            .field("datasets", &self.names())
            .finish()
    }
}

/// Build a table of `Float32` feature columns `dim_0..` plus a `Utf8` target
/// column named `target`.
///
/// # Errors
///
/// Returns `InvalidInput` if rows are ragged or the label count differs from
/// the row count.
pub fn build_labelled_batch(target: &str, rows: &[Vec<f32>], labels: &[&str]) -> Result<RecordBatch> {
    if rows.len() != labels.len() {
        return Err(Error::InvalidInput(format!(
            "{} rows but {} labels",
            rows.len(),
            labels.len()
        )));
    }
    let width = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|row| row.len() != width) {
        return Err(Error::InvalidInput("Ragged feature rows".to_string()));
    }

    let names = dimension_names(width);
    if names.iter().any(|name| name == target) {
        return Err(Error::InvalidInput(format!(
            "Target column '{target}' collides with a feature column"
        )));
    }

    let mut fields: Vec<Field> = names
        .iter()
        .map(|name| Field::new(name, DataType::Float32, false))
        .collect();
    fields.push(Field::new(target, DataType::Utf8, false));

    let mut columns: Vec<ArrayRef> = (0..width)
        .map(|j| Arc::new(Float32Array::from_iter_values(rows.iter().map(|row| row[j]))) as ArrayRef)
        .collect();
    columns.push(Arc::new(StringArray::from_iter_values(labels.iter().copied())));

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

fn dimension_names(width: usize) -> Vec<String> {
    (0..width).map(|j| format!("dim_{j}")).collect()
}
