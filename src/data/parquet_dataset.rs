//! Parquet-backed datasets in the UEA/UCR directory convention
//!
//! ```text
//! {root}/{name}/{name}_TRAIN.parquet
//! {root}/{name}/{name}_TEST.parquet   (optional)
//! ```

use super::{Dataset, DatasetRegistry, DatasetSplits};
use crate::storage::StorageEngine;
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Dataset stored as Parquet train/test files under a root directory.
#[derive(Debug, Clone)]
pub struct ParquetDataset {
    name: String,
    directory: PathBuf,
}

impl ParquetDataset {
    /// Resolve `name` under `root`. No IO happens until [`Dataset::load`].
    #[must_use]
    pub fn new(root: impl AsRef<Path>, name: impl Into<String>) -> Self {
        let name = name.into();
        let directory = root.as_ref().join(&name);
        Self { name, directory }
    }

    /// Path of the training file.
    #[must_use]
    pub fn train_path(&self) -> PathBuf {
        self.directory.join(format!("{}_TRAIN.parquet", self.name))
    }

    /// Path of the (optional) test file.
    #[must_use]
    pub fn test_path(&self) -> PathBuf {
        self.directory.join(format!("{}_TEST.parquet", self.name))
    }
}

impl Dataset for ParquetDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.directory)
    }

    fn load(&self) -> Result<DatasetSplits> {
        let train_path = self.train_path();
        if !train_path.is_file() {
            return Err(Error::DatasetNotFound {
                name: self.name.clone(),
                location: train_path.display().to_string(),
            });
        }

        let train = StorageEngine::load_parquet(&train_path)?.into_single_batch()?;

        let test_path = self.test_path();
        let test = if test_path.is_file() {
            Some(StorageEngine::load_parquet(&test_path)?.into_single_batch()?)
        } else {
            None
        };

        Ok(DatasetSplits { train, test })
    }
}

/// Build a registry of Parquet datasets named `names` under `root`.
///
/// # Errors
///
/// Returns `InvalidInput` on duplicate names.
pub fn make_datasets<S: AsRef<str>>(root: impl AsRef<Path>, names: &[S]) -> Result<DatasetRegistry> {
    let mut registry = DatasetRegistry::new();
    for name in names {
        registry.register(Box::new(ParquetDataset::new(root.as_ref(), name.as_ref())))?;
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::build_labelled_batch;

    fn write_split(root: &Path, name: &str, suffix: &str, n: usize) {
        let rows: Vec<Vec<f32>> = (0..n).map(|i| vec![i as f32, 1.0]).collect();
        let labels: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "even" } else { "odd" }).collect();
        let batch = build_labelled_batch("target", &rows, &labels).unwrap();
        StorageEngine::new(vec![batch])
            .write_parquet(root.join(name).join(format!("{name}_{suffix}.parquet")))
            .unwrap();
    }

    #[test]
    fn test_load_presplit_dataset() {
        let dir = tempfile::tempdir().unwrap();
        write_split(dir.path(), "Coffee", "TRAIN", 6);
        write_split(dir.path(), "Coffee", "TEST", 4);

        let dataset = ParquetDataset::new(dir.path(), "Coffee");
        let splits = dataset.load().unwrap();

        assert_eq!(splits.train.num_rows(), 6);
        assert_eq!(splits.test.map(|t| t.num_rows()), Some(4));
        assert_eq!(dataset.location(), Some(dir.path().join("Coffee").as_path()));
    }

    #[test]
    fn test_load_without_test_file() {
        let dir = tempfile::tempdir().unwrap();
        write_split(dir.path(), "Wine", "TRAIN", 3);

        let splits = ParquetDataset::new(dir.path(), "Wine").load().unwrap();
        assert!(splits.test.is_none());
    }

    #[test]
    fn test_missing_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let result = ParquetDataset::new(dir.path(), "Nope").load();
        assert!(matches!(result, Err(Error::DatasetNotFound { .. })));
    }

    #[test]
    fn test_make_datasets() {
        let registry = make_datasets("/data/ucr", &["ArrowHead", "GunPoint"]).unwrap();
        assert_eq!(registry.names(), vec!["ArrowHead", "GunPoint"]);
        assert!(make_datasets("/data/ucr", &["A", "A"]).is_err());
    }
}
