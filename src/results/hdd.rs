//! On-disk results store
//!
//! ```text
//! {root}/manifest.json
//! {root}/{strategy}/{dataset}/{partition}_fold{n}.parquet   index, y_true, y_pred
//! {root}/{strategy}/{dataset}/fitted_fold{n}.bin
//! ```
//!
//! The manifest is the source of truth for which keys exist; it is rewritten
//! (via a temporary file and rename) after every write. Re-opening a root
//! reads the manifest back without touching the prediction files.

use super::{ResultKey, ResultRecord, ResultsStore};
use crate::storage::StorageEngine;
use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MANIFEST_FILE: &str = "manifest.json";
const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordEntry {
    key: ResultKey,
    n_predictions: usize,
    fit_seconds: f64,
    predict_seconds: f64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedEntry {
    strategy: String,
    dataset: String,
    cv_fold: usize,
    size_bytes: u64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    records: Vec<RecordEntry>,
    fitted: Vec<FittedEntry>,
}

/// Results store persisted under a root directory.
#[derive(Debug)]
pub struct HddResults {
    root: PathBuf,
    records: DashMap<ResultKey, RecordEntry>,
    fitted: DashMap<(String, String, usize), FittedEntry>,
}

impl HddResults {
    /// Open (or initialise) a store at `root`, updating existing results in
    /// place.
    ///
    /// Existing results are not an error: a warning is logged and the prior
    /// manifest is loaded so already-computed pairs can be skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the manifest is
    /// unreadable.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;

        let store = Self {
            root,
            records: DashMap::new(),
            fitted: DashMap::new(),
        };

        let manifest_path = store.manifest_path();
        if manifest_path.is_file() {
            let manifest: Manifest = serde_json::from_slice(&std::fs::read(&manifest_path)?)?;
            if manifest.version != MANIFEST_VERSION {
                return Err(Error::StorageError(format!(
                    "Unsupported manifest version {} at {}",
                    manifest.version,
                    manifest_path.display()
                )));
            }
            if !manifest.records.is_empty() || !manifest.fitted.is_empty() {
                tracing::warn!(
                    path = %store.root.display(),
                    records = manifest.records.len(),
                    fitted = manifest.fitted.len(),
                    "results already exist at this location; they will be updated in place"
                );
            }
            for entry in manifest.records {
                store.records.insert(entry.key.clone(), entry);
            }
            for entry in manifest.fitted {
                store.fitted.insert(
                    (entry.strategy.clone(), entry.dataset.clone(), entry.cv_fold),
                    entry,
                );
            }
        }

        Ok(store)
    }

    /// Create a store at `root`, refusing to touch existing results.
    ///
    /// # Errors
    ///
    /// Returns `ResultsPathConflict` if `root` already holds results.
    pub fn create(root: impl AsRef<Path>) -> Result<Self> {
        let store = Self::open(root)?;
        if !store.records.is_empty() || !store.fitted.is_empty() {
            return Err(Error::ResultsPathConflict(store.root.display().to_string()));
        }
        Ok(store)
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    fn pair_dir(&self, strategy: &str, dataset: &str) -> Result<PathBuf> {
        validate_component("strategy", strategy)?;
        validate_component("dataset", dataset)?;
        Ok(self.root.join(strategy).join(dataset))
    }

    fn predictions_path(&self, key: &ResultKey) -> Result<PathBuf> {
        Ok(self
            .pair_dir(key.strategy(), key.dataset())?
            .join(format!("{}_fold{}.parquet", key.partition(), key.cv_fold())))
    }

    fn fitted_path(&self, strategy: &str, dataset: &str, cv_fold: usize) -> Result<PathBuf> {
        Ok(self
            .pair_dir(strategy, dataset)?
            .join(format!("fitted_fold{cv_fold}.bin")))
    }

    fn write_manifest(&self) -> Result<()> {
        let mut records: Vec<RecordEntry> =
            self.records.iter().map(|e| e.value().clone()).collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));

        let mut fitted: Vec<FittedEntry> = self.fitted.iter().map(|e| e.value().clone()).collect();
        fitted.sort_by(|a, b| {
            (&a.strategy, &a.dataset, a.cv_fold).cmp(&(&b.strategy, &b.dataset, b.cv_fold))
        });

        let manifest = Manifest {
            version: MANIFEST_VERSION,
            records,
            fitted,
        };

        let path = self.manifest_path();
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&manifest)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl ResultsStore for HddResults {
    fn save_predictions(&self, record: ResultRecord) -> Result<()> {
        let path = self.predictions_path(record.key())?;

        let schema = Arc::new(Schema::new(vec![
            Field::new("index", DataType::UInt64, false),
            Field::new("y_true", DataType::Utf8, false),
            Field::new("y_pred", DataType::Utf8, false),
        ]));
        let columns: Vec<ArrayRef> = vec![
            Arc::new(UInt64Array::from(record.index().to_vec())),
            Arc::new(StringArray::from_iter_values(record.y_true())),
            Arc::new(StringArray::from_iter_values(record.y_pred())),
        ];
        let batch = RecordBatch::try_new(schema, columns)?;
        StorageEngine::new(vec![batch]).write_parquet(&path)?;

        let entry = RecordEntry {
            key: record.key().clone(),
            n_predictions: record.len(),
            fit_seconds: record.fit_seconds(),
            predict_seconds: record.predict_seconds(),
            created_at: record.created_at(),
        };
        if self.records.insert(entry.key.clone(), entry).is_some() {
            tracing::debug!(key = %record.key(), "replaced existing predictions");
        }
        self.write_manifest()
    }

    fn load_predictions(&self, key: &ResultKey) -> Result<Option<ResultRecord>> {
        let Some(entry) = self.records.get(key).map(|e| e.value().clone()) else {
            return Ok(None);
        };

        let path = self.predictions_path(key)?;
        let batch = StorageEngine::load_parquet(&path)?.into_single_batch()?;

        let index = column::<UInt64Array>(&batch, "index")?.values().to_vec();
        let y_true = string_column(&batch, "y_true")?;
        let y_pred = string_column(&batch, "y_pred")?;

        if y_pred.len() != entry.n_predictions {
            return Err(Error::StorageError(format!(
                "{} holds {} predictions, manifest expects {}",
                path.display(),
                y_pred.len(),
                entry.n_predictions
            )));
        }

        ResultRecord::restore(
            entry.key,
            index,
            y_true,
            y_pred,
            entry.fit_seconds,
            entry.predict_seconds,
            entry.created_at,
        )
        .map(Some)
    }

    fn contains(&self, key: &ResultKey) -> Result<bool> {
        Ok(self.records.contains_key(key))
    }

    fn keys(&self) -> Result<Vec<ResultKey>> {
        let mut keys: Vec<ResultKey> = self.records.iter().map(|e| e.key().clone()).collect();
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
        let path = self.fitted_path(strategy, dataset, cv_fold)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;

        self.fitted.insert(
            (strategy.to_string(), dataset.to_string(), cv_fold),
            FittedEntry {
                strategy: strategy.to_string(),
                dataset: dataset.to_string(),
                cv_fold,
                size_bytes: bytes.len() as u64,
                created_at: Utc::now(),
            },
        );
        self.write_manifest()
    }

    fn load_fitted_strategy(
        &self,
        strategy: &str,
        dataset: &str,
        cv_fold: usize,
    ) -> Result<Option<Vec<u8>>> {
        let key = (strategy.to_string(), dataset.to_string(), cv_fold);
        if !self.fitted.contains_key(&key) {
            return Ok(None);
        }
        let path = self.fitted_path(strategy, dataset, cv_fold)?;
        Ok(Some(std::fs::read(path)?))
    }
}

/// Names become directory names, so they must be a single plain component.
fn validate_component(kind: &str, name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if invalid {
        return Err(Error::InvalidInput(format!(
            "{kind} name '{name}' cannot be used as a directory name"
        )));
    }
    Ok(())
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| Error::StorageError(format!("Missing column '{name}'")))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::StorageError(format!("Column '{name}' has unexpected type")))
}

fn string_column(batch: &RecordBatch, name: &str) -> Result<Vec<String>> {
    let array = column::<StringArray>(batch, name)?;
    if array.null_count() > 0 {
        return Err(Error::StorageError(format!("Column '{name}' contains nulls")));
    }
    Ok(array.iter().flatten().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Partition;

    fn record(strategy: &str, dataset: &str, fold: usize, preds: &[&str]) -> ResultRecord {
        let n = preds.len();
        ResultRecord::new(
            ResultKey::test(strategy, dataset, fold),
            (0..n as u64).collect(),
            vec!["a".to_string(); n],
            preds.iter().map(|p| (*p).to_string()).collect(),
        )
        .unwrap()
        .with_timings(0.5, 0.1)
    }

    #[test]
    fn test_roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = HddResults::open(dir.path()).unwrap();
        let original = record("1nn", "GunPoint", 0, &["a", "b", "a"]);
        store.save_predictions(original.clone()).unwrap();

        assert!(dir.path().join("1nn/GunPoint/test_fold0.parquet").is_file());
        assert!(dir.path().join(MANIFEST_FILE).is_file());

        let loaded = store.load_predictions(original.key()).unwrap().unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_reopen_reads_manifest() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = HddResults::open(dir.path()).unwrap();
            store.save_predictions(record("s", "d", 0, &["a"])).unwrap();
            store.save_fitted_strategy("s", "d", 0, b"{}").unwrap();
        }

        let reopened = HddResults::open(dir.path()).unwrap();
        assert_eq!(reopened.keys().unwrap(), vec![ResultKey::test("s", "d", 0)]);
        assert_eq!(
            reopened.load_fitted_strategy("s", "d", 0).unwrap(),
            Some(b"{}".to_vec())
        );
        assert!(reopened
            .load_predictions(&ResultKey::new("s", "d", 0, Partition::Train))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_create_refuses_existing_results() {
        let dir = tempfile::tempdir().unwrap();
        HddResults::create(dir.path())
            .unwrap()
            .save_predictions(record("s", "d", 0, &["a"]))
            .unwrap();

        assert!(matches!(
            HddResults::create(dir.path()),
            Err(Error::ResultsPathConflict(_))
        ));
        assert!(HddResults::open(dir.path()).is_ok());
    }

    #[test]
    fn test_overwrite_keeps_single_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = HddResults::open(dir.path()).unwrap();
        store.save_predictions(record("s", "d", 0, &["a", "a"])).unwrap();
        store.save_predictions(record("s", "d", 0, &["b", "b"])).unwrap();

        assert_eq!(store.len().unwrap(), 1);
        let loaded = store
            .load_predictions(&ResultKey::test("s", "d", 0))
            .unwrap()
            .unwrap();
        assert_eq!(loaded.y_pred(), &["b".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = HddResults::open(dir.path()).unwrap();
        assert!(store.save_predictions(record("../escape", "d", 0, &["a"])).is_err());
        assert!(store.save_predictions(record("s", "a/b", 0, &["a"])).is_err());
        assert!(store.is_empty().unwrap());
    }
}
