//! Storage backend (Arrow/Parquet)
//!
//! Datasets and persisted predictions are both plain Parquet files. This module
//! owns the only code that touches the Parquet reader/writer so the rest of the
//! crate deals in `RecordBatch`es.
//!
//! Write pattern: whole files are rewritten (one file per dataset split or per
//! prediction set), never patched row by row.

use crate::{Error, Result};
use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use std::fs::File;
use std::path::Path;

/// Storage engine for Arrow/Parquet data
#[derive(Debug, Clone, Default)]
pub struct StorageEngine {
    batches: Vec<RecordBatch>,
}

impl StorageEngine {
    /// Create a new storage engine from existing batches
    #[must_use]
    pub fn new(batches: Vec<RecordBatch>) -> Self {
        Self { batches }
    }

    /// Load table from Parquet file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            Error::StorageError(format!(
                "Failed to open Parquet file {}: {e}",
                path.as_ref().display()
            ))
        })?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| {
            Error::StorageError(format!("Failed to parse Parquet file: {e}"))
        })?;

        let reader = builder.build().map_err(|e| {
            Error::StorageError(format!("Failed to create Parquet reader: {e}"))
        })?;

        let mut batches = Vec::new();
        for batch in reader {
            let batch = batch.map_err(|e| {
                Error::StorageError(format!("Failed to read record batch: {e}"))
            })?;
            batches.push(batch);
        }

        Ok(Self { batches })
    }

    /// Write all batches to a single Parquet file, replacing any existing file.
    ///
    /// The parent directory is created when missing.
    ///
    /// # Errors
    /// Returns error if the storage is empty or the file cannot be written
    pub fn write_parquet<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let Some(first) = self.batches.first() else {
            return Err(Error::StorageError(
                "Cannot write an empty storage engine (no schema)".to_string(),
            ));
        };

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(path.as_ref())?;
        let mut writer = ArrowWriter::try_new(file, first.schema(), None)?;
        for batch in &self.batches {
            writer.write(batch)?;
        }
        writer.close()?;
        Ok(())
    }

    /// Total number of rows across batches
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Concatenate all batches into one.
    ///
    /// # Errors
    ///
    /// Returns error if the storage is empty
    pub fn into_single_batch(self) -> Result<RecordBatch> {
        let Some(first) = self.batches.first() else {
            return Err(Error::StorageError(
                "No record batches to concatenate".to_string(),
            ));
        };
        if self.batches.len() == 1 {
            return Ok(first.clone());
        }
        Ok(concat_batches(&first.schema(), &self.batches)?)
    }
}
