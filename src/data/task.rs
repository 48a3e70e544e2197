//! Task: binds a dataset to its prediction target column

use super::FeatureTable;
use crate::{Error, Result};
use arrow::array::{Array, Float32Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

/// Classification task over a table: which column holds the labels.
///
/// Every other column is a feature and must be numeric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    target: String,
}

impl Task {
    /// Create a task predicting `target`.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// Name of the target column.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Split a table into a feature table and string labels.
    ///
    /// Numeric feature columns are cast to `f32`; the target column may be any
    /// type castable to `Utf8`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the target column is missing, a feature column
    /// is not numeric, or any value is null.
    pub fn features_and_labels(&self, batch: &RecordBatch) -> Result<(FeatureTable, Vec<String>)> {
        let schema = batch.schema();
        let target_index = schema.index_of(&self.target).map_err(|_| {
            Error::InvalidInput(format!("Target column '{}' not found", self.target))
        })?;

        let labels = self.labels(batch.column(target_index).as_ref())?;

        let n_rows = batch.num_rows();
        let mut feature_names = Vec::with_capacity(batch.num_columns().saturating_sub(1));
        let mut rows: Vec<Vec<f32>> = vec![Vec::with_capacity(batch.num_columns()); n_rows];

        for (index, field) in schema.fields().iter().enumerate() {
            if index == target_index {
                continue;
            }
            if !field.data_type().is_numeric() {
                return Err(Error::InvalidInput(format!(
                    "Feature column '{}' has non-numeric type {:?}",
                    field.name(),
                    field.data_type()
                )));
            }

            let column = batch.column(index);
            if column.null_count() > 0 {
                return Err(Error::InvalidInput(format!(
                    "Feature column '{}' contains nulls",
                    field.name()
                )));
            }

            let values = cast(column, &DataType::Float32)?;
            let values = values
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| {
                    Error::Other("Failed to downcast Float32 column to Float32Array".to_string())
                })?;

            for (row, value) in rows.iter_mut().zip(values.values().iter()) {
                row.push(*value);
            }
            feature_names.push(field.name().clone());
        }

        Ok((FeatureTable::new(feature_names, rows)?, labels))
    }

    fn labels(&self, column: &dyn Array) -> Result<Vec<String>> {
        if column.null_count() > 0 {
            return Err(Error::InvalidInput(format!(
                "Target column '{}' contains nulls",
                self.target
            )));
        }

        let strings = cast(column, &DataType::Utf8)?;
        let strings = strings
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| {
                Error::Other("Failed to downcast Utf8 column to StringArray".to_string())
            })?;

        Ok(strings.iter().flatten().map(str::to_string).collect())
    }
}

impl Default for Task {
    fn default() -> Self {
        Self::new("target")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    fn mixed_batch() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("a", DataType::Float64, false),
            Field::new("label", DataType::Int64, false),
            Field::new("b", DataType::Int32, false),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(arrow::array::Float64Array::from(vec![0.5, 1.5])),
                Arc::new(Int64Array::from(vec![1, 2])),
                Arc::new(arrow::array::Int32Array::from(vec![7, 8])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_split_casts_features_and_labels() {
        let (features, labels) = Task::new("label").features_and_labels(&mixed_batch()).unwrap();

        assert_eq!(features.feature_names(), &["a".to_string(), "b".to_string()]);
        assert_eq!(features.rows(), &[vec![0.5_f32, 7.0], vec![1.5_f32, 8.0]]);
        assert_eq!(labels, vec!["1", "2"]);
    }

    #[test]
    fn test_missing_target_column() {
        let result = Task::new("class").features_and_labels(&mixed_batch());
        assert!(matches!(result, Err(Error::InvalidInput(msg)) if msg.contains("class")));
    }

    #[test]
    fn test_non_numeric_feature_rejected() {
        let schema = Schema::new(vec![
            Field::new("text", DataType::Utf8, false),
            Field::new("target", DataType::Utf8, false),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec!["x"])),
                Arc::new(StringArray::from(vec!["y"])),
            ],
        )
        .unwrap();

        assert!(Task::default().features_and_labels(&batch).is_err());
    }

    #[test]
    fn test_nullable_target_with_nulls_rejected() {
        let schema = Schema::new(vec![
            Field::new("x", DataType::Float32, false),
            Field::new("target", DataType::Utf8, true),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Float32Array::from(vec![1.0, 2.0])),
                Arc::new(StringArray::from(vec![Some("a"), None])),
            ],
        )
        .unwrap();

        assert!(Task::default().features_and_labels(&batch).is_err());
    }
}
