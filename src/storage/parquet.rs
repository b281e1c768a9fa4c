//! Parquet storage for composition exports.
//!
//! Parquet is the preferred export format. Columns are matched by name, and
//! numeric columns of a compatible type (e.g. Int64 run counts) are cast to
//! the expected type on read.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, StringArray, UInt32Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tracing::{debug, info};

use crate::models::CompositionRow;

use super::{ExportFormat, StorageConfig, StorageError};

/// Schema definitions for Parquet tables.
pub mod schemas {
    use arrow::datatypes::{DataType, Field, Schema};

    /// Schema for the composition aggregate.
    pub fn compositions_schema() -> Schema {
        Schema::new(vec![
            Field::new("composition", DataType::Utf8, false),
            Field::new("run_count", DataType::UInt32, false),
            Field::new("level_mean", DataType::Float64, false),
            Field::new("level_std", DataType::Float64, true),
            Field::new("level_max", DataType::UInt32, false),
        ])
    }
}

fn parquet_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::Parquet(e.to_string())
}

/// Parquet file writer.
pub struct ParquetWriter {
    config: StorageConfig,
}

impl ParquetWriter {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Write a season's composition export, replacing any existing file.
    pub fn write_compositions(
        &self,
        season_id: &str,
        rows: &[CompositionRow],
    ) -> Result<PathBuf, StorageError> {
        let path = self.config.export_path(season_id, ExportFormat::Parquet);
        write_compositions(&path, rows)?;
        Ok(path)
    }
}

/// Write composition rows to a Parquet file.
pub fn write_compositions(path: &Path, rows: &[CompositionRow]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let schema = Arc::new(schemas::compositions_schema());

    let compositions: Vec<&str> = rows.iter().map(|r| r.composition.as_str()).collect();
    let run_counts: Vec<u32> = rows.iter().map(|r| r.run_count).collect();
    let level_means: Vec<f64> = rows.iter().map(|r| r.level_mean).collect();
    let level_stds: Vec<f64> = rows.iter().map(|r| r.level_std).collect();
    let level_maxes: Vec<u32> = rows.iter().map(|r| r.level_max).collect();

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(compositions)) as ArrayRef,
            Arc::new(UInt32Array::from(run_counts)) as ArrayRef,
            Arc::new(Float64Array::from(level_means)) as ArrayRef,
            Arc::new(Float64Array::from(level_stds)) as ArrayRef,
            Arc::new(UInt32Array::from(level_maxes)) as ArrayRef,
        ],
    )
    .map_err(parquet_err)?;

    write_batch(path, &schema, &batch)?;

    info!("Wrote {} compositions to {:?}", rows.len(), path);
    Ok(())
}

fn write_batch(path: &Path, schema: &Arc<Schema>, batch: &RecordBatch) -> Result<(), StorageError> {
    let file = File::create(path)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props)).map_err(parquet_err)?;
    writer.write(batch).map_err(parquet_err)?;
    writer.close().map_err(parquet_err)?;

    Ok(())
}

fn read_batches(path: &Path) -> Result<Vec<RecordBatch>, StorageError> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(parquet_err)?
        .build()
        .map_err(parquet_err)?;

    let batches = reader.collect::<Result<Vec<_>, _>>().map_err(parquet_err)?;

    debug!("Read {} batches from {:?}", batches.len(), path);
    Ok(batches)
}

/// Read composition rows from a Parquet file.
pub fn read_compositions(path: &Path) -> Result<Vec<CompositionRow>, StorageError> {
    if !path.exists() {
        return Err(StorageError::PathNotFound(path.to_path_buf()));
    }

    let mut rows = Vec::new();

    for batch in read_batches(path)? {
        let compositions = typed_column(&batch, "composition", &DataType::Utf8, true)?;
        let run_counts = typed_column(&batch, "run_count", &DataType::UInt32, true)?;
        let level_means = typed_column(&batch, "level_mean", &DataType::Float64, true)?;
        let level_stds = typed_column(&batch, "level_std", &DataType::Float64, false)?;
        let level_maxes = typed_column(&batch, "level_max", &DataType::UInt32, true)?;

        let compositions = downcast::<StringArray>(&compositions, "composition")?;
        let run_counts = downcast::<UInt32Array>(&run_counts, "run_count")?;
        let level_means = downcast::<Float64Array>(&level_means, "level_mean")?;
        let level_stds = downcast::<Float64Array>(&level_stds, "level_std")?;
        let level_maxes = downcast::<UInt32Array>(&level_maxes, "level_max")?;

        for i in 0..batch.num_rows() {
            rows.push(CompositionRow {
                composition: compositions.value(i).to_string(),
                run_count: run_counts.value(i),
                level_mean: level_means.value(i),
                level_std: if level_stds.is_null(i) {
                    0.0
                } else {
                    level_stds.value(i)
                },
                level_max: level_maxes.value(i),
            });
        }
    }

    debug!("Decoded {} composition rows from {:?}", rows.len(), path);
    Ok(rows)
}

/// Fetch a column by name, cast to the expected type.
fn typed_column(
    batch: &RecordBatch,
    name: &str,
    expected: &DataType,
    required: bool,
) -> Result<ArrayRef, StorageError> {
    let array = batch
        .column_by_name(name)
        .ok_or_else(|| StorageError::Schema(format!("missing column {}", name)))?;

    let array = if array.data_type() == expected {
        array.clone()
    } else {
        cast(array, expected).map_err(|e| {
            StorageError::Schema(format!(
                "column {} has type {}, expected {}: {}",
                name,
                array.data_type(),
                expected,
                e
            ))
        })?
    };

    // Values that fail a safe cast come back as nulls
    if required && array.null_count() > 0 {
        return Err(StorageError::Schema(format!(
            "column {} has {} null or unconvertible values",
            name,
            array.null_count()
        )));
    }
    Ok(array)
}

fn downcast<'a, A: Array + 'static>(array: &'a ArrayRef, name: &str) -> Result<&'a A, StorageError> {
    array
        .as_any()
        .downcast_ref::<A>()
        .ok_or_else(|| StorageError::Schema(format!("column {} has unexpected layout", name)))
}
