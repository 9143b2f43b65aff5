// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parquet checkpoints of output rows.
//!
//! Rows are schemaless JSON maps, so each column's Arrow type is inferred
//! from its non-null values: all booleans give `Boolean`, all integers
//! `Int64`, any mix of numbers `Float64`, anything else `Utf8` (non-string
//! values written as their JSON text). Every column is nullable.

use crate::error::{Error, TableError};
use crate::logging::RunLog;
use crate::record::Row;
use crate::summary::ChunkSummary;
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Float64Array, Int64Array, StringArray,
};
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rustc_hash::FxHashSet;
use serde_json::Value;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// `<stem>_chunk_<NNNN>.parquet`
pub fn checkpoint_path(stem: &Path, chunk_number: usize) -> PathBuf {
    crate::config::with_suffix(stem, &format!("_chunk_{chunk_number:04}.parquet"))
}

/// Union of row keys in first-seen order
pub fn collect_columns<'a, I>(rows: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut seen = FxHashSet::default();
    let mut columns = Vec::new();
    for row in rows {
        for key in row.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn infer_type<'a>(values: impl Iterator<Item = &'a Value>) -> DataType {
    let mut inferred: Option<DataType> = None;
    for value in values {
        let this = match value {
            Value::Null => continue,
            Value::Bool(_) => DataType::Boolean,
            Value::Number(n) if n.is_i64() => DataType::Int64,
            Value::Number(_) => DataType::Float64,
            _ => return DataType::Utf8,
        };
        inferred = Some(match (inferred, this) {
            (None, t) => t,
            (Some(a), b) if a == b => a,
            (Some(DataType::Int64 | DataType::Float64), DataType::Int64 | DataType::Float64) => {
                DataType::Float64
            }
            _ => return DataType::Utf8,
        });
    }
    inferred.unwrap_or(DataType::Utf8)
}

fn build_column(rows: &[Row], column: &str, data_type: &DataType) -> ArrayRef {
    let cells = rows.iter().map(|row| row.get(column).filter(|v| !v.is_null()));
    match data_type {
        DataType::Boolean => Arc::new(BooleanArray::from(
            cells.map(|v| v.and_then(Value::as_bool)).collect::<Vec<_>>(),
        )),
        DataType::Int64 => Arc::new(Int64Array::from(
            cells.map(|v| v.and_then(Value::as_i64)).collect::<Vec<_>>(),
        )),
        DataType::Float64 => Arc::new(Float64Array::from(
            cells.map(|v| v.and_then(Value::as_f64)).collect::<Vec<_>>(),
        )),
        _ => Arc::new(StringArray::from(
            cells
                .map(|v| {
                    v.map(|value| match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                })
                .collect::<Vec<_>>(),
        )),
    }
}

/// Build one record batch holding `rows` under `columns`
pub fn rows_to_batch(columns: &[String], rows: &[Row]) -> Result<RecordBatch, TableError> {
    let mut fields = Vec::with_capacity(columns.len());
    let mut arrays = Vec::with_capacity(columns.len());
    for column in columns {
        let data_type = infer_type(rows.iter().filter_map(|row| row.get(column)));
        arrays.push(build_column(rows, column, &data_type));
        fields.push(Field::new(column, data_type, true));
    }
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

/// Write rows to a Zstd-compressed Parquet file
pub fn write_checkpoint(path: &Path, rows: &[Row]) -> Result<(), TableError> {
    let columns = collect_columns(rows);
    let batch = rows_to_batch(&columns, rows)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(Default::default()))
        .set_dictionary_enabled(true)
        .build();

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Read rows back from a checkpoint. Null cells come back as explicit
/// `null` values, so every row carries every column.
pub fn read_checkpoint(path: &Path) -> Result<Vec<Row>, TableError> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?.build()?;
    let mut rows = Vec::new();

    for batch in reader {
        let batch = batch?;
        let schema = batch.schema();
        for field in schema.fields().iter() {
            match field.data_type() {
                DataType::Boolean | DataType::Int64 | DataType::Float64 | DataType::Utf8 => {}
                other => {
                    return Err(TableError::UnsupportedColumn {
                        column: field.name().clone(),
                        data_type: other.to_string(),
                    })
                }
            }
        }

        for i in 0..batch.num_rows() {
            let mut row = Row::new();
            for (field, array) in schema.fields().iter().zip(batch.columns()) {
                row.insert(field.name().clone(), cell(array, i));
            }
            rows.push(row);
        }
    }
    Ok(rows)
}

fn cell(array: &ArrayRef, i: usize) -> Value {
    if array.is_null(i) {
        return Value::Null;
    }
    match array.data_type() {
        DataType::Boolean => Value::Bool(array.as_boolean().value(i)),
        DataType::Int64 => Value::from(array.as_primitive::<Int64Type>().value(i)),
        DataType::Float64 => Value::from(array.as_primitive::<Float64Type>().value(i)),
        _ => Value::String(array.as_string::<i32>().value(i).to_string()),
    }
}

/// Delete checkpoint files, warning about any that cannot be removed
pub fn remove_checkpoints(summaries: &[ChunkSummary], log: &dyn RunLog) {
    log.info("Cleaning up chunk files...");
    for summary in summaries {
        let name = display_name(&summary.checkpoint);
        match fs::remove_file(&summary.checkpoint) {
            Ok(()) => log.debug(&format!("Deleted {name}")),
            Err(e) => log.warn(&format!("Could not delete {name}: {e}")),
        }
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Attach the checkpoint path to a read failure
pub(crate) fn merge_read_error(path: &Path) -> impl FnOnce(TableError) -> Error + '_ {
    move |source| Error::MergeRead {
        path: path.to_path_buf(),
        source,
    }
}
