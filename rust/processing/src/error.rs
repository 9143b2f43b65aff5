// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run-level errors.
//!
//! Anything here aborts the run. Problems with a single building never
//! become an `Error`; they are recorded in that building's output row.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Layer '{requested}' not found. Available: {available:?}")]
    LayerNotFound {
        requested: String,
        available: Vec<String>,
    },

    #[error("Error reading {path}: {message}")]
    SourceRead { path: PathBuf, message: String },

    #[error("Malformed feature {index} in layer '{layer}': {message}")]
    MalformedFeature {
        layer: String,
        index: usize,
        message: String,
    },

    #[error("Failed to write checkpoint for chunk {chunk}: {source}")]
    Checkpoint {
        chunk: usize,
        #[source]
        source: TableError,
    },

    #[error("Failed to read checkpoint {path}: {source}")]
    MergeRead {
        path: PathBuf,
        #[source]
        source: TableError,
    },

    #[error("Failed to export {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: TableError,
    },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors while moving rows in and out of tabular files.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Column '{column}' has unsupported type {data_type}")]
    UnsupportedColumn { column: String, data_type: String },
    #[error("{0} columns exceed the worksheet limit")]
    TooManyColumns(usize),
}
