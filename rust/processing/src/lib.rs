// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building Metrics Processing
//!
//! Runs the per-building geometry analysis over sources too large to hold
//! in memory. Features are read lazily into fixed-size chunks, each chunk
//! is processed on a pool of worker threads and checkpointed to Parquet,
//! and all checkpoints are finally merged into XLSX and CSV outputs.
//!
//! ```text
//! FeatureSource -> ChunkReader -> WorkerPool -> checkpoint -> merge
//! ```

pub mod chunk;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod export;
#[cfg(feature = "gdal")]
pub mod gdal_source;
pub mod logging;
pub mod merge;
pub mod pipeline;
pub mod record;
pub mod source;
pub mod summary;
pub mod table;
pub mod worker;

pub use chunk::{Chunk, ChunkReader};
pub use config::{default_worker_count, AnalysisConfig, PipelineConfig, DEFAULT_CHUNK_SIZE, DEFAULT_LAYER};
pub use dispatch::WorkerPool;
pub use error::{Error, Result, TableError};
pub use logging::{CapturedLog, RunLog, TracingLog};
pub use merge::{merge_checkpoints, MergeReport};
pub use pipeline::{ChunkPipeline, RunReport};
pub use record::{BuildingOutcome, BuildingRecord, Properties, Row, SurfaceResult, DERIVED_COLUMNS};
#[cfg(feature = "gdal")]
pub use gdal_source::GdalSource;
pub use source::{
    multipolygon_value, open_source, resolve_layer, FeatureSource, GeoJsonSeqSource,
    PolygonRings, RawFeature,
};
pub use summary::{ChunkSummary, RunStatistics};
pub use worker::process_building;
