// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The run driver: read, dispatch, checkpoint, merge.
//!
//! A single driver thread owns the feature stream and handles one chunk at
//! a time. Only one chunk's records and rows are alive at any moment; after
//! its checkpoint is written just a `ChunkSummary` remains.

use crate::chunk::ChunkReader;
use crate::config::{AnalysisConfig, PipelineConfig};
use crate::dispatch::WorkerPool;
use crate::error::{Error, Result};
use crate::logging::RunLog;
use crate::merge::{merge_checkpoints, MergeReport};
use crate::record::{BuildingOutcome, Row};
use crate::source::{resolve_layer, FeatureSource};
use crate::summary::ChunkSummary;
use crate::table::{checkpoint_path, remove_checkpoints, write_checkpoint};
use crate::worker::process_building;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Timestamp format of output file names
const STEM_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Common path stem of every output file
    pub stem: PathBuf,
    pub layer: String,
    pub chunks: Vec<ChunkSummary>,
    /// `None` when the source had no buildings
    pub merge: Option<MergeReport>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn buildings(&self) -> usize {
        self.chunks.iter().map(|c| c.total).sum()
    }
}

pub struct ChunkPipeline<'a> {
    config: PipelineConfig,
    analysis: AnalysisConfig,
    log: &'a dyn RunLog,
}

impl<'a> ChunkPipeline<'a> {
    pub fn new(config: PipelineConfig, analysis: AnalysisConfig, log: &'a dyn RunLog) -> Self {
        Self {
            config,
            analysis,
            log,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run over `source`, naming outputs after the current local time
    pub fn run<S>(&self, source: &S) -> Result<RunReport>
    where
        S: FeatureSource + ?Sized,
    {
        let timestamp = chrono::Local::now().format(STEM_TIME_FORMAT).to_string();
        self.run_with_stem(source, self.config.output_stem(&timestamp))
    }

    /// Run over `source` writing every output next to `stem`
    pub fn run_with_stem<S>(&self, source: &S, stem: PathBuf) -> Result<RunReport>
    where
        S: FeatureSource + ?Sized,
    {
        let started = Instant::now();
        let log = self.log;
        fs::create_dir_all(&self.config.output_dir)?;

        let available = source.layers()?;
        log.info(&format!("Available layers: {available:?}"));
        let layer = match resolve_layer(&self.config.layer, &available) {
            Ok(layer) => layer,
            Err(e) => {
                log.error(&e.to_string());
                return Err(e);
            }
        };
        log.info(&format!("Using layer: {layer}"));

        let pool = WorkerPool::new(self.config.workers)?;
        let reader = ChunkReader::new(
            source.features(&layer)?,
            self.config.chunk_size,
            self.config.limit,
            log,
        );

        let mut chunks = Vec::new();
        for chunk in reader {
            let chunk = chunk?;
            let number = chunk.number;
            log.info(&format!("=== Processing chunk {number} ==="));
            log.info(&format!(
                "Processing chunk {number} with {} buildings using {} workers",
                chunk.len(),
                pool.workers()
            ));

            let rows: Vec<Row> = pool
                .process_chunk(
                    chunk,
                    |record| process_building(record, &self.analysis, log),
                    log,
                )
                .into_iter()
                .map(BuildingOutcome::into_row)
                .collect();

            let path = checkpoint_path(&stem, number);
            write_checkpoint(&path, &rows).map_err(|source| Error::Checkpoint {
                chunk: number,
                source,
            })?;
            let summary = ChunkSummary::from_rows(number, &rows, path);
            log.info(&format!(
                "Saved chunk {number} with {} records to {}",
                summary.total,
                summary.checkpoint.display()
            ));
            log.info(&format!(
                "Chunk {number} summary: {}/{} succeeded, {} volumes computed",
                summary.succeeded, summary.total, summary.volumes_computed
            ));
            drop(rows);
            log.info(&format!("Chunk {number} complete. Memory released."));
            chunks.push(summary);
        }

        let merge = if chunks.is_empty() {
            log.warn("No buildings were read; nothing to merge");
            None
        } else {
            let report = merge_checkpoints(&chunks, &stem, log)?;
            if self.config.keep_chunks {
                log.info("Keeping individual chunk files as requested");
            } else {
                remove_checkpoints(&chunks, log);
            }
            Some(report)
        };

        let elapsed = started.elapsed();
        log.info(&format!(
            "Processing completed in {:.1} seconds ({:.1} minutes)",
            elapsed.as_secs_f64(),
            elapsed.as_secs_f64() / 60.0
        ));

        Ok(RunReport {
            stem,
            layer,
            chunks,
            merge,
            elapsed,
        })
    }
}
