// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building Metrics - volume and surface analysis of 3D building solids.
//!
//! Reads building features from GeoJSON (a newline-delimited sequence, a
//! FeatureCollection, or a directory holding one layer per file), repairs
//! each solid toward a watertight mesh, measures volume and surface areas,
//! and writes `building_analysis_<timestamp>.xlsx` / `.csv` into the output
//! directory.
//!
//! # Environment
//!
//! - `RUST_LOG` - log filter, default `info`
//! - `BM_WORKERS` - worker threads when `--workers` is not given
//! - `BM_*` tolerances, see `AnalysisConfig::from_env`

use anyhow::{Context, Result};
use building_metrics_processing::{
    default_worker_count, open_source, AnalysisConfig, ChunkPipeline, PipelineConfig,
    RunReport, TracingLog, DEFAULT_CHUNK_SIZE, DEFAULT_LAYER,
};
use clap::Parser;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE: &str = "processing.log";

#[derive(Parser, Debug)]
#[command(name = "building-metrics", version, about = "Process 3D building solids into volume and surface metrics")]
struct Args {
    /// GeoJSON file or directory of layers; `.gdb`/`.gpkg` with the `gdal` feature
    input: PathBuf,

    /// Directory for chunk checkpoints, final outputs and the log file
    output_dir: PathBuf,

    /// Layer to process (exact name, else first partial match)
    #[arg(long, default_value = DEFAULT_LAYER)]
    layer: String,

    /// Process at most this many buildings
    #[arg(long)]
    limit: Option<usize>,

    /// Parallel workers [default: CPUs - 1, at most 8]
    #[arg(long, env = "BM_WORKERS")]
    workers: Option<usize>,

    /// Buildings per chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Keep the per-chunk checkpoint files after merging
    #[arg(long)]
    keep_chunks: bool,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(&self.output_dir);
        config.layer = self.layer.clone();
        config.chunk_size = self.chunk_size;
        config.limit = self.limit;
        config.workers = self.workers.unwrap_or_else(default_worker_count);
        config.keep_chunks = self.keep_chunks;
        config
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.output_dir) {
        eprintln!("Failed to set up logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Processing failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Log to stdout and append to `<output_dir>/processing.log`
fn init_logging(output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;
    let log_path = output_dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("opening {}", log_path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("installing log subscriber")?;
    Ok(())
}

fn run(args: &Args) -> Result<RunReport> {
    let config = args.pipeline_config();
    let analysis = AnalysisConfig::from_env();

    tracing::info!("Starting building processing");
    tracing::info!("Input: {}", args.input.display());
    tracing::info!("Output: {}", args.output_dir.display());
    tracing::info!(
        layer = %config.layer,
        chunk_size = config.chunk_size,
        workers = config.workers,
        limit = ?config.limit,
        keep_chunks = config.keep_chunks,
        "Run configuration"
    );
    if analysis != AnalysisConfig::default() {
        tracing::info!(?analysis, "Tolerances overridden from environment");
    }

    let source = open_source(&args.input)
        .with_context(|| format!("opening input {}", args.input.display()))?;

    let log = TracingLog;
    let report = ChunkPipeline::new(config, analysis, &log)
        .run(source.as_ref())
        .context("pipeline run failed")?;

    if let Some(merge) = &report.merge {
        tracing::info!(
            buildings = merge.statistics.total,
            xlsx = %merge.xlsx_path.display(),
            csv = %merge.csv_path.display(),
            "Outputs written"
        );
    }
    Ok(report)
}
