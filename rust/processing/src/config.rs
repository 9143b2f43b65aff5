// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline and analysis configuration.

use building_metrics_geometry::{RepairParams, SurfaceParams};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Layer read when none is given
pub const DEFAULT_LAYER: &str = "Building_solid";
/// Buildings per chunk when none is given
pub const DEFAULT_CHUNK_SIZE: usize = 5000;
/// Upper bound on the default worker count
pub const MAX_DEFAULT_WORKERS: usize = 8;

/// One less than the number of CPUs, capped at 8, never below 1.
pub fn default_worker_count() -> usize {
    num_cpus::get()
        .saturating_sub(1)
        .clamp(1, MAX_DEFAULT_WORKERS)
}

/// How a run reads, splits and writes.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Requested layer name, resolved against the source's layers.
    pub layer: String,
    /// Buildings per chunk (treated as at least 1).
    pub chunk_size: usize,
    /// Stop after this many buildings.
    pub limit: Option<usize>,
    /// Worker threads per chunk.
    pub workers: usize,
    /// Keep the per-chunk checkpoint files after merging.
    pub keep_chunks: bool,
    /// Directory receiving checkpoints and final outputs.
    pub output_dir: PathBuf,
    /// File name prefix of every output.
    pub output_prefix: String,
}

impl PipelineConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            layer: DEFAULT_LAYER.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            limit: None,
            workers: default_worker_count(),
            keep_chunks: false,
            output_dir: output_dir.into(),
            output_prefix: "building_analysis".to_string(),
        }
    }

    /// `<output_dir>/<prefix>_<timestamp>`, the common stem of all outputs
    pub fn output_stem(&self, timestamp: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}", self.output_prefix, timestamp))
    }
}

/// Append `suffix` to a path stem without touching any dots in it
pub fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut path = stem.as_os_str().to_owned();
    path.push(suffix);
    PathBuf::from(path)
}

/// Geometry tolerances applied to every building.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalysisConfig {
    pub repair: RepairParams,
    pub surface: SurfaceParams,
}

impl AnalysisConfig {
    /// Defaults overridden by `BM_*` environment variables. Unset or
    /// unparsable values keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let repair = RepairParams::default();
        let surface = SurfaceParams::default();
        let var = |key: &str, default: f64| parse_or(&lookup, key, default);

        Self {
            repair: RepairParams {
                merge_digits: parse_or(&lookup, "BM_MERGE_DIGITS", repair.merge_digits),
                degenerate_height: var("BM_DEGENERATE_HEIGHT", repair.degenerate_height),
            },
            surface: SurfaceParams {
                horizontal_tolerance_deg: var(
                    "BM_HORIZONTAL_TOLERANCE_DEG",
                    surface.horizontal_tolerance_deg,
                ),
                vertical_tolerance_deg: var(
                    "BM_VERTICAL_TOLERANCE_DEG",
                    surface.vertical_tolerance_deg,
                ),
                footprint_fraction: var("BM_FOOTPRINT_FRACTION", surface.footprint_fraction),
                min_elevation_range: var("BM_FOOTPRINT_MIN_RANGE", surface.min_elevation_range),
                flat_footprint_offset: var(
                    "BM_FOOTPRINT_FLAT_OFFSET",
                    surface.flat_footprint_offset,
                ),
            },
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
