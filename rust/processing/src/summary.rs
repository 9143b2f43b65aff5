// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-chunk and whole-run counters.

use crate::logging::RunLog;
use crate::record::{Row, STATUS_SUCCESS};
use std::path::PathBuf;

/// What survives of a chunk once its rows are checkpointed
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSummary {
    pub chunk_number: usize,
    pub total: usize,
    pub succeeded: usize,
    pub volumes_computed: usize,
    pub checkpoint: PathBuf,
}

impl ChunkSummary {
    pub fn from_rows(chunk_number: usize, rows: &[Row], checkpoint: PathBuf) -> Self {
        Self {
            chunk_number,
            total: rows.len(),
            succeeded: rows.iter().filter(|row| is_success(row)).count(),
            volumes_computed: rows.iter().filter(|row| has_value(row, "mesh_volume")).count(),
            checkpoint,
        }
    }
}

/// Totals over the merged output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatistics {
    pub total: usize,
    pub succeeded: usize,
    pub volumes_computed: usize,
    /// Mean over buildings that have a volume
    pub mean_volume: Option<f64>,
    /// Mean over buildings that have a footprint area
    pub mean_footprint_area: Option<f64>,
}

impl RunStatistics {
    pub fn from_rows(rows: &[Row]) -> Self {
        Self {
            total: rows.len(),
            succeeded: rows.iter().filter(|row| is_success(row)).count(),
            volumes_computed: rows.iter().filter(|row| has_value(row, "mesh_volume")).count(),
            mean_volume: mean(rows, "mesh_volume"),
            mean_footprint_area: mean(rows, "surf_footprint_area"),
        }
    }

    /// Percentage of buildings processed successfully
    pub fn success_rate(&self) -> f64 {
        percent(self.succeeded, self.total)
    }

    /// Percentage of buildings with a volume
    pub fn volume_rate(&self) -> f64 {
        percent(self.volumes_computed, self.total)
    }

    pub fn log(&self, log: &dyn RunLog) {
        log.info("Final Processing Summary:");
        log.info(&format!("Total buildings: {}", self.total));
        log.info(&format!(
            "Successfully processed: {} ({:.1}%)",
            self.succeeded,
            self.success_rate()
        ));
        log.info(&format!(
            "Volumes calculated: {} ({:.1}%)",
            self.volumes_computed,
            self.volume_rate()
        ));
        if let Some(volume) = self.mean_volume {
            log.info(&format!("Average building volume: {volume:.2} m³"));
        }
        if let Some(area) = self.mean_footprint_area {
            log.info(&format!("Average footprint area: {area:.2} m²"));
        }
    }
}

fn is_success(row: &Row) -> bool {
    row.get("processing_status").and_then(|v| v.as_str()) == Some(STATUS_SUCCESS)
}

fn has_value(row: &Row, column: &str) -> bool {
    row.get(column).is_some_and(|v| !v.is_null())
}

fn mean(rows: &[Row], column: &str) -> Option<f64> {
    let (sum, count) = rows
        .iter()
        .filter_map(|row| row.get(column).and_then(|v| v.as_f64()))
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}
