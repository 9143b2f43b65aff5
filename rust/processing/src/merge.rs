// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Merging chunk checkpoints into the final outputs.

use crate::config::with_suffix;
use crate::error::{Error, Result};
use crate::export::{write_csv, write_xlsx};
use crate::logging::RunLog;
use crate::summary::{ChunkSummary, RunStatistics};
use crate::table::{collect_columns, display_name, merge_read_error, read_checkpoint};
use std::path::{Path, PathBuf};

/// Where the merged outputs went and what they contain
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub xlsx_path: PathBuf,
    pub csv_path: PathBuf,
    pub sheets: usize,
    pub columns: usize,
    pub statistics: RunStatistics,
}

/// Read every checkpoint in chunk order and write `<stem>.csv`, then
/// `<stem>.xlsx`.
///
/// All checkpoints are read before anything is written, so a missing or
/// corrupt checkpoint leaves no partial output behind. Checkpoints are not
/// deleted here.
pub fn merge_checkpoints(
    summaries: &[ChunkSummary],
    stem: &Path,
    log: &dyn RunLog,
) -> Result<MergeReport> {
    log.info("Merging all chunks into final Excel file...");

    let mut ordered: Vec<&ChunkSummary> = summaries.iter().collect();
    ordered.sort_by_key(|summary| summary.chunk_number);

    let mut rows = Vec::with_capacity(ordered.iter().map(|s| s.total).sum());
    for summary in ordered {
        let chunk_rows =
            read_checkpoint(&summary.checkpoint).map_err(merge_read_error(&summary.checkpoint))?;
        log.info(&format!(
            "Loaded {} records from {}",
            chunk_rows.len(),
            display_name(&summary.checkpoint)
        ));
        rows.extend(chunk_rows);
    }

    let columns = collect_columns(&rows);

    let csv_path = with_suffix(stem, ".csv");
    write_csv(&csv_path, &columns, &rows).map_err(|source| Error::Export {
        path: csv_path.clone(),
        source,
    })?;
    log.info(&format!("Saved complete CSV to {}", csv_path.display()));

    let xlsx_path = with_suffix(stem, ".xlsx");
    let sheets = write_xlsx(&xlsx_path, &columns, &rows, log).map_err(|source| Error::Export {
        path: xlsx_path.clone(),
        source,
    })?;
    log.info(&format!(
        "Saved final Excel with {} records to {}",
        rows.len(),
        xlsx_path.display()
    ));
    if sheets > 1 {
        log.info(&format!("Rows split across {sheets} worksheets"));
    }

    let statistics = RunStatistics::from_rows(&rows);
    statistics.log(log);

    Ok(MergeReport {
        xlsx_path,
        csv_path,
        sheets,
        columns: columns.len(),
        statistics,
    })
}
