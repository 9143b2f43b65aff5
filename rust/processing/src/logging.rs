// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run log handed explicitly to the pipeline and every worker.
//!
//! Library code only ever talks to a `&dyn RunLog`. The binary decides
//! where records end up by installing a `tracing` subscriber and passing
//! `TracingLog`; tests pass `CapturedLog` and inspect what was written.

use std::sync::Mutex;
use tracing::Level;

/// Sink for run progress and diagnostics, shared across worker threads.
pub trait RunLog: Send + Sync {
    fn record(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.record(Level::DEBUG, message);
    }

    fn info(&self, message: &str) {
        self.record(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.record(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.record(Level::ERROR, message);
    }
}

/// Forwards every record to the `tracing` macros.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl RunLog for TracingLog {
    fn record(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!("{message}"),
            Level::WARN => tracing::warn!("{message}"),
            Level::INFO => tracing::info!("{message}"),
            Level::DEBUG => tracing::debug!("{message}"),
            _ => tracing::trace!("{message}"),
        }
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct CapturedLog {
    records: Mutex<Vec<(Level, String)>>,
}

impl CapturedLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn records(&self) -> Vec<(Level, String)> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Messages recorded at `level`
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    /// Whether any message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.records().iter().any(|(_, m)| m.contains(needle))
    }
}

impl RunLog for CapturedLog {
    fn record(&self, level: Level, message: &str) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captured_log_keeps_order_and_levels() {
        let log = CapturedLog::new();
        log.info("Read 100 buildings...");
        log.warn("Could not delete chunk");
        log.record(Level::ERROR, "Processing failed");

        let records = log.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1], (Level::WARN, "Could not delete chunk".to_string()));
        assert_eq!(log.messages(Level::ERROR), vec!["Processing failed"]);
        assert!(log.contains("100 buildings"));
        assert!(!log.contains("merge"));
    }

    #[test]
    fn test_shared_across_threads() {
        let log = CapturedLog::new();
        std::thread::scope(|scope| {
            for i in 0..4 {
                let log = &log;
                scope.spawn(move || log.info(&format!("worker {i}")));
            }
        });
        assert_eq!(log.messages(Level::INFO).len(), 4);
    }
}
