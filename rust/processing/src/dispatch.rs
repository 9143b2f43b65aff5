// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixed-size worker pool running one chunk at a time.
//!
//! Each building is a task tagged with its position in the chunk. Workers
//! send `(position, outcome)` back over a channel and the driver slots the
//! outcomes into a position-indexed array, so output order matches input
//! order regardless of completion order.

use crate::chunk::Chunk;
use crate::error::{Error, Result};
use crate::logging::RunLog;
use crate::record::{BuildingOutcome, BuildingRecord, Properties};
use crate::worker::panic_message;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;

/// Progress is logged after every this many buildings processed
const PROCESS_PROGRESS_INTERVAL: usize = 1000;

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("building-worker-{i}"))
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `process` on every building of `chunk` and return the outcomes
    /// in input order, one per building.
    ///
    /// A panic escaping `process` costs only that building: it is logged and
    /// recorded as a failure without attributes.
    pub fn process_chunk<F>(&self, chunk: Chunk, process: F, log: &dyn RunLog) -> Vec<BuildingOutcome>
    where
        F: Fn(BuildingRecord) -> BuildingOutcome + Sync,
    {
        let Chunk { number, records } = chunk;
        let total = records.len();
        let mut slots: Vec<Option<BuildingOutcome>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);

        let (tx, rx) = mpsc::channel::<(usize, std::result::Result<BuildingOutcome, String>)>();
        let process = &process;

        self.pool.in_place_scope(|scope| {
            for (position, record) in records.into_iter().enumerate() {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| process(record)))
                        .map_err(|payload| panic_message(payload.as_ref()));
                    // The driver outlives every task, so the receiver is alive
                    let _ = tx.send((position, result));
                });
            }
            drop(tx);

            let mut processed = 0usize;
            for (position, result) in rx {
                let outcome = result.unwrap_or_else(|error| {
                    log.error(&format!(
                        "Error processing building in chunk {number}, idx {position}: {error}"
                    ));
                    lost_building(error)
                });
                slots[position] = Some(outcome);
                processed += 1;
                if processed % PROCESS_PROGRESS_INTERVAL == 0 {
                    log.info(&format!(
                        "Chunk {number}: Processed {processed}/{total} buildings"
                    ));
                }
            }
        });

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| lost_building("Worker returned no result".to_string())))
            .collect()
    }
}

fn lost_building(error: String) -> BuildingOutcome {
    BuildingOutcome::Failure {
        properties: Properties::new(),
        error,
        mesh_error: None,
    }
}
