// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Splitting the feature stream into bounded chunks.

use crate::error::Result;
use crate::logging::RunLog;
use crate::record::BuildingRecord;
use crate::source::RawFeature;

/// Progress is logged after every this many features read
const READ_PROGRESS_INTERVAL: usize = 100;

/// Consecutive buildings processed and checkpointed together.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// 0-based, increasing by one per chunk
    pub number: usize,
    pub records: Vec<BuildingRecord>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Lazily groups features into chunks of at most `chunk_size` buildings.
///
/// Only one chunk is buffered at a time. A source error is yielded once and
/// ends iteration.
pub struct ChunkReader<'a, I> {
    features: I,
    chunk_size: usize,
    limit: Option<usize>,
    read: usize,
    next_number: usize,
    finished: bool,
    log: &'a dyn RunLog,
}

impl<'a, I> ChunkReader<'a, I>
where
    I: Iterator<Item = Result<RawFeature>>,
{
    pub fn new(features: I, chunk_size: usize, limit: Option<usize>, log: &'a dyn RunLog) -> Self {
        Self {
            features,
            chunk_size: chunk_size.max(1),
            limit,
            read: 0,
            next_number: 0,
            finished: false,
            log,
        }
    }

    /// Features read so far
    pub fn read_count(&self) -> usize {
        self.read
    }

    fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.read >= limit)
    }
}

impl<I> Iterator for ChunkReader<'_, I>
where
    I: Iterator<Item = Result<RawFeature>>,
{
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut records = Vec::new();
        while records.len() < self.chunk_size {
            if self.limit_reached() {
                self.finished = true;
                break;
            }
            match self.features.next() {
                Some(Ok(feature)) => {
                    records.push(BuildingRecord::from_feature(feature));
                    self.read += 1;
                    if self.read % READ_PROGRESS_INTERVAL == 0 {
                        self.log.info(&format!("Read {} buildings...", self.read));
                    }
                }
                Some(Err(e)) => {
                    self.finished = true;
                    self.log.error(&format!("Error reading source: {e}"));
                    return Some(Err(e));
                }
                None => {
                    self.finished = true;
                    break;
                }
            }
        }

        if records.is_empty() {
            return None;
        }
        let chunk = Chunk {
            number: self.next_number,
            records,
        };
        self.next_number += 1;
        Some(Ok(chunk))
    }
}
