// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-capacity in-memory ring buffer recorder, used to back live
//! monitoring consumers (the live-debug broadcast in `fsm-registry` reads
//! its `CURRENT_STATE` snapshot from one of these). Oldest records are
//! dropped once capacity is reached; this recorder never blocks and never
//! fails, matching §4.7's "in-memory ring for live monitoring" example.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use fsm_wire::TransitionRecord;

use crate::port::SnapshotRecorder;

pub struct RingRecorder {
    capacity: usize,
    records: Mutex<VecDeque<TransitionRecord>>,
}

impl RingRecorder {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), records: Mutex::new(VecDeque::new()) }
    }

    /// Snapshot of everything currently buffered, oldest first.
    pub fn snapshot(&self) -> Vec<TransitionRecord> {
        self.records.lock().iter().cloned().collect()
    }

    /// Most recent record, if any.
    pub fn latest(&self) -> Option<TransitionRecord> {
        self.records.lock().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SnapshotRecorder for RingRecorder {
    async fn record(&self, record: TransitionRecord) {
        let mut records = self.records.lock();
        if records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }
}

#[cfg(test)]
#[path = "ring_tests.rs"]
mod tests;
