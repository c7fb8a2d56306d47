// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composes N recorders behind one port (§4.7: "recorders may fan out (an
//! in-memory ring for live monitoring + a durable sink)"). Each wrapped
//! recorder gets its own clone of the record and runs to completion before
//! the next starts; a slow or misbehaving recorder only delays its own
//! fan-out position, never the caller's transition (recording is always
//! awaited from the engine's perspective, but never fails it — see
//! `RedactingRecorder` and the port's doc comment for the no-error
//! contract each member must uphold itself).

use async_trait::async_trait;
use fsm_wire::TransitionRecord;

use crate::port::SnapshotRecorder;

pub struct FanOutRecorder {
    recorders: Vec<Box<dyn SnapshotRecorder>>,
}

impl FanOutRecorder {
    pub fn new(recorders: Vec<Box<dyn SnapshotRecorder>>) -> Self {
        Self { recorders }
    }
}

#[async_trait]
impl SnapshotRecorder for FanOutRecorder {
    async fn record(&self, record: TransitionRecord) {
        for recorder in &self.recorders {
            recorder.record(record.clone()).await;
        }
    }
}

#[cfg(test)]
#[path = "fanout_tests.rs"]
mod tests;
