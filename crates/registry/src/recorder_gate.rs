// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wraps the caller-supplied [`SnapshotRecorder`] so the registry can also
//! feed `snapshot_debug`'s in-memory ring and the live-debug broadcast
//! channel, without either debug consumer being visible to the engine
//! (which only ever calls the plain port). Normal recording (§4.7) happens
//! unconditionally; the debug paths are additionally fed only while their
//! flag is set, checked fresh on every record so toggling takes effect on
//! the very next transition.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use fsm_recorder::{RingRecorder, SnapshotRecorder};
use fsm_wire::TransitionRecord;

pub struct DebugGatedRecorder<Rec> {
    inner: Rec,
    ring: Arc<RingRecorder>,
    broadcast_tx: broadcast::Sender<TransitionRecord>,
    snapshot_debug: Arc<AtomicBool>,
    live_debug: Arc<AtomicBool>,
}

impl<Rec: SnapshotRecorder> DebugGatedRecorder<Rec> {
    pub fn new(
        inner: Rec,
        ring: Arc<RingRecorder>,
        broadcast_tx: broadcast::Sender<TransitionRecord>,
        snapshot_debug: Arc<AtomicBool>,
        live_debug: Arc<AtomicBool>,
    ) -> Self {
        Self { inner, ring, broadcast_tx, snapshot_debug, live_debug }
    }
}

#[async_trait]
impl<Rec: SnapshotRecorder> SnapshotRecorder for DebugGatedRecorder<Rec> {
    async fn record(&self, record: TransitionRecord) {
        self.inner.record(record.clone()).await;

        if self.snapshot_debug.load(Ordering::Relaxed) {
            self.ring.record(record.clone()).await;
        }

        if self.live_debug.load(Ordering::Relaxed) {
            // A broadcast send only fails when there are no receivers
            // connected; that is the common case between debug-client
            // connections and is not an error (§4.7: best-effort).
            let _ = self.broadcast_tx.send(record);
        }
    }
}

#[cfg(test)]
#[path = "recorder_gate_tests.rs"]
mod tests;
