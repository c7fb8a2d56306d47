// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The snapshot recorder port (C7): a single `record` operation the engine
//! calls once per completed transition. No error type is exposed to the
//! engine — §4.7 declares recording best-effort, so implementations swallow
//! and log their own failures rather than surfacing a `Result` the engine
//! would have to decide whether to act on.

use async_trait::async_trait;
use fsm_wire::TransitionRecord;

/// Receives one [`TransitionRecord`] per completed transition (§4.7).
/// Implementations may fan out to multiple sinks, redact sensitive fields,
/// or buffer for live monitoring; none of that is visible to the engine.
#[async_trait]
pub trait SnapshotRecorder: Send + Sync {
    async fn record(&self, record: TransitionRecord);
}

#[cfg(test)]
#[path = "port_tests.rs"]
mod tests;
