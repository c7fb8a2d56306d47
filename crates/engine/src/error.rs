// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-level error taxonomy (§7, the subset owned by this crate).
//! `UnknownMachine`/`Overloaded` belong to the registry crate, which is the
//! layer that knows about live-instance lookup and inbox capacity.

use thiserror::Error;

use fsm_storage::PersistenceError;

/// Errors a single transition attempt can produce. Hook failures are caught
/// (§4.4: "the engine does NOT roll back the state mutation") and never
/// appear here — they are logged and counted, not propagated.
#[derive(Debug, Error)]
pub enum EngineError {
    /// §4.4 step 1 / §7: the machine has reached a final state and rejects
    /// further events. Not recorded.
    #[error("machine is complete and rejects further events")]
    MachineComplete,

    /// §4.6/§7: a `save` failed. The in-memory mutation is retained; the
    /// engine does not evict even if the new state is offline.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Errors a call to [`crate::instance::MachineInstance::send`] can produce.
/// `Overloaded`/`Closed` are inbox-delivery failures and never reach
/// `apply`; `Transition` wraps whatever `apply` itself returned.
#[derive(Debug, Error)]
pub enum InstanceSendError {
    /// §4.5/§7: the bounded inbox was full. The caller must retry or fail.
    #[error("machine inbox is full")]
    Overloaded,

    /// The instance's event loop has already exited (evicted, or shut
    /// down) and is no longer accepting events for this machine ID.
    #[error("machine instance is no longer running")]
    Closed,

    #[error(transparent)]
    Transition(#[from] EngineError),
}
