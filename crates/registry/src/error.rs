// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry-level error taxonomy (§7): the subset of errors that surface to
//! the caller of a registry API, as opposed to [`fsm_engine::EngineError`],
//! which is transition-internal and always wrapped into one of these.

use thiserror::Error;

use fsm_engine::{EngineError, InstanceSendError};
use fsm_storage::PersistenceError;

/// Errors a registry API call can return. §7's propagation policy: these
/// always surface to the caller — the engine never retries or swallows
/// them internally.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// `send` addressed an ID that is neither live nor known to persistence,
    /// and no factory was supplied to create it.
    #[error("no live or persisted machine for id, and no factory was given to create one")]
    UnknownMachine,

    /// The machine has already reached a final state.
    #[error("machine is complete and rejects further events")]
    MachineComplete,

    /// The machine's inbox was full; the caller should retry or fail.
    #[error("machine inbox is full")]
    Overloaded,

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// The live-debug server could not bind its configured port.
    #[error("failed to start live-debug server on port {port}: {source}")]
    DebugServerBind { port: u16, #[source] source: std::io::Error },
}

impl From<InstanceSendError> for RegistryError {
    fn from(err: InstanceSendError) -> Self {
        match err {
            InstanceSendError::Overloaded => RegistryError::Overloaded,
            // The instance exited (most likely a race with an auto-eviction
            // that just happened); from the caller's perspective this reads
            // the same as the ID no longer being live, which `send` resolves
            // by rehydrating via `create_or_get` rather than surfacing this
            // directly — see `Registry::send`.
            InstanceSendError::Closed => RegistryError::UnknownMachine,
            InstanceSendError::Transition(EngineError::MachineComplete) => {
                RegistryError::MachineComplete
            }
            InstanceSendError::Transition(EngineError::Persistence(e)) => {
                RegistryError::Persistence(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
