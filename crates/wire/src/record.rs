// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transition record wire schema (§6): one value emitted per completed
//! transition, fed to snapshot recorders and to the live-debug broadcast.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use fsm_core::{CorrelationId, DebugSessionId, EventName, MachineId, RunId, StateName};

/// Whether the registry currently holds a live instance for this machine,
/// sampled at two points per transition (before the engine ran, and after).
/// The design notes call out that only some code paths populate this pair;
/// here it is always populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistryStatus {
    RegisteredActive,
    RegisteredInactive,
    NotRegistered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub machine_id: MachineId,
    pub machine_type: String,
    pub version: u64,
    pub state_before: StateName,
    pub state_after: StateName,
    pub event_name: EventName,
    /// UTF-8 JSON.
    pub event_payload: String,
    /// UTF-8 JSON.
    pub event_params: String,
    /// UTF-8 JSON.
    pub context_before: String,
    pub context_before_hash: String,
    /// UTF-8 JSON.
    pub context_after: String,
    pub context_after_hash: String,
    pub transition_duration_ms: u64,
    /// ISO-8601 UTC.
    pub wall_clock_timestamp: String,
    pub run_id: Option<RunId>,
    pub correlation_id: Option<CorrelationId>,
    pub debug_session_id: Option<DebugSessionId>,
    pub machine_online: bool,
    pub state_offline: bool,
    pub registry_status_before: RegistryStatus,
    pub registry_status_after: RegistryStatus,
    pub machine_hydrated_before: bool,
    pub machine_hydrated_after: bool,
}

/// SHA-256 hex digest of a canonical JSON string, computed post-redaction
/// when a redacting recorder is in the chain (§4.7).
pub fn hash_canonical_json(json: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
