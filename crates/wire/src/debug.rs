// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The live-debug broadcast protocol: WebSocket-framed, text messages the
//! registry's debug server emits, plus the small control protocol clients
//! use to send events and query state.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use fsm_core::{CorrelationId, DebugSessionId, EventName, MachineId, RunId, StateName};

use crate::record::{RegistryStatus, TransitionRecord};

/// Messages the debug server pushes to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LiveDebugMessage {
    #[serde(rename = "CURRENT_STATE")]
    CurrentState {
        machine_id: MachineId,
        state: StateName,
        supported_events: Vec<EventName>,
    },

    #[serde(rename = "STATE_CHANGE")]
    StateChange { record: DebugFrame },

    #[serde(rename = "PERIODIC_UPDATE")]
    PeriodicUpdate { machine_id: MachineId, uptime_ms: u64 },

    #[serde(rename = "EVENT_METADATA_UPDATE")]
    EventMetadataUpdate {
        machine_id: MachineId,
        /// (event name, target state) pairs, derived from the static graph.
        transitions: Vec<(EventName, StateName)>,
    },
}

/// A [`TransitionRecord`] with its JSON payload/context fields Base64-wrapped
/// for debug-socket transport — the plain recorder path transports the raw
/// JSON strings, this one does not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugFrame {
    pub machine_id: MachineId,
    pub machine_type: String,
    pub version: u64,
    pub state_before: StateName,
    pub state_after: StateName,
    pub event_name: EventName,
    pub event_payload_b64: String,
    pub event_params_b64: String,
    pub context_before_b64: String,
    pub context_before_hash: String,
    pub context_after_b64: String,
    pub context_after_hash: String,
    pub transition_duration_ms: u64,
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

pub fn to_debug_frame(record: &TransitionRecord) -> DebugFrame {
    DebugFrame {
        machine_id: record.machine_id.clone(),
        machine_type: record.machine_type.clone(),
        version: record.version,
        state_before: record.state_before.clone(),
        state_after: record.state_after.clone(),
        event_name: record.event_name.clone(),
        event_payload_b64: BASE64.encode(&record.event_payload),
        event_params_b64: BASE64.encode(&record.event_params),
        context_before_b64: BASE64.encode(&record.context_before),
        context_before_hash: record.context_before_hash.clone(),
        context_after_b64: BASE64.encode(&record.context_after),
        context_after_hash: record.context_after_hash.clone(),
        transition_duration_ms: record.transition_duration_ms,
        wall_clock_timestamp: record.wall_clock_timestamp.clone(),
        run_id: record.run_id.clone(),
        correlation_id: record.correlation_id.clone(),
        debug_session_id: record.debug_session_id.clone(),
        machine_online: record.machine_online,
        state_offline: record.state_offline,
        registry_status_before: record.registry_status_before,
        registry_status_after: record.registry_status_after,
        machine_hydrated_before: record.machine_hydrated_before,
        machine_hydrated_after: record.machine_hydrated_after,
    }
}

/// One message from a connected client: either `{"action": "GET_STATE"}` or
/// `{"action": <eventName>, "payload": <obj>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientControlMessage {
    pub action: String,
    #[serde(default)]
    pub payload: Value,
}

impl ClientControlMessage {
    pub const GET_STATE: &'static str = "GET_STATE";

    pub fn is_get_state(&self) -> bool {
        self.action == Self::GET_STATE
    }

    pub fn as_event_name(&self) -> Option<EventName> {
        if self.is_get_state() {
            None
        } else {
            Some(EventName::new(self.action.clone()))
        }
    }
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
