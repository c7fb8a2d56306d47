// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event envelope (C9): the only thing the transition engine dispatches
//! on. Transitions are keyed by [`EventName`], never by a Rust type, so
//! wire-level events can be routed without reflection.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::EventName;

/// One unit of input delivered to a machine's inbox.
///
/// `payload` is opaque to the engine — it is handed to hooks and stay
/// actions verbatim and serialized into the transition record. `params` is a
/// flattened view of the event's attributes used only for recorder
/// serialization (so a domain event can expose a handful of scalar fields
/// without forcing the whole payload through the same shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    name: EventName,
    timestamp_ms: u64,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    params: Map<String, Value>,
}

impl Event {
    pub fn new(name: impl Into<EventName>, timestamp_ms: u64, payload: Value) -> Self {
        Self { name: name.into(), timestamp_ms, payload, params: Map::new() }
    }

    /// Construct the synthetic timeout event delivered by the scheduler.
    pub fn timeout(timestamp_ms: u64) -> Self {
        Self::new(EventName::timeout(), timestamp_ms, Value::Null)
    }

    /// Construct an untyped, string-named event (the `__generic__` form).
    pub fn generic(timestamp_ms: u64, payload: Value) -> Self {
        Self::new(EventName::generic(), timestamp_ms, payload)
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    pub fn name(&self) -> &EventName {
        &self.name
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn is_timeout(&self) -> bool {
        self.name.is_timeout()
    }

    /// Serialized payload for transition-record construction; never fails
    /// because `Value` is already JSON.
    pub fn payload_json(&self) -> String {
        self.payload.to_string()
    }

    pub fn params_json(&self) -> String {
        Value::Object(self.params.clone()).to_string()
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
