// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret redaction (§4.7): wraps another recorder, replacing values of a
//! configured field-name set with a fixed sentinel before the wrapped
//! recorder ever sees the record. Hashes are recomputed post-redaction, per
//! spec — a recorder downstream of this one can never observe either the
//! original value or a hash that would let it be brute-forced back out.

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;

use fsm_wire::{hash_canonical_json, TransitionRecord};

use crate::port::SnapshotRecorder;

const SENTINEL: &str = "***REDACTED***";

pub struct RedactingRecorder<R: SnapshotRecorder> {
    inner: R,
    fields: HashSet<String>,
}

impl<R: SnapshotRecorder> RedactingRecorder<R> {
    pub fn new(inner: R, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { inner, fields: fields.into_iter().map(Into::into).collect() }
    }

    fn redact_json_str(&self, json: &str) -> String {
        match serde_json::from_str::<Value>(json) {
            Ok(mut value) => {
                redact_value(&mut value, &self.fields);
                value.to_string()
            }
            // Not a JSON object/value we can walk (e.g. already a bare string); leave as-is.
            Err(_) => json.to_string(),
        }
    }
}

/// Recursively replaces the value of any object key present in `fields`
/// with the sentinel, descending into nested objects and arrays.
fn redact_value(value: &mut Value, fields: &HashSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if fields.contains(key.as_str()) {
                    *v = Value::String(SENTINEL.to_string());
                } else {
                    redact_value(v, fields);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                redact_value(item, fields);
            }
        }
        _ => {}
    }
}

#[async_trait]
impl<R: SnapshotRecorder> SnapshotRecorder for RedactingRecorder<R> {
    async fn record(&self, mut record: TransitionRecord) {
        record.event_payload = self.redact_json_str(&record.event_payload);
        record.event_params = self.redact_json_str(&record.event_params);
        record.context_before = self.redact_json_str(&record.context_before);
        record.context_after = self.redact_json_str(&record.context_after);
        record.context_before_hash = hash_canonical_json(&record.context_before);
        record.context_after_hash = hash_canonical_json(&record.context_after);
        self.inner.record(record).await;
    }
}

#[cfg(test)]
#[path = "redact_tests.rs"]
mod tests;
