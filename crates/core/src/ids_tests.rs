// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn machine_id_holds_caller_supplied_string() {
    let id = MachineId::new("order-CUST-001");
    assert_eq!(id.as_str(), "order-CUST-001");
}

#[test]
fn event_name_reserved_constants() {
    assert_eq!(EventName::timeout().as_str(), "__timeout__");
    assert_eq!(EventName::generic().as_str(), "__generic__");
    assert!(EventName::timeout().is_timeout());
    assert!(!EventName::new("OrderPlaced").is_timeout());
}

#[test]
fn correlation_id_has_prefix() {
    let id = CorrelationId::new();
    assert!(id.as_str().starts_with("cor-"));
}

#[test]
fn run_id_and_debug_session_id_distinct_prefixes() {
    assert!(RunId::new().as_str().starts_with("run-"));
    assert!(DebugSessionId::new().as_str().starts_with("dbg-"));
}
