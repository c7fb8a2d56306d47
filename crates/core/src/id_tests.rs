// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

// --- define_id! macro tests ---

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct TestId("tst-");
}

#[test]
fn define_id_hash_map_lookup() {
    let mut map = HashMap::new();
    map.insert(TestId::from_string("tst-k"), 42);
    assert_eq!(map.get("tst-k"), Some(&42));
}

#[test]
fn define_id_new_has_prefix_and_length() {
    let id = TestId::new();
    assert!(id.as_str().starts_with("tst-"));
    assert_eq!(id.as_str().len(), ID_MAX_LEN);
}

#[test]
fn define_id_short_truncates_suffix() {
    let id = TestId::from_string("tst-abcdefghijklmnop");
    assert_eq!(id.short(4), "abcd");
}

#[test]
fn define_id_suffix_strips_prefix() {
    let id = TestId::from_string("tst-abc123");
    assert_eq!(id.suffix(), "abc123");
}

#[test]
fn define_id_serde_roundtrip() {
    let id = TestId::from_string("tst-roundtrip");
    let json = serde_json::to_string(&id).expect("serialize");
    assert_eq!(json, "\"tst-roundtrip\"");
    let parsed: TestId = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(parsed, id);
}

// --- short() free function ---

#[test]
fn short_fn_on_str() {
    let s = "abcdefghijklmnop";
    assert_eq!(short(s, 8), "abcdefgh");
    assert_eq!(short(s, 100), s);
    assert_eq!(short("abc", 8), "abc");
}

// --- define_string_id! macro tests ---

crate::define_string_id! {
    /// Test opaque-string ID type for macro verification.
    pub struct TestStringId;
}

#[test]
fn string_id_holds_arbitrary_length_values() {
    let long = "x".repeat(200);
    let id = TestStringId::new(long.clone());
    assert_eq!(id.as_str(), long);
}

#[test]
fn string_id_hash_map_lookup() {
    let mut map = HashMap::new();
    map.insert(TestStringId::new("CALL-001"), "ringing");
    assert_eq!(map.get("CALL-001"), Some(&"ringing"));
}

#[test]
fn string_id_equality_with_str() {
    let id = TestStringId::new("order-42");
    assert_eq!(id, "order-42");
    assert_eq!(id, *"order-42".to_string());
}

#[test]
fn string_id_serde_roundtrip() {
    let id = TestStringId::new("sms-session-7");
    let json = serde_json::to_string(&id).expect("serialize");
    assert_eq!(json, "\"sms-session-7\"");
    let parsed: TestStringId = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(parsed, id);
}

#[test]
fn string_id_is_empty() {
    assert!(TestStringId::new("").is_empty());
    assert!(!TestStringId::new("x").is_empty());
}
