// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property-based tests for invariants that should hold across arbitrary
//! inputs: ID round-tripping and state-graph build-time validation. Gated
//! behind `test-support` so downstream crates
//! can reuse `proptest` strategies for machine IDs and event names without
//! pulling `proptest` into their default dependency graph.

use proptest::prelude::*;

use crate::graph::{InvalidGraph, StateGraphBuilder};
use crate::ids::{EventName, MachineId, StateName};

/// Strategy producing non-empty, printable-ASCII strings suitable as
/// `MachineId`/`StateName`/`EventName` values.
pub fn opaque_string_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,32}"
}

proptest! {
    #[test]
    fn machine_id_roundtrips_through_serde(s in opaque_string_strategy()) {
        let id = MachineId::new(s.clone());
        let json = serde_json::to_string(&id).expect("serialize");
        let parsed: MachineId = serde_json::from_str(&json).expect("deserialize");
        prop_assert_eq!(parsed.as_str(), s.as_str());
    }

    #[test]
    fn state_name_equality_is_reflexive_over_arbitrary_strings(s in opaque_string_strategy()) {
        let a = StateName::new(s.clone());
        let b = StateName::new(s);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn event_name_never_collides_with_reserved_names_by_accident(
        s in "[a-zA-Z][a-zA-Z0-9_]{1,31}"
    ) {
        let ev = EventName::new(s);
        prop_assert!(!ev.is_timeout() || ev.as_str() == EventName::TIMEOUT);
    }

    /// A graph with a known initial state and only self-consistent
    /// transitions always builds; this is the positive half of invariant
    /// coverage for C1's build-time validation.
    #[test]
    fn graph_with_resolvable_transitions_always_builds(
        extra_states in prop::collection::vec(opaque_string_strategy(), 0..5)
    ) {
        let mut builder: StateGraphBuilder<(), ()> =
            StateGraphBuilder::new().initial("START");
        builder = builder.state("START").done();
        for name in &extra_states {
            if name != "START" {
                builder = builder.state(name.clone()).done();
            }
        }
        let result = builder.build();
        prop_assert!(matches!(result, Ok(_)) || matches!(result, Err(InvalidGraph::DuplicateState(_))));
    }
}
