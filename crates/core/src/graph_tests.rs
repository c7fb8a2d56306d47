// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::context::MachineHandle;

type TestGraph = StateGraph<(), ()>;
type TestBuilder = StateGraphBuilder<(), ()>;

fn noop_hook() -> impl for<'a> Fn(&mut MachineHandle<'a, (), ()>) + Send + Sync + 'static {
    |_handle| {}
}

#[test]
fn builds_minimal_graph_with_single_state() {
    let graph: TestGraph =
        TestBuilder::new().initial("PENDING").state("PENDING").done().build().expect("build");
    assert_eq!(graph.initial_state().as_str(), "PENDING");
    assert!(graph.contains(&StateName::new("PENDING")));
}

#[yare::parameterized(
    missing_initial_state = { "missing_initial_state" },
    unknown_initial_state = { "unknown_initial_state" },
    duplicate_state_definition = { "duplicate_state_definition" },
    transition_to_unknown_target = { "transition_to_unknown_target" },
    final_state_with_outgoing_transition = { "final_state_with_outgoing_transition" },
)]
fn rejects_invalid_graphs(case: &str) {
    let result: Result<TestGraph, _> = match case {
        "missing_initial_state" => TestBuilder::new().state("PENDING").done().build(),
        "unknown_initial_state" => {
            TestBuilder::new().initial("NOPE").state("PENDING").done().build()
        }
        "duplicate_state_definition" => TestBuilder::new()
            .initial("PENDING")
            .state("PENDING")
            .done()
            .state("PENDING")
            .done()
            .build(),
        "transition_to_unknown_target" => TestBuilder::new()
            .initial("PENDING")
            .state("PENDING")
            .on("Go", "NOWHERE")
            .done()
            .build(),
        "final_state_with_outgoing_transition" => TestBuilder::new()
            .initial("PENDING")
            .state("PENDING")
            .on("Go", "DONE")
            .done()
            .state("DONE")
            .is_final()
            .on("Go", "PENDING")
            .done()
            .build(),
        other => panic!("unknown case {other}"),
    };

    let err = result.expect_err("build() must reject this graph");
    let matches_expected = match case {
        "missing_initial_state" => matches!(err, InvalidGraph::MissingInitialState),
        "unknown_initial_state" => matches!(err, InvalidGraph::UnknownInitialState(ref s) if s == "NOPE"),
        "duplicate_state_definition" => {
            matches!(err, InvalidGraph::DuplicateState(ref s) if s == "PENDING")
        }
        "transition_to_unknown_target" => matches!(
            err,
            InvalidGraph::UnknownTransitionTarget { ref from, ref event, ref target }
                if from == "PENDING" && event == "Go" && target == "NOWHERE"
        ),
        "final_state_with_outgoing_transition" => {
            matches!(err, InvalidGraph::FinalStateHasOutgoingTransition(ref s, _) if s == "DONE")
        }
        other => panic!("unknown case {other}"),
    };
    assert!(matches_expected, "unexpected error variant for {case}: {err:?}");
}

#[test]
fn final_state_with_no_outgoing_transitions_builds() {
    let graph: TestGraph = TestBuilder::new()
        .initial("PENDING")
        .state("PENDING")
        .on("Go", "DONE")
        .done()
        .state("DONE")
        .is_final()
        .done()
        .build()
        .expect("build");
    assert!(graph.state(&StateName::new("DONE")).expect("state").is_final());
}

#[test]
fn state_descriptor_exposes_transitions_and_stay_actions() {
    let graph: TestGraph = TestBuilder::new()
        .initial("RINGING")
        .state("RINGING")
        .on_entry(noop_hook())
        .on_exit(noop_hook())
        .on("Answered", "TALKING")
        .stay_on("SessionProgress", |_handle, _event| {})
        .offline()
        .timeout(5_000, "TALKING")
        .done()
        .state("TALKING")
        .done()
        .build()
        .expect("build");

    let ringing = graph.state(&StateName::new("RINGING")).expect("state");
    assert!(ringing.entry_hook().is_some());
    assert!(ringing.exit_hook().is_some());
    assert!(ringing.is_offline());
    assert!(!ringing.is_final());
    assert_eq!(
        ringing.transition_for(&EventName::new("Answered")),
        Some(&StateName::new("TALKING"))
    );
    assert!(ringing.has_transition(&EventName::new("Answered")));
    assert!(ringing.stay_action_for(&EventName::new("SessionProgress")).is_some());
    assert!(ringing.transition_for(&EventName::new("Unhandled")).is_none());

    let timeout = ringing.timeout().expect("timeout configured");
    assert_eq!(timeout.duration_ms, 5_000);
    assert_eq!(timeout.target.as_str(), "TALKING");
}

#[test]
fn unrelated_builders_do_not_share_state() {
    let a: TestGraph = TestBuilder::new().initial("A").state("A").done().build().expect("build");
    let b: TestGraph = TestBuilder::new()
        .initial("B")
        .state("B")
        .done()
        .state("C")
        .done()
        .build()
        .expect("build");
    assert!(a.contains(&StateName::new("A")));
    assert!(!a.contains(&StateName::new("B")));
    assert!(b.contains(&StateName::new("C")));
}
