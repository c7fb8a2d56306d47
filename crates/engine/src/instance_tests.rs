// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use serde_json::{json, Value};

use fsm_core::{Event, FakeClock, MachineId, PersistentEntity, StateGraph, StateGraphBuilder, StateName};
use fsm_recorder::RingRecorder;
use fsm_storage::{InMemoryPersistence, PersistencePort};

use super::*;
use crate::error::{EngineError, InstanceSendError};
use crate::scheduler::TimeoutScheduler;

#[derive(Debug, Clone, PartialEq)]
struct Order {
    id: MachineId,
    state: StateName,
    last_change_ms: u64,
    complete: bool,
    version: u64,
}

impl PersistentEntity for Order {
    fn machine_id(&self) -> &MachineId {
        &self.id
    }

    fn current_state(&self) -> &StateName {
        &self.state
    }

    fn set_current_state(&mut self, state: StateName) {
        self.state = state;
    }

    fn last_state_change_ms(&self) -> u64 {
        self.last_change_ms
    }

    fn set_last_state_change_ms(&mut self, timestamp_ms: u64) {
        self.last_change_ms = timestamp_ms;
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn set_complete(&mut self, complete: bool) {
        self.complete = complete;
    }

    fn deep_copy(&self) -> Self {
        self.clone()
    }

    fn to_canonical_json(&self) -> Value {
        json!({
            "id": self.id.as_str(),
            "state": self.state.as_str(),
            "last_change_ms": self.last_change_ms,
            "complete": self.complete,
            "version": self.version,
        })
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

fn order(id: &str) -> Order {
    Order {
        id: MachineId::new(id),
        state: StateName::new("PENDING"),
        last_change_ms: 0,
        complete: false,
        version: 0,
    }
}

fn graph() -> Arc<StateGraph<Order, ()>> {
    Arc::new(
        StateGraphBuilder::<Order, ()>::new()
            .initial("PENDING")
            .state("PENDING")
            .on("OrderPlaced", "AWAITING_PAYMENT")
            .done()
            .state("AWAITING_PAYMENT")
            .on("PaymentReceived", "PROCESSING")
            .done()
            .state("PROCESSING")
            .offline()
            .on("OrderShipped", "SHIPPED")
            .done()
            .state("SHIPPED")
            .is_final()
            .done()
            .build()
            .expect("valid graph"),
    )
}

#[allow(clippy::type_complexity)]
fn harness(
    id: &str,
    inbox_capacity: usize,
) -> (
    MachineInstance,
    JoinHandle<()>,
    Arc<InMemoryPersistence<Order>>,
    Arc<RingRecorder>,
) {
    let persistence = Arc::new(InMemoryPersistence::<Order>::new());
    let recorder = Arc::new(RingRecorder::new(16));
    let clock = FakeClock::new();
    let scheduler = Arc::new(TimeoutScheduler::with_clock(clock.clone()));
    let (instance, task) = spawn(
        MachineId::new(id),
        "order",
        graph(),
        order(id),
        (),
        0,
        clock,
        persistence.clone(),
        recorder.clone(),
        scheduler,
        inbox_capacity,
        false,
    );
    (instance, task, persistence, recorder)
}

#[tokio::test]
async fn transition_persists_entity_and_emits_record() {
    let (instance, _task, persistence, recorder) = harness("ord-1", 8);

    let outcome = instance
        .send(Event::new("OrderPlaced", 1, Value::Null))
        .await
        .expect("send succeeds");
    assert!(!outcome.became_complete);
    assert!(!outcome.should_evict);

    let persisted = persistence
        .load(&MachineId::new("ord-1"))
        .await
        .expect("load ok")
        .expect("entity was persisted");
    assert_eq!(persisted.current_state().as_str(), "AWAITING_PAYMENT");
    assert_eq!(persisted.version(), 1);

    assert_eq!(recorder.len(), 1);
    let record = recorder.latest().expect("one record emitted");
    assert_eq!(record.state_before.as_str(), "PENDING");
    assert_eq!(record.state_after.as_str(), "AWAITING_PAYMENT");
    assert_eq!(record.version, 1);
}

#[tokio::test]
async fn entering_offline_state_evicts_the_instance_after_persist() {
    let (instance, task, persistence, _recorder) = harness("ord-2", 8);

    instance
        .send(Event::new("OrderPlaced", 1, Value::Null))
        .await
        .expect("first transition");
    let outcome = instance
        .send(Event::new("PaymentReceived", 2, Value::Null))
        .await
        .expect("second transition enters the offline state");
    assert!(outcome.should_evict);

    // The instance's event loop exits after reporting an eviction; its task
    // completes on its own without the registry needing to abort it.
    task.await.expect("instance task exits cleanly");

    let persisted = persistence
        .load(&MachineId::new("ord-2"))
        .await
        .expect("load ok")
        .expect("entity was persisted before eviction");
    assert_eq!(persisted.current_state().as_str(), "PROCESSING");

    let err = instance
        .send(Event::new("OrderShipped", 3, Value::Null))
        .await
        .expect_err("the instance is no longer running");
    assert!(matches!(err, InstanceSendError::Closed));
}

#[tokio::test]
async fn complete_machine_rejects_further_events() {
    let (instance, _task, _persistence, recorder) = harness("ord-3", 8);
    instance.send(Event::new("OrderPlaced", 1, Value::Null)).await.expect("ok");
    instance.send(Event::new("PaymentReceived", 2, Value::Null)).await.expect("ok");
    let outcome = instance
        .send(Event::new("OrderShipped", 3, Value::Null))
        .await
        .expect("final transition");
    assert!(outcome.became_complete);
    assert_eq!(recorder.len(), 3);

    let err = instance
        .send(Event::new("OrderShipped", 4, Value::Null))
        .await
        .expect_err("a completed machine rejects events");
    assert!(matches!(err, InstanceSendError::Transition(EngineError::MachineComplete)));
    // The rejected event produced no additional record (§4.4 step 1).
    assert_eq!(recorder.len(), 3);
}

#[tokio::test]
async fn unhandled_event_is_discarded_without_changing_state_or_version() {
    let (instance, _task, persistence, recorder) = harness("ord-4", 8);

    let outcome = instance
        .send(Event::new("NoSuchEvent", 1, Value::Null))
        .await
        .expect("unhandled events are not errors");
    assert!(!outcome.became_complete);
    assert!(!outcome.should_evict);
    assert_eq!(recorder.len(), 0);

    let persisted = persistence.load(&MachineId::new("ord-4")).await.expect("load ok");
    assert!(persisted.is_none(), "nothing was ever persisted for an unhandled event");
}

fn graph_with_panicking_entry_hook() -> Arc<StateGraph<Order, ()>> {
    Arc::new(
        StateGraphBuilder::<Order, ()>::new()
            .initial("PENDING")
            .state("PENDING")
            .on("OrderPlaced", "AWAITING_PAYMENT")
            .done()
            .state("AWAITING_PAYMENT")
            .on_entry(|_handle| panic!("boom"))
            .done()
            .build()
            .expect("valid graph"),
    )
}

#[tokio::test]
async fn a_panicking_entry_hook_is_reported_on_the_send_outcome_without_losing_the_transition() {
    let persistence = Arc::new(InMemoryPersistence::<Order>::new());
    let recorder = Arc::new(RingRecorder::new(16));
    let clock = FakeClock::new();
    let scheduler = Arc::new(TimeoutScheduler::with_clock(clock.clone()));
    let (instance, _task) = spawn(
        MachineId::new("ord-hook-panic"),
        "order",
        graph_with_panicking_entry_hook(),
        order("ord-hook-panic"),
        (),
        0,
        clock,
        persistence.clone(),
        recorder.clone(),
        scheduler,
        8,
        false,
    );

    let outcome = instance
        .send(Event::new("OrderPlaced", 1, Value::Null))
        .await
        .expect("the panic is caught, not propagated as a send error");
    assert!(outcome.hook_failed, "the outcome must report the hook failure");

    let persisted = persistence
        .load(&MachineId::new("ord-hook-panic"))
        .await
        .expect("load ok")
        .expect("persisted despite the hook failure");
    assert_eq!(persisted.current_state().as_str(), "AWAITING_PAYMENT", "the state mutation is retained");
    assert_eq!(recorder.len(), 1, "a transition record is still emitted");
}

fn graph_with_initial_timeout(duration_ms: u64) -> Arc<StateGraph<Order, ()>> {
    Arc::new(
        StateGraphBuilder::<Order, ()>::new()
            .initial("PENDING")
            .state("PENDING")
            .timeout(duration_ms, "EXPIRED")
            .on("OrderPlaced", "AWAITING_PAYMENT")
            .done()
            .state("AWAITING_PAYMENT")
            .done()
            .state("EXPIRED")
            .is_final()
            .done()
            .build()
            .expect("valid graph"),
    )
}

#[tokio::test]
async fn a_freshly_spawned_instance_arms_the_timeout_of_its_initial_state() {
    let persistence = Arc::new(InMemoryPersistence::<Order>::new());
    let recorder = Arc::new(RingRecorder::new(16));
    let clock = FakeClock::new();
    let scheduler = Arc::new(TimeoutScheduler::with_clock(clock.clone()));
    let (_instance, _task) = spawn(
        MachineId::new("ord-6"),
        "order",
        graph_with_initial_timeout(1_000),
        order("ord-6"),
        (),
        0,
        clock,
        persistence,
        recorder,
        scheduler.clone(),
        8,
        false,
    );

    // No event has been sent yet; the timeout configured on the machine's
    // own initial state must already be armed rather than waiting for a
    // transition that may never come.
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    assert_eq!(scheduler.pending_count(), 1);
}

#[tokio::test]
async fn second_send_is_overloaded_when_the_bounded_inbox_is_already_full() {
    let (instance, _task, _persistence, _recorder) = harness("ord-5", 1);

    // Neither future is polled yet (futures are lazy); `join!` polls both
    // within the same tick, before the spawned instance task gets a chance
    // to run on this single-threaded test executor. With inbox capacity 1,
    // the first `try_send` fills the only slot and the second must fail
    // fast rather than wait for the first event to be processed.
    let first = instance.send(Event::new("OrderPlaced", 1, Value::Null));
    let second = instance.send(Event::new("OrderPlaced", 2, Value::Null));
    let (first, second) = tokio::join!(first, second);

    let results = [first, second];
    let overloaded_count =
        results.iter().filter(|r| matches!(r, Err(InstanceSendError::Overloaded))).count();
    assert_eq!(overloaded_count, 1, "exactly one of the two racing sends should be overloaded");
}
