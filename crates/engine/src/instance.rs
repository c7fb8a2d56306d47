// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The machine instance (C5): one lightweight `tokio` task per live
//! machine, owning a bounded single-consumer inbox. Every event for this
//! machine — external, timeout, registry-synthetic — is serialized through
//! that inbox, which is what gives the engine its "one transition at a time
//! per machine" guarantee without any lock visible to callers (§4.5/§5).
//!
//! `send` enqueues and then awaits the reply for *that* event; this is a
//! deliberate reading of §4.5's "blocks only until enqueued" together with
//! §7's requirement that lifecycle errors (`Persistence`, `Complete`)
//! surface to the registry-API caller — see DESIGN.md for the writeup.
//! Backpressure still works the way §4.5 describes: `try_send` fails fast
//! with `Overloaded` when the inbox is full, before any awaiting happens.

use std::sync::Arc;

use fsm_core::{
    Clock, ClockSource, Event, MachineId, PersistentEntity, StateGraph, StateName, TimeoutHandle,
    TimeoutId,
};
use fsm_recorder::SnapshotRecorder;
use fsm_storage::PersistencePort;
use fsm_wire::record::RegistryStatus;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::InstanceSendError;
use crate::scheduler::TimeoutScheduler;
use crate::transition::{self, TransitionEffect, TransitionInputs};

/// What a successful `send` reports back to the registry, so it can update
/// its own bookkeeping (active-machine counts, completion index) without
/// re-deriving it from the entity.
#[derive(Debug, Clone, Copy)]
pub struct SendOutcome {
    pub became_complete: bool,
    /// The transition landed on an offline-marked state and persistence
    /// confirmed; the registry should remove this machine from its live
    /// map. The instance's task exits on its own once the registry drops
    /// its sender, so eviction itself is a registry-side no-op beyond that.
    pub should_evict: bool,
    /// An entry/exit/stay hook panicked during this transition (§4.4: "the
    /// engine does NOT roll back the state mutation"). The state change
    /// already happened and was persisted; this only tells the registry to
    /// count the failure.
    pub hook_failed: bool,
}

struct Envelope {
    event: Event,
    /// Set only for scheduler-delivered timeout firings; used to discard a
    /// fire that raced a cancellation (§4.3/invariant 8).
    fired_timeout_id: Option<TimeoutId>,
    run_id: Option<String>,
    correlation_id: Option<String>,
    debug_session_id: Option<String>,
    reply: oneshot::Sender<Result<SendOutcome, InstanceSendError>>,
}

/// A handle to a live machine's event loop. Cloning is cheap (an `mpsc`
/// sender clone); every clone reaches the same task.
#[derive(Clone)]
pub struct MachineInstance {
    machine_id: MachineId,
    sender: mpsc::Sender<Envelope>,
}

impl MachineInstance {
    pub fn machine_id(&self) -> &MachineId {
        &self.machine_id
    }

    /// Enqueues `event` and awaits the result of processing it. Fails fast
    /// with [`InstanceSendError::Overloaded`] if the inbox is full, or
    /// [`InstanceSendError::Closed`] if the instance's task has already
    /// exited (most likely because it was evicted by an earlier send).
    pub async fn send(&self, event: Event) -> Result<SendOutcome, InstanceSendError> {
        self.send_with(event, None, None, None).await
    }

    pub async fn send_with(
        &self,
        event: Event,
        run_id: Option<String>,
        correlation_id: Option<String>,
        debug_session_id: Option<String>,
    ) -> Result<SendOutcome, InstanceSendError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let envelope = Envelope {
            event,
            fired_timeout_id: None,
            run_id,
            correlation_id,
            debug_session_id,
            reply: reply_tx,
        };
        self.sender.try_send(envelope).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => InstanceSendError::Overloaded,
            mpsc::error::TrySendError::Closed(_) => InstanceSendError::Closed,
        })?;
        reply_rx.await.map_err(|_| InstanceSendError::Closed)?
    }
}

/// Owns everything [`transition::apply`] needs across calls: the shared
/// graph, the two contexts, the version counter, and at most one armed
/// timeout. Lives entirely inside the task spawned by [`spawn`] — nothing
/// outside this module ever touches it directly.
struct Runtime<P, V, C, Persist, Rec> {
    machine_id: MachineId,
    machine_type: String,
    graph: Arc<StateGraph<P, V>>,
    entity: P,
    volatile: V,
    version: u64,
    clock: C,
    persistence: Arc<Persist>,
    recorder: Arc<Rec>,
    scheduler: Arc<TimeoutScheduler<C>>,
    armed_timeout: Option<TimeoutHandle>,
    self_sender: mpsc::WeakSender<Envelope>,
}

impl<P, V, C, Persist, Rec> Runtime<P, V, C, Persist, Rec>
where
    P: PersistentEntity,
    C: Clock,
{
    /// Arms a timer for the machine's *current* state, firing a synthetic
    /// timeout event back into this instance's own inbox after
    /// `duration_ms`. Called both when a transition lands on a state with a
    /// configured timeout (§4.4 step 4e) and once at task startup for the
    /// state a brand-new or just-rehydrated machine already sits in
    /// (§4.3: a timeout is a property of *being* in a state, not of the
    /// transition that happened to land the machine there). `clock_source`
    /// picks which clock both the scheduler and the recorded deadline use.
    fn arm_timeout(&mut self, duration_ms: u64, fallback_target: StateName, clock_source: ClockSource) {
        let deadline_ms = match clock_source {
            ClockSource::Registry => self.clock.epoch_ms(),
            ClockSource::Wall => fsm_core::SystemClock.epoch_ms(),
        } + duration_ms;
        let handle = TimeoutHandle::with_id(
            TimeoutId::new(),
            self.entity.current_state().clone(),
            deadline_ms,
            fallback_target,
        );
        let timeout_id = handle.id().clone();
        let sender = self.self_sender.clone();
        let clock = self.clock.clone();
        self.scheduler.schedule_with_source(timeout_id.clone(), duration_ms, clock_source, move || {
            let Some(sender) = sender.upgrade() else { return };
            let (reply_tx, _reply_rx) = oneshot::channel();
            let envelope = Envelope {
                event: Event::timeout(clock.epoch_ms()),
                fired_timeout_id: Some(timeout_id),
                run_id: None,
                correlation_id: None,
                debug_session_id: None,
                reply: reply_tx,
            };
            if sender.try_send(envelope).is_err() {
                warn!("dropped timeout firing: inbox unavailable");
            }
        });
        self.armed_timeout = Some(handle);
    }
}

/// Spawns the task backing one machine instance and returns a cheap handle
/// to it. `hydrated` marks whether `entity` was just loaded from
/// persistence (true) or is brand new (`createOrGet` building a fresh
/// entity, false) — it only affects the very first processed event's
/// `machine_hydrated_before` flag.
#[allow(clippy::too_many_arguments)]
pub fn spawn<P, V, C, Persist, Rec>(
    machine_id: MachineId,
    machine_type: impl Into<String>,
    graph: Arc<StateGraph<P, V>>,
    entity: P,
    volatile: V,
    version: u64,
    clock: C,
    persistence: Arc<Persist>,
    recorder: Arc<Rec>,
    scheduler: Arc<TimeoutScheduler<C>>,
    inbox_capacity: usize,
    hydrated: bool,
) -> (MachineInstance, JoinHandle<()>)
where
    P: PersistentEntity,
    V: Send + 'static,
    C: Clock + 'static,
    Persist: PersistencePort<P> + 'static,
    Rec: SnapshotRecorder + 'static,
{
    let (sender, receiver) = mpsc::channel(inbox_capacity.max(1));
    let runtime = Runtime {
        machine_id: machine_id.clone(),
        machine_type: machine_type.into(),
        graph,
        entity,
        volatile,
        version,
        clock,
        persistence,
        recorder,
        scheduler,
        armed_timeout: None,
        self_sender: sender.downgrade(),
    };
    let task = tokio::spawn(run(runtime, receiver, hydrated));
    (MachineInstance { machine_id, sender }, task)
}

async fn run<P, V, C, Persist, Rec>(
    mut runtime: Runtime<P, V, C, Persist, Rec>,
    mut receiver: mpsc::Receiver<Envelope>,
    hydrated: bool,
) where
    P: PersistentEntity,
    V: Send + 'static,
    C: Clock + 'static,
    Persist: PersistencePort<P> + 'static,
    Rec: SnapshotRecorder + 'static,
{
    let mut first_event = true;

    // A freshly built or just-rehydrated machine already sits in some
    // state before any event is ever processed; if that state carries a
    // configured timeout, it must be armed now rather than waiting for a
    // transition that may never come (§4.3's timeout is a property of the
    // state, not of how the machine arrived there).
    if let Some(timeout_cfg) = runtime.graph.state(runtime.entity.current_state()).and_then(|d| d.timeout()) {
        let duration_ms = timeout_cfg.duration_ms;
        let target = timeout_cfg.target.clone();
        let clock_source = timeout_cfg.clock_source;
        runtime.arm_timeout(duration_ms, target, clock_source);
    }

    while let Some(envelope) = receiver.recv().await {
        let machine_hydrated_before = first_event && hydrated;
        first_event = false;

        if let Some(fired_id) = &envelope.fired_timeout_id {
            let still_live = runtime
                .armed_timeout
                .as_ref()
                .is_some_and(|armed| armed.matches(runtime.entity.current_state(), fired_id));
            if !still_live {
                debug!(
                    machine_id = %runtime.machine_id,
                    "discarding stale timeout firing"
                );
                let _ = envelope
                    .reply
                    .send(Ok(SendOutcome { became_complete: false, should_evict: false, hook_failed: false }));
                continue;
            }
        }

        let outcome =
            process_one(&mut runtime, envelope.event, machine_hydrated_before, &envelope).await;
        let should_evict = matches!(&outcome, Ok(o) if o.should_evict);
        let _ = envelope.reply.send(outcome);

        if should_evict {
            debug!(machine_id = %runtime.machine_id, "instance evicting itself after persist");
            break;
        }
    }
}

async fn process_one<P, V, C, Persist, Rec>(
    runtime: &mut Runtime<P, V, C, Persist, Rec>,
    event: Event,
    machine_hydrated_before: bool,
    envelope: &Envelope,
) -> Result<SendOutcome, InstanceSendError>
where
    P: PersistentEntity,
    V: Send + 'static,
    C: Clock + 'static,
    Persist: PersistencePort<P> + 'static,
    Rec: SnapshotRecorder + 'static,
{
    let registry_status_before = RegistryStatus::RegisteredActive;

    let inputs = TransitionInputs {
        graph: &runtime.graph,
        entity: &mut runtime.entity,
        volatile: &mut runtime.volatile,
        version: &mut runtime.version,
        clock: &runtime.clock,
        machine_type: &runtime.machine_type,
        run_id: envelope.run_id.clone(),
        correlation_id: envelope.correlation_id.clone(),
        debug_session_id: envelope.debug_session_id.clone(),
        registry_status_before,
        registry_status_after: registry_status_before,
        machine_hydrated_before,
    };

    let effect = transition::apply(inputs, &event)?;

    let TransitionEffect::Applied {
        mut record,
        cancel_armed_timeout,
        arm_timeout,
        evict_after_persist,
        became_complete,
        hook_failed,
        ..
    } = effect
    else {
        return Ok(SendOutcome { became_complete: false, should_evict: false, hook_failed: false });
    };

    if hook_failed {
        error!(machine_id = %runtime.machine_id, event = %event.name(), "hook panicked during transition");
    }

    if cancel_armed_timeout {
        if let Some(armed) = runtime.armed_timeout.take() {
            runtime.scheduler.cancel(armed.id());
        }
    }

    runtime
        .persistence
        .save(&runtime.machine_id, &runtime.entity)
        .await
        .map_err(crate::error::EngineError::from)?;

    if evict_after_persist {
        record.registry_status_after = RegistryStatus::NotRegistered;
    }
    runtime.recorder.record(record).await;

    if let Some(arm) = arm_timeout {
        runtime.arm_timeout(arm.duration_ms, arm.fallback_target, arm.clock_source);
    }

    Ok(SendOutcome { became_complete, should_evict: evict_after_persist, hook_failed })
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
