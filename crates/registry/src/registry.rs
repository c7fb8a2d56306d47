// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The registry (C8): the directory of live machines, the create/get/evict/
//! rehydrate lifecycle, and the front door every external caller dispatches
//! events through. One [`Registry`] is bound to exactly one machine type —
//! the shared graph and the `(P, V)` pair come from its [`MachineFactory`]
//! (§3 Ownership: "the StateGraph is shared across instances built from the
//! same factory").

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

use fsm_core::{Clock, Event, MachineId, PersistentEntity, SystemClock};
use fsm_engine::{spawn, MachineInstance, SendOutcome, TimeoutScheduler};
use fsm_recorder::{RingRecorder, SnapshotRecorder};
use fsm_storage::PersistencePort;
use fsm_wire::TransitionRecord;

use crate::config::{DebugFlags, RegistryConfig};
use crate::error::RegistryError;
use crate::factory::MachineFactory;
use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::recorder_gate::DebugGatedRecorder;

struct LiveEntry {
    instance: MachineInstance,
    task: JoinHandle<()>,
}

/// What [`Registry::create_or_get`] hands back (§4.8). A machine that has
/// already reached a final state never gets a live instance rebuilt for it
/// (§4.10) — `Complete` carries just enough to reject a `send` the same way
/// a live instance's own `MachineComplete` rejection would, without paying
/// for a rehydration that would be thrown away immediately.
pub enum MachineRef {
    Live(MachineInstance),
    Complete(MachineId),
}

impl MachineRef {
    pub fn machine_id(&self) -> &MachineId {
        match self {
            MachineRef::Live(instance) => instance.machine_id(),
            MachineRef::Complete(id) => id,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, MachineRef::Complete(_))
    }
}

/// The registry (§4.8). Generic over the entity/volatile-context pair its
/// bound [`MachineFactory`] produces, the persistence and recorder ports it
/// was constructed with, and the clock (defaulted to [`SystemClock`],
/// overridable for tests with [`fsm_core::FakeClock`] the same way
/// `fsm-engine`'s own tests do).
pub struct Registry<P, V, F, Persist, Rec, C = SystemClock>
where
    P: PersistentEntity + Clone,
    V: Send + 'static,
    F: MachineFactory<P, V> + 'static,
    Persist: PersistencePort<P> + 'static,
    Rec: SnapshotRecorder + 'static,
    C: Clock + 'static,
{
    factory: Arc<F>,
    persistence: Arc<Persist>,
    recorder: Arc<DebugGatedRecorder<Rec>>,
    scheduler: Arc<TimeoutScheduler<C>>,
    clock: C,
    config: RegistryConfig,
    metrics: Arc<EngineMetrics>,

    live: Mutex<HashMap<MachineId, LiveEntry>>,
    complete_ids: Mutex<HashSet<MachineId>>,
    shutting_down: AtomicBool,

    snapshot_debug: Arc<AtomicBool>,
    live_debug: Arc<AtomicBool>,
    live_debug_port: Mutex<Option<u16>>,
    live_debug_task: Mutex<Option<JoinHandle<()>>>,
    ring: Arc<RingRecorder>,
    broadcast_tx: broadcast::Sender<TransitionRecord>,

    _volatile: std::marker::PhantomData<fn() -> V>,
}

impl<P, V, F, Persist, Rec> Registry<P, V, F, Persist, Rec, SystemClock>
where
    P: PersistentEntity + Clone,
    V: Send + 'static,
    F: MachineFactory<P, V> + 'static,
    Persist: PersistencePort<P> + 'static,
    Rec: SnapshotRecorder + 'static,
{
    pub fn new(factory: F, persistence: Persist, recorder: Rec, config: RegistryConfig) -> Arc<Self> {
        Self::with_clock(factory, persistence, recorder, config, SystemClock)
    }
}

impl<P, V, F, Persist, Rec, C> Registry<P, V, F, Persist, Rec, C>
where
    P: PersistentEntity + Clone,
    V: Send + 'static,
    F: MachineFactory<P, V> + 'static,
    Persist: PersistencePort<P> + 'static,
    Rec: SnapshotRecorder + 'static,
    C: Clock + 'static,
{
    pub fn with_clock(
        factory: F,
        persistence: Persist,
        recorder: Rec,
        config: RegistryConfig,
        clock: C,
    ) -> Arc<Self> {
        let ring = Arc::new(RingRecorder::new(config.debug_ring_capacity));
        let (broadcast_tx, _) = broadcast::channel(config.debug_ring_capacity.max(16));
        // Both flags start disabled regardless of the config passed in —
        // `DebugFlags::default()` is the single source of truth for that
        // initial state, shared with what `Registry::debug_flags()` reports
        // back as a snapshot once the atomics start changing underneath it.
        let initial_flags = DebugFlags::default();
        let snapshot_debug = Arc::new(AtomicBool::new(initial_flags.snapshot_debug));
        let live_debug = Arc::new(AtomicBool::new(initial_flags.live_debug_enabled()));
        let recorder = Arc::new(DebugGatedRecorder::new(
            recorder,
            ring.clone(),
            broadcast_tx.clone(),
            snapshot_debug.clone(),
            live_debug.clone(),
        ));

        Arc::new(Self {
            factory: Arc::new(factory),
            persistence: Arc::new(persistence),
            recorder,
            scheduler: Arc::new(TimeoutScheduler::with_clock(clock.clone())),
            clock,
            config,
            metrics: Arc::new(EngineMetrics::new()),
            live: Mutex::new(HashMap::new()),
            complete_ids: Mutex::new(HashSet::new()),
            shutting_down: AtomicBool::new(false),
            snapshot_debug,
            live_debug,
            live_debug_port: Mutex::new(initial_flags.live_debug_port),
            live_debug_task: Mutex::new(None),
            ring,
            broadcast_tx,
            _volatile: std::marker::PhantomData,
        })
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub(crate) fn factory(&self) -> &Arc<F> {
        &self.factory
    }

    /// The in-memory ring fed by `snapshot_debug` — empty until
    /// [`Registry::enable_snapshot_debug`] is called, regardless of how many
    /// transitions have already run.
    pub fn ring(&self) -> &Arc<RingRecorder> {
        &self.ring
    }

    pub(crate) fn broadcast_subscribe(&self) -> broadcast::Receiver<TransitionRecord> {
        self.broadcast_tx.subscribe()
    }

    /// The persistence port this registry was constructed with.
    pub fn persistence(&self) -> &Arc<Persist> {
        &self.persistence
    }

    pub(crate) fn epoch_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }

    /// §4.8: if a live instance exists, return it. Else if persistence
    /// reports the id complete, return the sentinel. Else if persistence
    /// has an entity, rehydrate it. Else build a brand-new one via the
    /// bound factory and persist its initial entity.
    pub async fn create_or_get(&self, id: impl Into<MachineId>) -> Result<MachineRef, RegistryError> {
        let id = id.into();

        if let Some(entry) = self.live.lock().get(&id) {
            return Ok(MachineRef::Live(entry.instance.clone()));
        }

        if self.complete_ids.lock().contains(&id) {
            return Ok(MachineRef::Complete(id));
        }
        if self.persistence.is_complete(&id).await? {
            self.complete_ids.lock().insert(id.clone());
            return Ok(MachineRef::Complete(id));
        }

        if let Some(entity) = self.persistence.load(&id).await? {
            return Ok(MachineRef::Live(self.hydrate(id, entity, true).await?));
        }

        let entity = self.factory.new_entity(&id);
        self.persistence.save(&id, &entity).await?;
        self.metrics.record_machine_created();
        Ok(MachineRef::Live(self.hydrate(id, entity, false).await?))
    }

    /// Builds the volatile context (the rehydration callback from §4.2/§6,
    /// invoked "immediately after loading the persisted entity" whether the
    /// entity is brand new or just-loaded) and spawns the instance task.
    async fn hydrate(
        &self,
        id: MachineId,
        entity: P,
        hydrated: bool,
    ) -> Result<MachineInstance, RegistryError> {
        let volatile = self.factory.build_volatile(&entity);
        let version = entity.version();
        let (instance, task) = spawn(
            id.clone(),
            self.factory.machine_type().to_string(),
            self.factory.graph().clone(),
            entity,
            volatile,
            version,
            self.clock.clone(),
            self.persistence.clone(),
            self.recorder.clone(),
            self.scheduler.clone(),
            self.config.inbox_capacity,
            hydrated,
        );
        if hydrated {
            self.metrics.record_rehydration();
        }
        self.live.lock().insert(id, LiveEntry { instance: instance.clone(), task });
        Ok(instance)
    }

    /// §4.8 `send`: locate or rehydrate, then enqueue. Blocks only until
    /// enqueued, not until processed — but this API awaits the reply, per
    /// the reading recorded in `fsm_engine::instance` and DESIGN.md.
    pub async fn send(&self, id: impl Into<MachineId>, event: Event) -> Result<SendOutcome, RegistryError> {
        self.send_with(id, event, None, None, None).await
    }

    pub async fn send_with(
        &self,
        id: impl Into<MachineId>,
        event: Event,
        run_id: Option<String>,
        correlation_id: Option<String>,
        debug_session_id: Option<String>,
    ) -> Result<SendOutcome, RegistryError> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(RegistryError::UnknownMachine);
        }

        let id = id.into();
        let handle = self.create_or_get(id.clone()).await?;
        let MachineRef::Live(instance) = handle else {
            return Err(RegistryError::MachineComplete);
        };

        match instance.send_with(event, run_id, correlation_id, debug_session_id).await {
            Ok(outcome) => {
                self.metrics.record_transition();
                if outcome.hook_failed {
                    self.metrics.record_hook_failure();
                }
                if outcome.became_complete {
                    self.metrics.record_completion();
                    self.complete_ids.lock().insert(id.clone());
                }
                if outcome.should_evict {
                    self.metrics.record_eviction();
                    self.live.lock().remove(&id);
                }
                Ok(outcome)
            }
            Err(err) => {
                // The instance may have just evicted itself between our
                // lookup and this send; it may be rehydrated immediately on
                // the next event. Clean up our bookkeeping and surface the
                // error; the caller can retry, which will rehydrate.
                self.live.lock().remove(&id);
                Err(err.into())
            }
        }
    }

    pub async fn is_complete(&self, id: &MachineId) -> Result<bool, RegistryError> {
        if self.complete_ids.lock().contains(id) {
            return Ok(true);
        }
        Ok(self.persistence.is_complete(id).await?)
    }

    /// §4.8 `evict`: drop the live instance. Its task exits once the last
    /// sender clone (held only by the removed [`MachineInstance`]) is
    /// dropped; a timeout that was armed against it fires into a now-dead
    /// channel and is silently swallowed (`instance::process_one`'s
    /// weak-sender upgrade fails) — see DESIGN.md for why this satisfies
    /// §4.3's cancellation contract without the registry tracking timeout
    /// ids itself. Persistence state is untouched.
    pub fn evict(&self, id: &MachineId) {
        if self.live.lock().remove(id).is_some() {
            self.metrics.record_eviction();
        }
    }

    /// §4.8 `delete`: evict, then remove the persisted entity entirely.
    pub async fn delete(&self, id: &MachineId) -> Result<(), RegistryError> {
        self.evict(id);
        self.complete_ids.lock().remove(id);
        self.persistence.delete(id).await?;
        Ok(())
    }

    /// §4.8 `shutdown`: stop accepting new events, wait up to the
    /// configured drain deadline for in-flight instance tasks to finish
    /// processing their queued events, then drop everything still running.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        self.disable_live_debug();

        let entries: Vec<LiveEntry> = self.live.lock().drain().map(|(_, e)| e).collect();
        let deadline = self.config.shutdown_drain_deadline;
        for LiveEntry { instance, task } in entries {
            // Drop the instance handle (the task's one remaining `mpsc`
            // sender clone) before awaiting its task: the event loop only
            // exits once `recv()` observes every sender dropped, so holding
            // onto `instance` here would make every shutdown wait out the
            // full deadline instead of returning as soon as the queue drains.
            drop(instance);
            if tokio::time::timeout(deadline, task).await.is_err() {
                warn!("registry shutdown: instance task did not drain within deadline");
            }
        }
    }

    pub fn enable_snapshot_debug(&self) {
        self.snapshot_debug.store(true, Ordering::Relaxed);
    }

    pub fn disable_snapshot_debug(&self) {
        self.snapshot_debug.store(false, Ordering::Relaxed);
    }

    pub fn snapshot_debug_enabled(&self) -> bool {
        self.snapshot_debug.load(Ordering::Relaxed)
    }

    pub fn live_debug_port(&self) -> Option<u16> {
        *self.live_debug_port.lock()
    }

    /// A snapshot of both debug flags as one value, the same shape callers
    /// configure at construction time via [`RegistryConfig`]-adjacent
    /// [`DebugFlags`] — useful for logging or exposing current debug state
    /// over an admin endpoint without reading the two flags separately.
    pub fn debug_flags(&self) -> DebugFlags {
        DebugFlags {
            snapshot_debug: self.snapshot_debug_enabled(),
            live_debug_port: self.live_debug_port(),
        }
    }

    pub fn disable_all_debug(&self) {
        self.disable_snapshot_debug();
        self.disable_live_debug();
    }

    fn disable_live_debug(&self) {
        self.live_debug.store(false, Ordering::Relaxed);
        *self.live_debug_port.lock() = None;
        if let Some(task) = self.live_debug_task.lock().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
