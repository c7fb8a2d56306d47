// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-registry timeout scheduler (C3): `schedule(duration, callback) ->
//! handle` / `cancel(handle)` backed by a priority queue keyed on absolute
//! deadline, driven by a single background task (§4.3's "single-threaded
//! logical clock per registry"). Firings invoke the caller's callback
//! directly rather than dispatching onto a channel the scheduler owns —
//! callers (machine instances, in `instance.rs`) close over their own inbox
//! sender, keeping this module ignorant of the event envelope entirely.
//!
//! Deadlines are computed from the registry's own injected [`Clock`] (or,
//! for a state that opted into [`ClockSource::Wall`], the real system
//! clock regardless of what the registry was built with) — not from
//! `tokio::time::Instant` directly. That is what lets a whole registry's
//! timers be driven deterministically in tests by advancing a `FakeClock`,
//! the same style `fsm-engine`'s scheduler tests use. The driver still
//! wakes itself via `tokio::time::sleep`, capped at [`POLL_INTERVAL_MS`], so
//! it notices a `FakeClock::advance` the next time it wakes rather than
//! trusting a single long sleep computed against a clock that may jump
//! independently of real/virtual tokio time.
//!
//! Cancellation races a firing exactly as §4.3 describes: `cancel` only
//! removes the callback from the pending map, so a fire that already popped
//! its entry off the heap before `cancel` ran still executes — the
//! "armed-in-state" staleness check that discards it lives in the caller
//! (`crate::instance`), not here.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use fsm_core::{Clock, ClockSource, SystemClock, TimeoutId};

/// Upper bound on how long the driver ever sleeps before re-checking the
/// heap against the current clock reading. Keeps a `FakeClock::advance`
/// call visible to the driver within one poll tick instead of requiring it
/// to line up with whatever real/virtual duration was used to arm a timer.
const POLL_INTERVAL_MS: u64 = 25;

type Callback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Eq, PartialEq)]
struct Entry {
    deadline_ms: u64,
    wall: bool,
    id: TimeoutId,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.deadline_ms.cmp(&other.deadline_ms)
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

struct Inner {
    heap: BinaryHeap<Reverse<Entry>>,
    pending: HashMap<TimeoutId, Callback>,
}

/// A single-shot timer scheduler shared by every machine instance in one
/// registry. Dropping the scheduler aborts its background driver task.
/// Generic over the clock used for [`ClockSource::Registry`] deadlines;
/// defaults to [`SystemClock`] for production use — pass a `FakeClock` (the
/// same one the registry itself was built with) to get timers that only
/// ever advance when the test does.
pub struct TimeoutScheduler<C: Clock = SystemClock> {
    inner: Arc<Mutex<Inner>>,
    notify: Arc<Notify>,
    clock: C,
    wall_clock: SystemClock,
    driver: JoinHandle<()>,
}

impl TimeoutScheduler<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for TimeoutScheduler<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock + 'static> TimeoutScheduler<C> {
    pub fn with_clock(clock: C) -> Self {
        let inner = Arc::new(Mutex::new(Inner { heap: BinaryHeap::new(), pending: HashMap::new() }));
        let notify = Arc::new(Notify::new());
        let driver =
            tokio::spawn(drive(inner.clone(), notify.clone(), clock.clone(), SystemClock));
        Self { inner, notify, clock, wall_clock: SystemClock, driver }
    }

    /// Arms `id` to fire `callback` after `duration_ms`, measured against
    /// the registry's own clock. The caller chooses `id` (rather than the
    /// scheduler generating one) so it can be embedded in a
    /// [`fsm_core::TimeoutHandle`] up front and compared against the id a
    /// later firing reports.
    pub fn schedule(&self, id: TimeoutId, duration_ms: u64, callback: impl FnOnce() + Send + 'static) {
        self.schedule_with_source(id, duration_ms, ClockSource::Registry, callback)
    }

    pub fn schedule_with_source(
        &self,
        id: TimeoutId,
        duration_ms: u64,
        clock_source: ClockSource,
        callback: impl FnOnce() + Send + 'static,
    ) {
        let wall = clock_source == ClockSource::Wall;
        let now_ms = if wall { self.wall_clock.epoch_ms() } else { self.clock.epoch_ms() };
        let deadline_ms = now_ms + duration_ms;
        {
            let mut inner = self.inner.lock();
            inner.pending.insert(id.clone(), Box::new(callback));
            inner.heap.push(Reverse(Entry { deadline_ms, wall, id }));
        }
        self.notify.notify_one();
    }

    /// Removes `id`'s callback if it has not already fired. A no-op if `id`
    /// is unknown (already fired, already cancelled, or never scheduled).
    pub fn cancel(&self, id: &TimeoutId) {
        self.inner.lock().pending.remove(id);
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }
}

impl<C: Clock> Drop for TimeoutScheduler<C> {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn drive<C: Clock>(
    inner: Arc<Mutex<Inner>>,
    notify: Arc<Notify>,
    clock: C,
    wall_clock: SystemClock,
) {
    loop {
        let next = {
            let heap = inner.lock();
            heap.heap.peek().map(|Reverse(entry)| (entry.deadline_ms, entry.wall))
        };

        match next {
            None => notify.notified().await,
            Some((deadline_ms, wall)) => {
                let now_ms = if wall { wall_clock.epoch_ms() } else { clock.epoch_ms() };
                if deadline_ms > now_ms {
                    let remaining_ms = (deadline_ms - now_ms).min(POLL_INTERVAL_MS);
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(remaining_ms)) => {}
                        _ = notify.notified() => continue,
                    }
                }
            }
        }

        let due: Vec<Callback> = {
            let mut guard = inner.lock();
            let mut due = Vec::new();
            loop {
                let Some(Reverse(entry)) = guard.heap.peek() else { break };
                let now_ms = if entry.wall { wall_clock.epoch_ms() } else { clock.epoch_ms() };
                if entry.deadline_ms > now_ms {
                    break;
                }
                let Reverse(entry) = guard.heap.pop().expect("just peeked");
                if let Some(callback) = guard.pending.remove(&entry.id) {
                    due.push(callback);
                }
            }
            due
        };

        for callback in due {
            callback();
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
