// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use fsm_core::{ClockSource, FakeClock};

use super::*;

/// Poll-cap worth of tokio-virtual time, enough to let the driver wake up
/// and re-check the clock at least once after a `FakeClock::advance`.
const WAKE: Duration = Duration::from_millis(POLL_INTERVAL_MS);

#[tokio::test(start_paused = true)]
async fn fires_callback_after_duration_elapses() {
    let clock = FakeClock::new();
    let scheduler = TimeoutScheduler::with_clock(clock.clone());
    let fired = Arc::new(Mutex::new(false));
    let fired_clone = fired.clone();

    scheduler.schedule(TimeoutId::new(), 100, move || {
        *fired_clone.lock() = true;
    });

    clock.advance(Duration::from_millis(101));
    tokio::time::advance(WAKE).await;
    tokio::task::yield_now().await;

    assert!(*fired.lock());
}

#[tokio::test(start_paused = true)]
async fn cancelled_timer_never_fires() {
    let clock = FakeClock::new();
    let scheduler = TimeoutScheduler::with_clock(clock.clone());
    let fired = Arc::new(Mutex::new(false));
    let fired_clone = fired.clone();
    let id = TimeoutId::new();

    scheduler.schedule(id.clone(), 100, move || {
        *fired_clone.lock() = true;
    });
    scheduler.cancel(&id);

    clock.advance(Duration::from_millis(200));
    tokio::time::advance(WAKE).await;
    tokio::task::yield_now().await;

    assert!(!*fired.lock());
}

#[tokio::test(start_paused = true)]
async fn fires_multiple_timers_in_deadline_order() {
    let clock = FakeClock::new();
    let scheduler = TimeoutScheduler::with_clock(clock.clone());
    let order = Arc::new(Mutex::new(Vec::new()));

    for (label, delay_ms) in [("b", 200u64), ("a", 100u64), ("c", 300u64)] {
        let order = order.clone();
        scheduler.schedule(TimeoutId::new(), delay_ms, move || {
            order.lock().push(label);
        });
    }

    clock.advance(Duration::from_millis(301));
    tokio::time::advance(WAKE).await;
    tokio::task::yield_now().await;

    assert_eq!(*order.lock(), vec!["a", "b", "c"]);
}

#[tokio::test(start_paused = true)]
async fn pending_count_reflects_armed_timers() {
    let scheduler = TimeoutScheduler::new();
    assert_eq!(scheduler.pending_count(), 0);

    let id = TimeoutId::new();
    scheduler.schedule(id.clone(), 1_000, || {});
    assert_eq!(scheduler.pending_count(), 1);

    scheduler.cancel(&id);
    assert_eq!(scheduler.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancelling_unknown_id_is_a_no_op() {
    let scheduler = TimeoutScheduler::new();
    scheduler.cancel(&TimeoutId::new());
    assert_eq!(scheduler.pending_count(), 0);
}

/// A timer armed with [`ClockSource::Wall`] is measured against the real
/// system clock even though the scheduler's own registry clock is a
/// `FakeClock` that never advances on its own — advancing the fake clock
/// must not affect it.
#[tokio::test(start_paused = true)]
async fn wall_clock_sourced_timer_ignores_registry_clock_advances() {
    let clock = FakeClock::new();
    let scheduler = TimeoutScheduler::with_clock(clock.clone());
    let fired = Arc::new(Mutex::new(false));
    let fired_clone = fired.clone();

    scheduler.schedule_with_source(TimeoutId::new(), 10_000, ClockSource::Wall, move || {
        *fired_clone.lock() = true;
    });

    // Advancing the registry's fake clock by a huge margin must not fire a
    // wall-clock-sourced timer.
    clock.advance(Duration::from_secs(3600));
    tokio::time::advance(WAKE).await;
    tokio::task::yield_now().await;
    assert!(!*fired.lock(), "a wall-clock timer must not react to the registry clock");
}
