// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ambient internal counters, logged periodically via `tracing` and exposed
//! through [`EngineMetrics::snapshot`]. Not a monitoring dashboard — just an
//! in-process counter, never rendered or served on its own network port.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct EngineMetrics {
    machines_created: AtomicU64,
    transitions_executed: AtomicU64,
    evictions: AtomicU64,
    rehydrations: AtomicU64,
    hook_failures: AtomicU64,
    completions: AtomicU64,
}

/// A point-in-time copy of [`EngineMetrics`]'s counters, cheap to log or
/// hand to a caller without holding onto the atomics themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub machines_created: u64,
    pub transitions_executed: u64,
    pub evictions: u64,
    pub rehydrations: u64,
    pub hook_failures: u64,
    pub completions: u64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_machine_created(&self) {
        self.machines_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transition(&self) {
        self.transitions_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rehydration(&self) {
        self.rehydrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hook_failure(&self) {
        self.hook_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completion(&self) {
        self.completions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            machines_created: self.machines_created.load(Ordering::Relaxed),
            transitions_executed: self.transitions_executed.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            rehydrations: self.rehydrations.load(Ordering::Relaxed),
            hook_failures: self.hook_failures.load(Ordering::Relaxed),
            completions: self.completions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
