// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-machine timeout handle (C3). The scheduler that arms, cancels,
//! and fires these lives in the engine crate; this module only defines the
//! handle a [`crate::context`]-owning machine instance holds at most one of
//! at a time, and the "armed-in-state" tag that lets a late firing racing a
//! transition be told apart from a live one.

use crate::ids::StateName;

crate::define_id! {
    /// Identifies one scheduled timeout so the scheduler's priority queue and
    /// the owning machine can agree on which entry is being cancelled.
    pub struct TimeoutId("tmo-");
}

/// A single armed, single-shot timeout. `armed_in_state` is stamped at
/// schedule time; a firing is only honored if the machine is still in that
/// state when it is delivered (see [`TimeoutHandle::matches`]).
#[derive(Debug, Clone)]
pub struct TimeoutHandle {
    id: TimeoutId,
    armed_in_state: StateName,
    deadline_ms: u64,
    fallback_target: StateName,
}

impl TimeoutHandle {
    pub fn new(armed_in_state: StateName, deadline_ms: u64, fallback_target: StateName) -> Self {
        Self { id: TimeoutId::new(), armed_in_state, deadline_ms, fallback_target }
    }

    /// Builds a handle around an already-generated [`TimeoutId`] — used when
    /// the scheduler must be given the id up front (it is the scheduler's
    /// key for cancellation) rather than generating its own.
    pub fn with_id(
        id: TimeoutId,
        armed_in_state: StateName,
        deadline_ms: u64,
        fallback_target: StateName,
    ) -> Self {
        Self { id, armed_in_state, deadline_ms, fallback_target }
    }

    pub fn id(&self) -> &TimeoutId {
        &self.id
    }

    pub fn armed_in_state(&self) -> &StateName {
        &self.armed_in_state
    }

    pub fn deadline_ms(&self) -> u64 {
        self.deadline_ms
    }

    pub fn fallback_target(&self) -> &StateName {
        &self.fallback_target
    }

    /// A fired timeout is only delivered if the machine is still in the
    /// state that armed it; a cancellation racing the fire leaves the
    /// machine in some other state, and the late event must be discarded.
    pub fn matches(&self, current_state: &StateName, fired_id: &TimeoutId) -> bool {
        &self.id == fired_id && &self.armed_in_state == current_state
    }
}

#[cfg(test)]
#[path = "timeout_tests.rs"]
mod tests;
