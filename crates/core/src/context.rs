// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The context model (C2): the persistent/volatile split every machine
//! carries. [`PersistentEntity`] is a trait, not a concrete struct, so the
//! engine runs generically over whatever domain record a caller plugs in
//! while still owning the handful of fields (state, timestamp, complete)
//! that the engine itself must read and write.

use serde_json::Value;

use crate::ids::{MachineId, StateName};

/// The durable per-machine record (§3). Implementors own their own domain
/// payload; the engine only ever touches the fields below.
pub trait PersistentEntity: Send + 'static {
    fn machine_id(&self) -> &MachineId;

    fn current_state(&self) -> &StateName;

    fn set_current_state(&mut self, state: StateName);

    /// Milliseconds since epoch of the last state change, per the registry's
    /// shared [`crate::clock::Clock`].
    fn last_state_change_ms(&self) -> u64;

    fn set_last_state_change_ms(&mut self, timestamp_ms: u64);

    fn is_complete(&self) -> bool;

    fn set_complete(&mut self, complete: bool);

    /// The transition version this entity was last written at. Persisted
    /// alongside the rest of the record (§6: "versioned last-write-wins on
    /// (id, version)") so a rehydrated machine resumes version numbering
    /// where the evicted one left off, instead of restarting at zero and
    /// breaking invariant 2 (strictly increasing, no gaps) across an
    /// eviction/rehydration boundary.
    fn version(&self) -> u64;

    fn set_version(&mut self, version: u64);

    /// An independent, value-equal copy used to snapshot "before" state for
    /// transition records. Must not alias any interior mutable state with
    /// `self`.
    fn deep_copy(&self) -> Self
    where
        Self: Sized;

    /// Canonical JSON encoding used for storage and for hashing transition
    /// snapshots. Two deep-equal entities must encode identically.
    fn to_canonical_json(&self) -> Value;
}

/// A factory that builds (or rebuilds, on rehydration) the volatile context
/// paired with a [`PersistentEntity`]. Volatile contexts are never
/// persisted; they are recreated from the just-loaded entity every time a
/// machine becomes live.
pub trait VolatileContextFactory<P: PersistentEntity, V>: Send + Sync {
    fn build(&self, entity: &P) -> V;
}

impl<P, V, F> VolatileContextFactory<P, V> for F
where
    P: PersistentEntity,
    F: Fn(&P) -> V + Send + Sync,
{
    fn build(&self, entity: &P) -> V {
        (self)(entity)
    }
}

/// Borrowed access to one machine's contexts, handed to hooks and stay
/// actions for the duration of a single transition. Hooks never see the
/// graph, the inbox, or other machines — only their own two contexts.
pub struct MachineHandle<'a, P, V> {
    entity: &'a mut P,
    volatile: &'a mut V,
}

impl<'a, P: PersistentEntity, V> MachineHandle<'a, P, V> {
    pub fn new(entity: &'a mut P, volatile: &'a mut V) -> Self {
        Self { entity, volatile }
    }

    pub fn entity(&self) -> &P {
        self.entity
    }

    pub fn entity_mut(&mut self) -> &mut P {
        self.entity
    }

    pub fn volatile(&self) -> &V {
        self.volatile
    }

    pub fn volatile_mut(&mut self) -> &mut V {
        self.volatile
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
