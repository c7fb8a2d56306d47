// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The factory contract (§6): "a zero-argument function that, when invoked,
//! returns a freshly built machine instance whose entity ID equals the
//! requested ID, whose graph is bound, and which has a registered
//! rehydration callback invoked by the registry immediately after loading
//! the persisted entity."
//!
//! Concretely, one [`MachineFactory`] is bound to one machine *type*: it
//! hands back the shared, immutable graph for that type (built once,
//! cloned cheaply via `Arc` into every instance), and the two functions the
//! registry calls at its two construction points — `new_entity` for a
//! never-before-seen ID, `build_volatile` both for a brand new machine and
//! as the rehydration callback once a persisted entity has been loaded.

use std::sync::Arc;

use fsm_core::{MachineId, PersistentEntity, StateGraph};

/// Builds machines of one type. Registered once with a [`crate::Registry`]
/// and reused across every `create_or_get`/`send` for that registry — the
/// registry is generic over exactly one `(P, V)` pair per instance, and the
/// StateGraph is shared (immutable) across every instance built from the
/// same factory (§3 Ownership).
pub trait MachineFactory<P: PersistentEntity, V>: Send + Sync {
    /// The label stamped on every `TransitionRecord` this factory's machines
    /// produce (`machine_type` in §3/§6).
    fn machine_type(&self) -> &str;

    /// The shared, immutable state graph bound to this factory's machines.
    fn graph(&self) -> &Arc<StateGraph<P, V>>;

    /// Builds a brand-new entity for `id`, seeded at the graph's initial
    /// state. Called only by `create_or_get` the first time an ID is seen
    /// (no live instance, nothing persisted).
    fn new_entity(&self, id: &MachineId) -> P;

    /// The volatile-context factory (§4.2): invoked once when a machine
    /// becomes live, whether brand new or rehydrated from a just-loaded
    /// entity. This *is* the "rehydration callback" `onRehydration` in §6 —
    /// the order of operations (load → adopt persisted state → call this)
    /// is the contract, not a separate method.
    fn build_volatile(&self, entity: &P) -> V;
}

/// A [`MachineFactory`] built from three plain closures, for call sites that
/// do not want to name a dedicated type per machine type.
pub struct ClosureFactory<P, V, NewEntity, BuildVolatile> {
    machine_type: String,
    graph: Arc<StateGraph<P, V>>,
    new_entity: NewEntity,
    build_volatile: BuildVolatile,
}

impl<P, V, NewEntity, BuildVolatile> ClosureFactory<P, V, NewEntity, BuildVolatile>
where
    P: PersistentEntity,
    NewEntity: Fn(&MachineId) -> P + Send + Sync,
    BuildVolatile: Fn(&P) -> V + Send + Sync,
{
    pub fn new(
        machine_type: impl Into<String>,
        graph: Arc<StateGraph<P, V>>,
        new_entity: NewEntity,
        build_volatile: BuildVolatile,
    ) -> Self {
        Self { machine_type: machine_type.into(), graph, new_entity, build_volatile }
    }
}

impl<P, V, NewEntity, BuildVolatile> MachineFactory<P, V>
    for ClosureFactory<P, V, NewEntity, BuildVolatile>
where
    P: PersistentEntity,
    V: Send,
    NewEntity: Fn(&MachineId) -> P + Send + Sync,
    BuildVolatile: Fn(&P) -> V + Send + Sync,
{
    fn machine_type(&self) -> &str {
        &self.machine_type
    }

    fn graph(&self) -> &Arc<StateGraph<P, V>> {
        &self.graph
    }

    fn new_entity(&self, id: &MachineId) -> P {
        (self.new_entity)(id)
    }

    fn build_volatile(&self, entity: &P) -> V {
        (self.build_volatile)(entity)
    }
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
