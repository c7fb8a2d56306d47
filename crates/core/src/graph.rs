// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The state graph (C1): an immutable, build-time-validated description of a
//! machine type. Transitions are keyed by [`EventName`] rather than by event
//! type, so the graph can be built once and shared (read-only) across every
//! live instance of that machine type.

use std::collections::HashMap;

use thiserror::Error;

use crate::clock::ClockSource;
use crate::context::MachineHandle;
use crate::event::Event;
use crate::ids::{EventName, StateName};

/// Entry/exit hooks run once per transition into/out of a state. Stay
/// actions run in place of a transition when the current state registers one
/// for the incoming event name.
pub type EntryHook<P, V> = Box<dyn for<'a> Fn(&mut MachineHandle<'a, P, V>) + Send + Sync>;
pub type ExitHook<P, V> = EntryHook<P, V>;
pub type StayAction<P, V> =
    Box<dyn for<'a> Fn(&mut MachineHandle<'a, P, V>, &Event) + Send + Sync>;

/// A state's configured single-shot timeout: fires after `duration_ms` in
/// this state unless cancelled by an earlier exit, landing on `target` if no
/// other transition has already moved the machine elsewhere. `clock_source`
/// picks which clock the duration is measured against (§3's timeout tuple);
/// it defaults to the registry's own clock, so a graph that never opts into
/// [`ClockSource::Wall`] behaves exactly as before.
#[derive(Debug, Clone)]
pub struct TimeoutSpec {
    pub duration_ms: u64,
    pub target: StateName,
    pub clock_source: ClockSource,
}

/// One state's full behavioral description. Immutable once built.
pub struct StateDescriptor<P, V> {
    name: StateName,
    entry_hook: Option<EntryHook<P, V>>,
    exit_hook: Option<ExitHook<P, V>>,
    timeout: Option<TimeoutSpec>,
    offline: bool,
    is_final: bool,
    transitions: HashMap<EventName, StateName>,
    stay_actions: HashMap<EventName, StayAction<P, V>>,
}

impl<P, V> StateDescriptor<P, V> {
    pub fn name(&self) -> &StateName {
        &self.name
    }

    pub fn entry_hook(&self) -> Option<&EntryHook<P, V>> {
        self.entry_hook.as_ref()
    }

    pub fn exit_hook(&self) -> Option<&ExitHook<P, V>> {
        self.exit_hook.as_ref()
    }

    pub fn timeout(&self) -> Option<&TimeoutSpec> {
        self.timeout.as_ref()
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// Resolves the target state for an event name, if this state declares a
    /// transition for it.
    pub fn transition_for(&self, event: &EventName) -> Option<&StateName> {
        self.transitions.get(event)
    }

    pub fn stay_action_for(&self, event: &EventName) -> Option<&StayAction<P, V>> {
        self.stay_actions.get(event)
    }

    pub fn has_transition(&self, event: &EventName) -> bool {
        self.transitions.contains_key(event)
    }

    /// All event-triggered transitions out of this state, for deriving the
    /// live-debug server's "supported events + transitions" broadcast from
    /// the static graph (§4.8/§6) without exposing the transition table
    /// itself.
    pub fn transitions(&self) -> impl Iterator<Item = (&EventName, &StateName)> {
        self.transitions.iter()
    }
}

/// Build-time validation failures. Rejects a graph before any machine can be
/// constructed from it — the engine only ever sees graphs that passed.
#[derive(Debug, Error)]
pub enum InvalidGraph {
    #[error("state {0:?} is defined more than once")]
    DuplicateState(String),

    #[error("state {from:?} transitions on {event:?} to undefined state {target:?}")]
    UnknownTransitionTarget { from: String, event: String, target: String },

    #[error("no initial state was named")]
    MissingInitialState,

    #[error("initial state {0:?} is not defined")]
    UnknownInitialState(String),

    #[error("final state {0:?} declares an outgoing transition on {1:?}")]
    FinalStateHasOutgoingTransition(String, String),
}

/// The immutable, shared description of one machine type. Built once via
/// [`StateGraphBuilder`], then referenced (never mutated) by every
/// [`crate::context::MachineHandle`] built from it.
pub struct StateGraph<P, V> {
    initial: StateName,
    states: HashMap<StateName, StateDescriptor<P, V>>,
}

impl<P, V> StateGraph<P, V> {
    pub fn initial_state(&self) -> &StateName {
        &self.initial
    }

    pub fn state(&self, name: &StateName) -> Option<&StateDescriptor<P, V>> {
        self.states.get(name)
    }

    pub fn contains(&self, name: &StateName) -> bool {
        self.states.contains_key(name)
    }
}

/// Builder for [`StateGraph`]. States are added with [`StateGraphBuilder::state`],
/// which returns a [`StateBuilder`] for fluent per-state configuration.
#[derive(Default)]
pub struct StateGraphBuilder<P, V> {
    initial: Option<StateName>,
    states: HashMap<StateName, StateDescriptor<P, V>>,
    order: Vec<StateName>,
    pending_error: Option<InvalidGraph>,
}

impl<P, V> StateGraphBuilder<P, V> {
    pub fn new() -> Self {
        Self { initial: None, states: HashMap::new(), order: Vec::new(), pending_error: None }
    }

    pub fn initial(mut self, name: impl Into<StateName>) -> Self {
        self.initial = Some(name.into());
        self
    }

    /// Begin describing a state. Finishing the returned [`StateBuilder`]
    /// (by dropping it or calling [`StateBuilder::done`]) registers it.
    pub fn state(mut self, name: impl Into<StateName>) -> StateBuilder<P, V> {
        let name = name.into();
        self.order.push(name.clone());
        StateBuilder {
            parent: self,
            descriptor: StateDescriptor {
                name,
                entry_hook: None,
                exit_hook: None,
                timeout: None,
                offline: false,
                is_final: false,
                transitions: HashMap::new(),
                stay_actions: HashMap::new(),
            },
        }
    }

    pub fn build(mut self) -> Result<StateGraph<P, V>, InvalidGraph> {
        if let Some(err) = self.pending_error.take() {
            return Err(err);
        }
        let initial = self.initial.take().ok_or(InvalidGraph::MissingInitialState)?;
        if !self.states.contains_key(&initial) {
            return Err(InvalidGraph::UnknownInitialState(initial.as_str().to_string()));
        }
        for name in &self.order {
            let desc = &self.states[name];
            for (event, target) in &desc.transitions {
                if !self.states.contains_key(target) {
                    return Err(InvalidGraph::UnknownTransitionTarget {
                        from: name.as_str().to_string(),
                        event: event.as_str().to_string(),
                        target: target.as_str().to_string(),
                    });
                }
            }
            if desc.is_final && !desc.transitions.is_empty() {
                let (event, _) = desc.transitions.iter().next().expect("non-empty");
                return Err(InvalidGraph::FinalStateHasOutgoingTransition(
                    name.as_str().to_string(),
                    event.as_str().to_string(),
                ));
            }
        }
        Ok(StateGraph { initial, states: self.states })
    }

    fn insert(&mut self, descriptor: StateDescriptor<P, V>) -> Result<(), InvalidGraph> {
        if self.states.contains_key(&descriptor.name) {
            return Err(InvalidGraph::DuplicateState(descriptor.name.as_str().to_string()));
        }
        self.states.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }
}

/// Fluent configuration for one state, returned by [`StateGraphBuilder::state`].
pub struct StateBuilder<P, V> {
    parent: StateGraphBuilder<P, V>,
    descriptor: StateDescriptor<P, V>,
}

impl<P, V> StateBuilder<P, V> {
    pub fn on_entry(
        mut self,
        hook: impl for<'a> Fn(&mut MachineHandle<'a, P, V>) + Send + Sync + 'static,
    ) -> Self {
        self.descriptor.entry_hook = Some(Box::new(hook));
        self
    }

    pub fn on_exit(
        mut self,
        hook: impl for<'a> Fn(&mut MachineHandle<'a, P, V>) + Send + Sync + 'static,
    ) -> Self {
        self.descriptor.exit_hook = Some(Box::new(hook));
        self
    }

    /// Arms this state's timeout against the registry's own clock (the
    /// common case). Use [`StateBuilder::timeout_with_clock_source`] to pin
    /// it to the real wall clock instead.
    pub fn timeout(mut self, duration_ms: u64, target: impl Into<StateName>) -> Self {
        self.timeout_with_clock_source(duration_ms, target, ClockSource::Registry)
    }

    pub fn timeout_with_clock_source(
        mut self,
        duration_ms: u64,
        target: impl Into<StateName>,
        clock_source: ClockSource,
    ) -> Self {
        self.descriptor.timeout = Some(TimeoutSpec { duration_ms, target: target.into(), clock_source });
        self
    }

    pub fn offline(mut self) -> Self {
        self.descriptor.offline = true;
        self
    }

    pub fn is_final(mut self) -> Self {
        self.descriptor.is_final = true;
        self
    }

    pub fn on(mut self, event: impl Into<EventName>, target: impl Into<StateName>) -> Self {
        self.descriptor.transitions.insert(event.into(), target.into());
        self
    }

    pub fn stay_on(
        mut self,
        event: impl Into<EventName>,
        action: impl for<'a> Fn(&mut MachineHandle<'a, P, V>, &Event) + Send + Sync + 'static,
    ) -> Self {
        self.descriptor.stay_actions.insert(event.into(), Box::new(action));
        self
    }

    /// Registers this state with the parent builder and returns it so
    /// `.state(...).on(...).done().state(...)` chains fluently.
    pub fn done(self) -> StateGraphBuilder<P, V> {
        let StateBuilder { mut parent, descriptor } = self;
        if parent.pending_error.is_none() {
            if let Err(err) = parent.insert(descriptor) {
                parent.pending_error = Some(err);
            }
        }
        parent
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
