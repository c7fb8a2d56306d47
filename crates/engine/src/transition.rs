// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transition engine (C4): resolves one event against one machine's
//! current state, runs hooks, mutates contexts, and produces the
//! [`fsm_wire::TransitionRecord`] that feeds monitoring. This module is
//! deliberately synchronous and I/O-free — persistence and recording are
//! async concerns owned by `crate::instance`'s event loop, which calls
//! [`apply`] once per dequeued event and then carries out whatever the
//! returned [`TransitionEffect`] asks for.

use std::panic::{self, AssertUnwindSafe};

use chrono::{SecondsFormat, Utc};

use fsm_core::{
    Clock, ClockSource, Event, MachineHandle, PersistentEntity, StateGraph, StateName,
};
use fsm_wire::record::RegistryStatus;
use fsm_wire::{hash_canonical_json, TransitionRecord};

use crate::error::EngineError;

/// A timeout the transition just entered should arm. Carries only what the
/// scheduler needs (`instance.rs` owns id generation and the armed-state
/// bookkeeping); the fallback target comes straight from the state
/// descriptor per §4.3.
pub struct TimeoutArm {
    pub duration_ms: u64,
    pub fallback_target: StateName,
    pub clock_source: ClockSource,
}

/// What [`apply`] asks the caller to do after a successful transition or
/// stay action. `record` is always ready to hand to a recorder; persistence
/// and timeout (re)arming are carried out by the caller so they can be
/// sequenced with the "persist before evict" contract in §4.4.
pub enum TransitionEffect {
    /// No transition or stay action matched (§4.4 step 6). Discarded; no
    /// error, no record.
    Unhandled,

    /// A transition or stay action ran. `state_changed` distinguishes the
    /// two paths for callers that care (both still emit a record and bump
    /// version; a same-state transition per §4.4's tie-break still counts
    /// as `state_changed`, since hooks ran and the target config applies).
    Applied {
        record: TransitionRecord,
        state_changed: bool,
        cancel_armed_timeout: bool,
        arm_timeout: Option<TimeoutArm>,
        evict_after_persist: bool,
        became_complete: bool,
        hook_failed: bool,
    },
}

/// Everything [`apply`] needs about the machine and the environment it runs
/// in. Borrowed for the duration of one call; the caller owns all of these
/// across calls.
pub struct TransitionInputs<'a, P, V, C> {
    pub graph: &'a StateGraph<P, V>,
    pub entity: &'a mut P,
    pub volatile: &'a mut V,
    pub version: &'a mut u64,
    pub clock: &'a C,
    pub machine_type: &'a str,
    pub run_id: Option<String>,
    pub correlation_id: Option<String>,
    pub debug_session_id: Option<String>,
    pub registry_status_before: RegistryStatus,
    pub registry_status_after: RegistryStatus,
    pub machine_hydrated_before: bool,
}

/// Runs one event against the machine described by `inputs` (§4.4).
///
/// Returns [`EngineError::MachineComplete`] without touching anything if
/// the entity is already complete (step 1: "event is not recorded").
/// Otherwise mutates `inputs.entity`/`inputs.volatile` in place and returns
/// a [`TransitionEffect`] describing what happened.
pub fn apply<P, V, C>(
    inputs: TransitionInputs<'_, P, V, C>,
    event: &Event,
) -> Result<TransitionEffect, EngineError>
where
    P: PersistentEntity,
    C: Clock,
{
    if inputs.entity.is_complete() {
        return Err(EngineError::MachineComplete);
    }

    let state_before = inputs.entity.current_state().clone();
    let state_desc = inputs
        .graph
        .state(&state_before)
        .unwrap_or_else(|| panic!("machine is in unknown state {state_before:?} for its graph"));

    let before_entity = inputs.entity.deep_copy();
    let before_json = before_entity.to_canonical_json().to_string();
    let before_hash = hash_canonical_json(&before_json);
    let start = inputs.clock.now();

    // Transition path: an explicit transition, or (for a timeout event) the
    // state's configured timeout fallback target (§4.3).
    let target_name = state_desc.transition_for(event.name()).cloned().or_else(|| {
        if event.is_timeout() {
            state_desc.timeout().map(|t| t.target.clone())
        } else {
            None
        }
    });

    if let Some(target_name) = target_name {
        let mut hook_failed = false;

        if let Some(exit) = state_desc.exit_hook() {
            let mut handle = MachineHandle::new(&mut *inputs.entity, &mut *inputs.volatile);
            if run_hook_catching_panics(exit, &mut handle).is_err() {
                hook_failed = true;
            }
        }

        inputs.entity.set_current_state(target_name.clone());
        inputs.entity.set_last_state_change_ms(inputs.clock.epoch_ms());
        *inputs.version += 1;
        inputs.entity.set_version(*inputs.version);

        let target_desc = inputs
            .graph
            .state(&target_name)
            .unwrap_or_else(|| panic!("transition target {target_name:?} missing from graph"));

        if let Some(entry) = target_desc.entry_hook() {
            let mut handle = MachineHandle::new(&mut *inputs.entity, &mut *inputs.volatile);
            if run_hook_catching_panics(entry, &mut handle).is_err() {
                hook_failed = true;
            }
        }

        let became_complete = target_desc.is_final();
        if became_complete {
            inputs.entity.set_complete(true);
        }

        let arm_timeout = target_desc.timeout().map(|t| TimeoutArm {
            duration_ms: t.duration_ms,
            fallback_target: t.target.clone(),
            clock_source: t.clock_source,
        });
        let evict_after_persist = target_desc.is_offline();

        let record = build_record(
            &inputs,
            event,
            state_before,
            target_name,
            &before_json,
            &before_hash,
            start,
            evict_after_persist,
        );

        Ok(TransitionEffect::Applied {
            record,
            state_changed: true,
            cancel_armed_timeout: true,
            arm_timeout,
            evict_after_persist,
            became_complete,
            hook_failed,
        })
    } else if let Some(stay) = state_desc.stay_action_for(event.name()) {
        let mut hook_failed = false;
        {
            let mut handle = MachineHandle::new(&mut *inputs.entity, &mut *inputs.volatile);
            if panic::catch_unwind(AssertUnwindSafe(|| stay(&mut handle, event))).is_err() {
                hook_failed = true;
            }
        }
        *inputs.version += 1;
        inputs.entity.set_version(*inputs.version);

        let record = build_record(
            &inputs,
            event,
            state_before.clone(),
            state_before,
            &before_json,
            &before_hash,
            start,
            false,
        );

        Ok(TransitionEffect::Applied {
            record,
            state_changed: false,
            cancel_armed_timeout: false,
            arm_timeout: None,
            evict_after_persist: false,
            became_complete: false,
            hook_failed,
        })
    } else {
        Ok(TransitionEffect::Unhandled)
    }
}

fn run_hook_catching_panics<P, V>(
    hook: &fsm_core::EntryHook<P, V>,
    handle: &mut MachineHandle<'_, P, V>,
) -> Result<(), ()> {
    panic::catch_unwind(AssertUnwindSafe(|| hook(handle))).map_err(|_| ())
}

#[allow(clippy::too_many_arguments)]
fn build_record<P, V, C>(
    inputs: &TransitionInputs<'_, P, V, C>,
    event: &Event,
    state_before: StateName,
    state_after: StateName,
    context_before_json: &str,
    context_before_hash: &str,
    start: std::time::Instant,
    state_offline: bool,
) -> TransitionRecord
where
    P: PersistentEntity,
    C: Clock,
{
    let after_json = inputs.entity.to_canonical_json().to_string();
    let after_hash = hash_canonical_json(&after_json);
    let duration_ms = inputs.clock.now().duration_since(start).as_millis() as u64;
    let wall_clock_timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    TransitionRecord {
        machine_id: inputs.entity.machine_id().clone(),
        machine_type: inputs.machine_type.to_string(),
        version: *inputs.version,
        state_before,
        state_after,
        event_name: event.name().clone(),
        event_payload: event.payload_json(),
        event_params: event.params_json(),
        context_before: context_before_json.to_string(),
        context_before_hash: context_before_hash.to_string(),
        context_after: after_json,
        context_after_hash: after_hash,
        transition_duration_ms: duration_ms,
        wall_clock_timestamp,
        run_id: inputs.run_id.clone().map(Into::into),
        correlation_id: inputs.correlation_id.clone().map(Into::into),
        debug_session_id: inputs.debug_session_id.clone().map(Into::into),
        machine_online: true,
        state_offline,
        registry_status_before: inputs.registry_status_before,
        registry_status_after: inputs.registry_status_after,
        machine_hydrated_before: inputs.machine_hydrated_before,
        machine_hydrated_after: false,
    }
}

#[cfg(test)]
#[path = "transition_tests.rs"]
mod tests;
