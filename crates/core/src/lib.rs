// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fsm-core: the state graph, context model, event envelope, and ID/clock
//! primitives shared by every other crate in the registry workspace.

pub mod macros;

pub mod clock;
pub mod context;
pub mod event;
pub mod graph;
pub mod id;
pub mod ids;
pub mod timeout;

#[cfg(any(test, feature = "test-support"))]
pub mod proptest_support;

pub use clock::{Clock, ClockSource, FakeClock, SystemClock};
pub use context::{MachineHandle, PersistentEntity, VolatileContextFactory};
pub use event::Event;
pub use graph::{
    EntryHook, ExitHook, InvalidGraph, StateBuilder, StateDescriptor, StateGraph,
    StateGraphBuilder, StayAction, TimeoutSpec,
};
pub use id::{short, IdBuf, ID_MAX_LEN};
pub use ids::{CorrelationId, DebugSessionId, EventName, MachineId, RunId, StateName};
pub use timeout::{TimeoutHandle, TimeoutId};
