// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fsm-recorder: the snapshot recorder port (C7) and its reference
//! implementations. The engine emits one [`fsm_wire::TransitionRecord`] per
//! completed transition through this port; recording is always best-effort
//! (§4.7 — a recorder failure is logged but never aborts a transition).

pub mod fanout;
pub mod port;
pub mod redact;
pub mod ring;

pub use fanout::FanOutRecorder;
pub use port::SnapshotRecorder;
pub use redact::RedactingRecorder;
pub use ring::RingRecorder;
