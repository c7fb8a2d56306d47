// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The opaque string identifiers named throughout the registry's data model.

crate::define_string_id! {
    /// Identifies one addressable machine instance. Globally unique within a
    /// registry. Equals the machine's [`crate::context::PersistentEntity`] ID.
    pub struct MachineId;
}

crate::define_string_id! {
    /// Names one state within a single [`crate::graph::StateGraph`]. Unique
    /// within that graph; meaningless outside of it.
    pub struct StateName;
}

crate::define_string_id! {
    /// The stable string used for transition-table lookup. Two names are
    /// reserved: [`EventName::TIMEOUT`] and [`EventName::GENERIC`].
    pub struct EventName;
}

impl EventName {
    /// Synthetic event name used for timeout firings (see C3/C9 in the
    /// registry design: timeouts are delivered as ordinary events).
    pub const TIMEOUT: &'static str = "__timeout__";

    /// Reserved name for untyped, string-named events.
    pub const GENERIC: &'static str = "__generic__";

    pub fn timeout() -> Self {
        Self::new(Self::TIMEOUT)
    }

    pub fn generic() -> Self {
        Self::new(Self::GENERIC)
    }

    pub fn is_timeout(&self) -> bool {
        self.0 == Self::TIMEOUT
    }
}

crate::define_id! {
    /// Correlates a chain of events/transitions across machines for tracing.
    pub struct CorrelationId("cor-");
}

crate::define_id! {
    /// Identifies one live-debug websocket connection.
    pub struct DebugSessionId("dbg-");
}

crate::define_id! {
    /// Identifies one run of a caller-initiated operation (a single `send`,
    /// a batch import, a test scenario) for grouping transition records.
    pub struct RunId("run-");
}

#[cfg(test)]
#[path = "ids_tests.rs"]
mod tests;
