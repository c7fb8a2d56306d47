// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use serde_json::{json, Value};

use fsm_core::{StateGraphBuilder, StateName};

use super::*;

#[derive(Debug, Clone, PartialEq)]
struct Order {
    id: MachineId,
    state: StateName,
    last_change_ms: u64,
    complete: bool,
    version: u64,
}

impl fsm_core::PersistentEntity for Order {
    fn machine_id(&self) -> &MachineId {
        &self.id
    }
    fn current_state(&self) -> &StateName {
        &self.state
    }
    fn set_current_state(&mut self, state: StateName) {
        self.state = state;
    }
    fn last_state_change_ms(&self) -> u64 {
        self.last_change_ms
    }
    fn set_last_state_change_ms(&mut self, ts: u64) {
        self.last_change_ms = ts;
    }
    fn is_complete(&self) -> bool {
        self.complete
    }
    fn set_complete(&mut self, complete: bool) {
        self.complete = complete;
    }
    fn deep_copy(&self) -> Self {
        self.clone()
    }
    fn to_canonical_json(&self) -> Value {
        json!({"id": self.id.as_str()})
    }
    fn version(&self) -> u64 {
        self.version
    }
    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

fn graph() -> Arc<fsm_core::StateGraph<Order, u32>> {
    Arc::new(
        StateGraphBuilder::<Order, u32>::new()
            .initial("PENDING")
            .state("PENDING")
            .on("OrderPlaced", "SHIPPED")
            .done()
            .state("SHIPPED")
            .is_final()
            .done()
            .build()
            .expect("valid graph"),
    )
}

#[test]
fn closure_factory_builds_entity_and_volatile_context() {
    let factory = ClosureFactory::new(
        "order",
        graph(),
        |id: &MachineId| Order {
            id: id.clone(),
            state: StateName::new("PENDING"),
            last_change_ms: 0,
            complete: false,
            version: 0,
        },
        |entity: &Order| entity.version as u32 * 10,
    );

    let id = MachineId::new("ord-1");
    let entity = factory.new_entity(&id);
    assert_eq!(entity.machine_id().as_str(), "ord-1");
    assert_eq!(entity.current_state().as_str(), "PENDING");

    assert_eq!(factory.build_volatile(&entity), 0);
    assert_eq!(factory.machine_type(), "order");
    assert!(factory.graph().contains(&StateName::new("SHIPPED")));
}
