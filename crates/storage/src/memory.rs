// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory persistence: a `HashMap` behind a short-lived `parking_lot`
//! critical section. Used for tests and for machines whose durability
//! requirement is "survive eviction/rehydration within this process", not
//! "survive a restart".

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use fsm_core::{MachineId, PersistentEntity};

use crate::error::PersistenceError;
use crate::port::PersistencePort;

pub struct InMemoryPersistence<P> {
    entries: Mutex<HashMap<MachineId, P>>,
}

impl<P> Default for InMemoryPersistence<P> {
    fn default() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }
}

impl<P> InMemoryPersistence<P> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<P> PersistencePort<P> for InMemoryPersistence<P>
where
    P: PersistentEntity + Clone,
{
    async fn save(&self, id: &MachineId, entity: &P) -> Result<(), PersistenceError> {
        self.entries.lock().insert(id.clone(), entity.clone());
        Ok(())
    }

    async fn load(&self, id: &MachineId) -> Result<Option<P>, PersistenceError> {
        Ok(self.entries.lock().get(id).cloned())
    }

    async fn delete(&self, id: &MachineId) -> Result<(), PersistenceError> {
        self.entries.lock().remove(id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
