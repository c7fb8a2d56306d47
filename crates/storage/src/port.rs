// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persistence port (C6): the abstract load/save/exists/delete contract
//! the engine depends on, keyed by machine ID.

use async_trait::async_trait;
use fsm_core::{MachineId, PersistentEntity};

use crate::error::PersistenceError;

/// Implementations must apply `save` calls for the same ID in submission
/// order (they may batch, but must not reorder) and must treat `save` as an
/// atomic per-ID upsert. The engine assumes distinct IDs may be saved
/// concurrently without interference.
#[async_trait]
pub trait PersistencePort<P: PersistentEntity>: Send + Sync {
    async fn save(&self, id: &MachineId, entity: &P) -> Result<(), PersistenceError>;

    async fn load(&self, id: &MachineId) -> Result<Option<P>, PersistenceError>;

    async fn exists(&self, id: &MachineId) -> Result<bool, PersistenceError> {
        Ok(self.load(id).await?.is_some())
    }

    async fn delete(&self, id: &MachineId) -> Result<(), PersistenceError>;

    /// Derived from the loaded entity by default; implementations backed by
    /// a dedicated index may override this for a cheaper query.
    async fn is_complete(&self, id: &MachineId) -> Result<bool, PersistenceError> {
        Ok(self.load(id).await?.map(|e| e.is_complete()).unwrap_or(false))
    }
}
