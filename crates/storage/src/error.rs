// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Failures from a [`crate::PersistencePort`] implementation. The engine
/// never swallows these — they propagate to the caller of the triggering
/// registry API (§7 of the design: `PersistenceError` is never retried
/// internally).
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("persistence I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("persistence (de)serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("persistence backend unavailable: {0}")]
    Unavailable(String),
}
