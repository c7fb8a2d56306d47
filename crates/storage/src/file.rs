// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed persistence: one JSON file per machine ID under a root
//! directory, written atomically (temp file + rename) with the previous
//! contents rotated into `.bak`/`.bak.2`/`.bak.3` on overwrite.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use fsm_core::{MachineId, PersistentEntity};

use crate::error::PersistenceError;
use crate::port::PersistencePort;

pub struct FilePersistence {
    root: PathBuf,
}

impl FilePersistence {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, id: &MachineId) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_filename(id.as_str())))
    }
}

/// Replaces filesystem-unsafe characters so an arbitrary `MachineId` maps to
/// a single, collision-free path component without touching its other
/// bytes. Machine IDs are opaque per the data model, so this must not
/// assume any particular alphabet.
fn sanitize_filename(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect()
}

/// Rotates `path`'s existing contents into `.bak`, pushing any prior `.bak`
/// into `.bak.2` and any prior `.bak.2` into `.bak.3`, dropping the oldest.
/// Mirrors the daemon's snapshot-backup convention: at most three
/// generations are kept.
async fn rotate_bak_path(path: &Path) -> Result<(), PersistenceError> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(());
    }
    let bak3 = with_suffix(path, "bak.3");
    let bak2 = with_suffix(path, "bak.2");
    let bak1 = with_suffix(path, "bak");

    if tokio::fs::try_exists(&bak2).await? {
        tokio::fs::rename(&bak2, &bak3).await?;
    }
    if tokio::fs::try_exists(&bak1).await? {
        tokio::fs::rename(&bak1, &bak2).await?;
    }
    tokio::fs::rename(path, &bak1).await?;
    Ok(())
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
    name.push('.');
    name.push_str(suffix);
    path.with_file_name(name)
}

#[async_trait]
impl<P> PersistencePort<P> for FilePersistence
where
    P: PersistentEntity + Serialize + DeserializeOwned,
{
    async fn save(&self, id: &MachineId, entity: &P) -> Result<(), PersistenceError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(id);
        let tmp = with_suffix(&path, "tmp");
        let json = serde_json::to_vec_pretty(entity)?;
        tokio::fs::write(&tmp, &json).await?;
        rotate_bak_path(&path).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn load(&self, id: &MachineId) -> Result<Option<P>, PersistenceError> {
        let path = self.path_for(id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: &MachineId) -> Result<(), PersistenceError> {
        let path = self.path_for(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
