// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed `StateStore` (§4.5, SPEC_FULL §4.5 "file layout").
//!
//! One JSON file per run, named `<runId>.json`, written by serializing to a
//! `.tmp` sibling and renaming over the final path — atomic on same-filesystem
//! renames, which is the only atomicity guarantee the spec requires.

use crate::store::StateStore;
use crate::StoreError;
use agentpipe_core::{RunId, RunState};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub struct FileStateStore {
    root: PathBuf,
}

impl FileStateStore {
    /// `root` is created on first use if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, run_id: &RunId) -> PathBuf {
        self.root.join(format!("{run_id}.json"))
    }

    async fn ensure_root(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StoreError::Io { path: self.root.clone(), source })
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn save(&self, run: &RunState) -> Result<(), StoreError> {
        self.ensure_root().await?;
        let path = self.path_for(&run.run_id);
        let tmp_path = tmp_sibling(&path);

        let json = serde_json::to_vec_pretty(run).map_err(StoreError::Serialize)?;
        tokio::fs::write(&tmp_path, &json)
            .await
            .map_err(|source| StoreError::Io { path: tmp_path.clone(), source })?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|source| StoreError::Io { path: path.clone(), source })?;
        Ok(())
    }

    async fn load(&self, run_id: &RunId) -> Result<Option<RunState>, StoreError> {
        let path = self.path_for(run_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let run = serde_json::from_slice(&bytes).map_err(StoreError::Deserialize)?;
                Ok(Some(run))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    async fn list(&self) -> Result<Vec<RunId>, StoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|source| StoreError::Io { path: self.root.clone(), source })?;

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| StoreError::Io { path: self.root.clone(), source })?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(RunId::from_string(stem));
            }
        }
        Ok(ids)
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
