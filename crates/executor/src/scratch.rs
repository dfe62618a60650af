// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-execution scratch directory materialization and cleanup (§4.3 step 3,
//! §5 "Shared resources": the scratch filesystem is partitioned per
//! execution ID; no executor reads another's files).

use agentpipe_core::{Context, EngineError, ErrorKind};
use std::path::{Path, PathBuf};

pub struct ScratchDir {
    pub root: PathBuf,
    pub context_file: PathBuf,
    pub prompt_file: PathBuf,
    pub output_file: PathBuf,
}

impl ScratchDir {
    /// Deterministic paths for an execution, computable before the
    /// directory exists — lets callers build worker instructions (which
    /// name `context_file`/`output_file`) before materializing anything.
    pub fn paths(scratch_root: &Path, execution_id: &str) -> (PathBuf, PathBuf, PathBuf, PathBuf) {
        let root = scratch_root.join(execution_id);
        (root.clone(), root.join("context.json"), root.join("prompt.txt"), root.join("output.json"))
    }

    /// Create a unique directory under `scratch_root` and write the context
    /// snapshot and rendered prompt files, leaving `output.json` reserved
    /// for the worker to write. Uses `tokio::fs` throughout so a job's
    /// scratch I/O never blocks a shared runtime worker thread out from
    /// under the rest of the bounded pool (§5).
    pub async fn create(
        scratch_root: &Path,
        execution_id: &str,
        context: &Context,
        prompt: &str,
    ) -> Result<Self, EngineError> {
        let root = scratch_root.join(execution_id);
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            EngineError::new(
                ErrorKind::InternalExecutorError,
                format!("failed to create scratch directory {}: {e}", root.display()),
            )
        })?;

        let context_file = root.join("context.json");
        let prompt_file = root.join("prompt.txt");
        let output_file = root.join("output.json");

        let context_json = serde_json::to_string_pretty(context.as_map()).map_err(|e| {
            EngineError::new(
                ErrorKind::InternalExecutorError,
                format!("failed to serialize context snapshot: {e}"),
            )
        })?;
        tokio::fs::write(&context_file, context_json).await.map_err(io_err)?;
        tokio::fs::write(&prompt_file, prompt).await.map_err(io_err)?;

        Ok(Self { root, context_file, prompt_file, output_file })
    }

    /// Read and parse the output file written by the worker. Missing or
    /// unparseable output is `WorkerOutputInvalid` (§4.3 step 7).
    pub async fn read_output(&self) -> Result<serde_json::Value, EngineError> {
        let raw = tokio::fs::read_to_string(&self.output_file).await.map_err(|e| {
            EngineError::new(
                ErrorKind::WorkerOutputInvalid,
                format!("output file missing or unreadable: {e}"),
            )
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            EngineError::new(
                ErrorKind::WorkerOutputInvalid,
                format!("output file did not contain valid JSON: {e}"),
            )
        })
    }

    /// Remove the scratch directory. Cleanup failures are logged, never
    /// raised (§4.3 step 8).
    pub async fn cleanup(&self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.root).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.root.display(), error = %e, "scratch cleanup failed");
            }
        }
    }
}

fn io_err(e: std::io::Error) -> EngineError {
    EngineError::new(ErrorKind::InternalExecutorError, format!("scratch write failed: {e}"))
}

#[cfg(test)]
#[path = "scratch_tests.rs"]
mod tests;
