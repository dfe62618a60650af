// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The storage crate's narrow, typed error set (§10 "Error handling").

/// Failure modes specific to a [`crate::StateStore`] implementation.
///
/// Callers that need the engine-wide taxonomy (§7) convert this into an
/// [`agentpipe_core::EngineError`] with kind `StatePersistenceError`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to serialize run state: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to deserialize run state: {0}")]
    Deserialize(#[source] serde_json::Error),
    #[error("i/o error at {path}: {source}")]
    Io { path: std::path::PathBuf, #[source] source: std::io::Error },
}

impl From<StoreError> for agentpipe_core::EngineError {
    fn from(e: StoreError) -> Self {
        agentpipe_core::EngineError::state_persistence(e.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
