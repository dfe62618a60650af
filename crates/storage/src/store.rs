// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `StateStore` capability abstraction (§4.5, §6 "Consumed — StateStore").

use crate::StoreError;
use agentpipe_core::{RunId, RunState};
use async_trait::async_trait;

/// Persists `RunState` atomically after every transition and restores it on
/// demand. Implementations must tolerate concurrent runs (distinct
/// `runId`s); atomicity is only required per record (§5 "Shared resources").
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Atomically replace the stored record keyed by `run.run_id`.
    async fn save(&self, run: &RunState) -> Result<(), StoreError>;

    /// The most recent snapshot for `run_id`, or `None` if unknown.
    async fn load(&self, run_id: &RunId) -> Result<Option<RunState>, StoreError>;

    /// All known run IDs, in implementation-defined order.
    async fn list(&self) -> Result<Vec<RunId>, StoreError>;
}
