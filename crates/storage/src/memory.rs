// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `StateStore`, for tests and embedding scenarios that don't
//! need durability (§9 "Dynamic dispatch / plugin shape").

use crate::store::StateStore;
use crate::StoreError;
use agentpipe_core::{RunId, RunState};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
pub struct InMemoryStateStore {
    runs: Mutex<HashMap<RunId, RunState>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn save(&self, run: &RunState) -> Result<(), StoreError> {
        self.runs.lock().insert(run.run_id, run.clone());
        Ok(())
    }

    async fn load(&self, run_id: &RunId) -> Result<Option<RunState>, StoreError> {
        Ok(self.runs.lock().get(run_id).cloned())
    }

    async fn list(&self) -> Result<Vec<RunId>, StoreError> {
        Ok(self.runs.lock().keys().copied().collect())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
