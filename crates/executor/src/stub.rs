// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory scripted [`AgentExecutor`] for scheduler and integration tests
//! (§9 "Dynamic dispatch / plugin shape": tests substitute an in-memory
//! executor that returns scripted results rather than spawning a process).

use crate::{AgentExecutor, ExecuteOptions, JobResult};
use agentpipe_core::{Context, ErrorKind, Job};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Returns a pre-scripted [`JobResult`] per job ID, falling back to a
/// default when no more scripted results remain for that job.
pub struct StubExecutor {
    scripted: Arc<Mutex<HashMap<String, VecDeque<JobResult>>>>,
    default_result: JobResult,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StubExecutor {
    pub fn new(default_result: JobResult) -> Self {
        Self {
            scripted: Arc::new(Mutex::new(HashMap::new())),
            default_result,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(JobResult::Success { output: serde_json::json!({}), duration_ms: 0 })
    }

    pub fn failing(kind: ErrorKind) -> Self {
        Self::new(JobResult::Failure { kind, message: "stubbed failure".to_string(), duration_ms: 0 })
    }

    /// Queue a result to be returned the next time `job_id` executes.
    /// Results for a job are consumed in the order they were scripted.
    pub fn script(&self, job_id: impl Into<String>, result: JobResult) {
        self.scripted.lock().entry(job_id.into()).or_default().push_back(result);
    }

    /// Job IDs in the order `execute` was called, including repeats from
    /// retries.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AgentExecutor for StubExecutor {
    async fn execute(&self, job: &Job, _context: &Context, options: ExecuteOptions) -> JobResult {
        self.calls.lock().push(job.id.clone());

        if options.cancel.is_cancelled() {
            return JobResult::Failure {
                kind: ErrorKind::Cancelled,
                message: "cancelled before spawn".to_string(),
                duration_ms: 0,
            };
        }

        let mut scripted = self.scripted.lock();
        match scripted.get_mut(&job.id).and_then(VecDeque::pop_front) {
            Some(result) => result,
            None => self.default_result.clone(),
        }
    }
}

#[cfg(test)]
#[path = "stub_tests.rs"]
mod tests;
