// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agentpipe-executor: resolves agent definitions, renders prompts, spawns
//! worker subprocesses, and reports structured `JobResult`s back to the
//! scheduler (§4.3).

pub mod config;
pub mod progress;
pub mod render;
pub mod resolve;
pub mod scratch;
pub mod subprocess;

#[cfg(any(test, feature = "test-support"))]
pub mod stub;

use agentpipe_core::{Context, ErrorKind, Job};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;

pub use config::ExecutorConfig;
pub use progress::ProgressSink;
pub use subprocess::SubprocessExecutor;

/// Outcome of one job execution (§4.3 contract).
#[derive(Debug, Clone)]
pub enum JobResult {
    Success { output: serde_json::Value, duration_ms: u64 },
    Failure { kind: ErrorKind, message: String, duration_ms: u64 },
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Success { .. })
    }
}

/// Cooperative cancellation handle shared between the scheduler and an
/// in-flight executor invocation (§9 "Coroutine-style control flow": the
/// cancel signal is a field the executor polls at each resumption point).
#[derive(Clone, Default)]
pub struct CancelToken {
    notify: Arc<Notify>,
    cancelled: Arc<std::sync::atomic::AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, std::sync::atomic::Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Options passed alongside a job to [`AgentExecutor::execute`].
#[derive(Clone, Default)]
pub struct ExecuteOptions {
    pub cancel: CancelToken,
    pub progress: Option<ProgressSink>,
}

/// The capability abstraction the scheduler depends on (§9). Tests
/// substitute [`stub::StubExecutor`]; production wiring uses
/// [`SubprocessExecutor`].
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn execute(&self, job: &Job, context: &Context, options: ExecuteOptions) -> JobResult;
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
