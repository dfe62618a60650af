// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine-wide error taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of failure that occurred, independent of the human-readable message.
///
/// Mirrors the error taxonomy surfaced across the validator, executor,
/// scheduler and state store: each variant names one documented failure mode,
/// never a generic catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Pipeline failed validation or cycle detection at submission time.
    InvalidPipeline,
    /// The named agent definition could not be resolved.
    AgentNotFound,
    /// The worker process exited with a non-zero status.
    WorkerFailed,
    /// The per-job wall-clock timeout elapsed.
    Timeout,
    /// The job or run was terminated by cancellation.
    Cancelled,
    /// The worker exited zero but its output file was missing or unparseable.
    WorkerOutputInvalid,
    /// An unexpected executor fault (e.g. scratch directory unwritable).
    InternalExecutorError,
    /// A state store `save` call failed; the owning run is forced `Failed`.
    StatePersistenceError,
    /// A control-API call targeted a `runId` unknown to the engine.
    UnknownRun,
}

impl ErrorKind {
    /// Whether a job failing with this error kind is still eligible for retry.
    ///
    /// Only `Cancelled` is categorically excluded — every other kind is
    /// "a failure like any other" as far as the retry policy is concerned.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorKind::Cancelled)
    }
}

crate::simple_display! {
    ErrorKind {
        InvalidPipeline => "invalid_pipeline",
        AgentNotFound => "agent_not_found",
        WorkerFailed => "worker_failed",
        Timeout => "timeout",
        Cancelled => "cancelled",
        WorkerOutputInvalid => "worker_output_invalid",
        InternalExecutorError => "internal_executor_error",
        StatePersistenceError => "state_persistence_error",
        UnknownRun => "unknown_run",
    }
}

/// The engine's single error type.
///
/// Carries the [`ErrorKind`], a human-readable message, and an optional
/// job ID for errors that originate from a specific job. Library-boundary
/// functions return `Result<T, EngineError>` uniformly; only the CLI binary
/// converts these into process exit codes.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct EngineError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl EngineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), job_id: None }
    }

    pub fn with_job(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn invalid_pipeline(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidPipeline, message)
    }

    pub fn unknown_run(run_id: impl fmt::Display) -> Self {
        Self::new(ErrorKind::UnknownRun, format!("no run with id {run_id}"))
    }

    pub fn state_persistence(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StatePersistenceError, message)
    }
}

/// A structured, serializable job error: kind, message, and optional cause.
///
/// This is the value stored at `JobState::error` (§3) — distinct from
/// [`EngineError`], which also carries control-API-level kinds like
/// `InvalidPipeline`/`UnknownRun` that never appear on a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl JobFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), cause: None }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<EngineError> for JobFailure {
    fn from(e: EngineError) -> Self {
        Self { kind: e.kind, message: e.message, cause: None }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
