// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RunState` and `JobState`: the authoritative per-run record.

use crate::context::Context;
use crate::error::JobFailure;
use crate::pipeline::Pipeline;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_id! {
    /// Unique, human-recognizable, monotonic-ish run identifier (§3).
    pub struct RunId("run-");
}

/// Per-run status (§4.4 state machine). `Paused` is accepted but this
/// implementation never enters it — no operation transitions a run there,
/// matching the spec's "optional; implementation-defined" note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled)
    }
}

crate::simple_display! {
    RunStatus {
        Idle => "idle",
        Running => "running",
        Paused => "paused",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// Per-job status (§4.4 state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Queued,
    Running,
    Retrying,
    Completed,
    Failed,
    Skipped,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Skipped | JobStatus::Cancelled
        )
    }
}

crate::simple_display! {
    JobStatus {
        Pending => "pending",
        Queued => "queued",
        Running => "running",
        Retrying => "retrying",
        Completed => "completed",
        Failed => "failed",
        Skipped => "skipped",
        Cancelled => "cancelled",
    }
}

/// Reason a job was skipped, tracked for diagnostics and `when` evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// `when` predicate evaluated false.
    PredicateFalse,
    /// A dependency terminated `Failed` with no remaining retry budget.
    UpstreamFailed,
    /// The run was cancelled before this job became ready.
    RunCancelled,
}

crate::simple_display! {
    SkipReason {
        PredicateFalse => "predicate_false",
        UpstreamFailed => "upstream_failed",
        RunCancelled => "run_cancelled",
    }
}

/// Mutable per-job record, keyed by job ID inside [`RunState::jobs`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobState {
    pub status: JobStatus,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub started_at_ms: Option<u64>,
    #[serde(default)]
    pub completed_at_ms: Option<u64>,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<JobFailure>,
    #[serde(default)]
    pub skip_reason: Option<SkipReason>,
}

impl JobState {
    pub fn pending() -> Self {
        Self {
            status: JobStatus::Pending,
            attempts: 0,
            started_at_ms: None,
            completed_at_ms: None,
            output: None,
            error: None,
            skip_reason: None,
        }
    }
}

/// The authoritative per-run record (§3).
///
/// Invariant: the key set of `jobs` equals the set of job IDs in `pipeline`,
/// fixed at run creation — enforced by [`RunState::new`] and never altered
/// afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: RunId,
    pub pipeline: Pipeline,
    pub status: RunStatus,
    #[serde(default)]
    pub started_at_ms: Option<u64>,
    #[serde(default)]
    pub completed_at_ms: Option<u64>,
    pub context: Context,
    pub jobs: HashMap<String, JobState>,
}

impl RunState {
    pub fn new(run_id: RunId, pipeline: Pipeline, context: Context, started_at_ms: u64) -> Self {
        let jobs = pipeline.jobs.iter().map(|j| (j.id.clone(), JobState::pending())).collect();
        Self {
            run_id,
            pipeline,
            status: RunStatus::Idle,
            started_at_ms: Some(started_at_ms),
            completed_at_ms: None,
            context,
            jobs,
        }
    }

    /// Run progress: `100 * (completed + skipped) / total` (§4.4).
    pub fn progress(&self) -> u8 {
        if self.jobs.is_empty() {
            return 0;
        }
        let done = self
            .jobs
            .values()
            .filter(|j| matches!(j.status, JobStatus::Completed | JobStatus::Skipped))
            .count();
        ((done * 100) / self.jobs.len()) as u8
    }

    pub fn all_terminal(&self) -> bool {
        self.jobs.values().all(|j| j.status.is_terminal())
    }

    /// Final run status per §4.4: `Completed` iff no job `Failed` and at
    /// least one job `Completed`; `Failed` iff any job `Failed`.
    pub fn terminal_run_status(&self) -> RunStatus {
        let any_failed = self.jobs.values().any(|j| j.status == JobStatus::Failed);
        let any_completed = self.jobs.values().any(|j| j.status == JobStatus::Completed);
        if any_failed {
            RunStatus::Failed
        } else if any_completed {
            RunStatus::Completed
        } else {
            // No job completed and none failed: every job was skipped (or
            // there were zero jobs, excluded by validation). Treat as
            // completed — the run did what it was asked, trivially.
            RunStatus::Completed
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
