// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `when` predicate language (§4.4).
//!
//! Minimum required shape: `<jobId>.status == '<status-literal>'`. An absent
//! referenced job evaluates to false. Unparseable predicates evaluate to
//! false and are never fatal to the run.

use crate::state::{JobStatus, RunState};

/// Parse and evaluate a `when` predicate against the current run.
///
/// Returns `false` for any job reference that doesn't exist and for any
/// predicate that doesn't match the supported grammar — per §4.4,
/// unparseable predicates are a diagnostic, never a run failure.
pub fn eval_when(predicate: &str, run: &RunState) -> bool {
    match parse(predicate) {
        Some((job_id, expected)) => run
            .jobs
            .get(job_id)
            .map(|job| status_matches(job.status, expected))
            .unwrap_or(false),
        None => false,
    }
}

/// Splits `<jobId>.status == '<literal>'` into `(jobId, literal)`.
fn parse(predicate: &str) -> Option<(&str, &str)> {
    let predicate = predicate.trim();
    let (lhs, rhs) = predicate.split_once("==")?;
    let lhs = lhs.trim();
    let job_id = lhs.strip_suffix(".status")?.trim();
    if job_id.is_empty() {
        return None;
    }
    let rhs = rhs.trim();
    let literal = strip_quotes(rhs)?;
    Some((job_id, literal))
}

fn strip_quotes(s: &str) -> Option<&str> {
    let single = s.strip_prefix('\'').and_then(|s| s.strip_suffix('\''));
    let double = s.strip_prefix('"').and_then(|s| s.strip_suffix('"'));
    single.or(double)
}

fn status_matches(status: JobStatus, literal: &str) -> bool {
    status.to_string() == literal
}

#[cfg(test)]
#[path = "predicate_tests.rs"]
mod tests;
