// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures re-exported for downstream crates under the
//! `test-support` feature, mirroring how builders live alongside their
//! target types throughout this crate ([`crate::pipeline::test_support`]).

pub use crate::pipeline::test_support::{pipeline, JobBuilder};

use crate::context::Context;
use crate::pipeline::Pipeline;
use crate::state::{RunId, RunState};

/// A freshly created `RunState` for `pipeline`, all jobs `Pending`, seeded
/// with an empty context and `started_at_ms = 0` — the common starting
/// point for scheduler and graph tests.
pub fn fresh_run(pipeline: Pipeline) -> RunState {
    RunState::new(RunId::new(), pipeline, Context::new(), 0)
}
