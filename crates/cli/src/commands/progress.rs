// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `agentpipe progress <runId>`: print a run's completion percentage (§6).

use crate::output::{format_or_json, OutputFormat};
use agentpipe_scheduler::Scheduler;
use serde::Serialize;

#[derive(Serialize)]
struct ProgressView {
    run_id: String,
    percent: u8,
}

pub async fn run(scheduler: &Scheduler, run_id: &str, format: OutputFormat) -> anyhow::Result<()> {
    let run_id = super::parse_run_id(run_id)?;
    let percent = scheduler.progress(&run_id).await?;
    let view = ProgressView { run_id: run_id.to_string(), percent };

    format_or_json(format, &view, || {
        println!("{percent}%");
    })
}
