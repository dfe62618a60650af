// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `agentpipe cancel <runId>`: request cancellation of a run (§6 `cancel`).

use crate::output::{format_or_json, OutputFormat};
use agentpipe_scheduler::Scheduler;
use serde::Serialize;

#[derive(Serialize)]
struct CancelView {
    run_id: String,
    cancelled: bool,
}

pub async fn run(scheduler: &Scheduler, run_id: &str, format: OutputFormat) -> anyhow::Result<()> {
    let run_id = super::parse_run_id(run_id)?;
    let cancelled = scheduler.cancel(&run_id).await?;
    let view = CancelView { run_id: run_id.to_string(), cancelled };

    format_or_json(format, &view, || {
        if cancelled {
            println!("cancelled {}", view.run_id);
        } else {
            println!("{} was already terminal or is unknown", view.run_id);
        }
    })
}
