// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `agentpipe watch`: subscribe to every lifecycle event and print them as
//! they arrive (§6 "Event subscription"). Runs until interrupted.

use crate::color;
use crate::output::OutputFormat;
use agentpipe_scheduler::{EventFilter, Scheduler};

pub async fn run(scheduler: &Scheduler, format: OutputFormat) -> anyhow::Result<()> {
    let (_sub_id, mut rx) = scheduler.subscribe(EventFilter::All);

    while let Some(event) = rx.recv().await {
        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(&event)?);
            }
            OutputFormat::Text => {
                let job = event.job_id.as_deref().map(|j| format!(" {j}")).unwrap_or_default();
                println!(
                    "{} {} {}{} {}",
                    color::muted(&event.timestamp_ms.to_string()),
                    color::literal(&event.run_id.to_string()),
                    color::header(&event.kind.to_string()),
                    color::context(&job),
                    event.status,
                );
            }
        }
    }
    Ok(())
}
