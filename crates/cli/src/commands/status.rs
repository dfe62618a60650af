// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `agentpipe status <runId>`: print a run's full state (§6 `status`).

use crate::color;
use crate::output::{format_or_json, OutputFormat};
use agentpipe_scheduler::Scheduler;

pub async fn run(scheduler: &Scheduler, run_id: &str, format: OutputFormat) -> anyhow::Result<()> {
    let run_id = super::parse_run_id(run_id)?;
    let state = scheduler.run_state(&run_id).await?;

    format_or_json(format, &state, || {
        println!("{} {}", color::header("run"), state.run_id);
        println!("  {} {}", color::literal("status:"), state.status);
        println!("  {} {}%", color::literal("progress:"), state.progress());
        println!("  {} {}", color::literal("pipeline:"), state.pipeline.name);
        println!("{}", color::header("jobs"));
        for job in &state.pipeline.jobs {
            let Some(js) = state.jobs.get(&job.id) else { continue };
            let mut line = format!("  {} {} — {}", color::literal(&job.id), color::context(&job.name), js.status);
            if js.attempts > 1 {
                line.push_str(&format!(" ({} attempts)", js.attempts));
            }
            if let Some(reason) = &js.skip_reason {
                line.push_str(&format!(" [{reason}]"));
            }
            if let Some(err) = &js.error {
                line.push_str(&format!(" {}", color::muted(&err.to_string())));
            }
            println!("{line}");
        }
    })
}
