// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `agentpipe start <pipeline>`: validate, start and run a pipeline to
//! completion, streaming its lifecycle events as they arrive (§6 `startRun`).

use crate::color;
use crate::exit_error::ExitError;
use crate::output::OutputFormat;
use agentpipe_core::{Pipeline, RunStatus};
use agentpipe_scheduler::{EventFilter, EventKind, Scheduler};
use std::collections::HashMap;
use std::path::Path;

pub async fn run(
    scheduler: &Scheduler,
    pipeline_path: &Path,
    context_path: Option<&Path>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let pipeline: Pipeline = super::read_json_file(pipeline_path)?;
    let initial_context: HashMap<String, serde_json::Value> = match context_path {
        Some(path) => super::read_json_file(path)?,
        None => HashMap::new(),
    };

    // Subscribe before starting the run so the very first `run.started`
    // event is never missed to a race with the scheduler's own task.
    let (_sub_id, mut rx) = scheduler.subscribe(EventFilter::All);
    let run_id = scheduler.start_run(pipeline, initial_context).await?;

    if format == OutputFormat::Text {
        println!("{} {}", color::header("started run"), run_id);
    }

    while let Some(event) = rx.recv().await {
        if event.run_id != run_id {
            continue;
        }
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string(&event)?),
            OutputFormat::Text => {
                let job = event.job_id.as_deref().map(|j| format!(" {j}")).unwrap_or_default();
                println!("  {}{} {}", color::literal(&event.kind.to_string()), color::context(&job), event.status);
            }
        }
        if matches!(event.kind, EventKind::RunCompleted | EventKind::RunFailed | EventKind::RunCancelled) {
            break;
        }
    }

    let final_state = scheduler.run_state(&run_id).await?;
    if format == OutputFormat::Json {
        // One compact line, matching the event stream above it — easy for
        // a caller to take the last line of stdout as the final state.
        println!("{}", serde_json::to_string(&final_state)?);
    } else {
        println!("{} {}", color::header("final status"), final_state.status);
    }

    if final_state.status == RunStatus::Failed {
        return Err(ExitError::new(1, format!("run {run_id} failed")).into());
    }
    Ok(())
}
