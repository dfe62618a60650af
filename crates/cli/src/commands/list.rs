// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `agentpipe list`: every run known to the state store (§6 `list`).

use crate::color;
use crate::output::{handle_list, OutputFormat};
use agentpipe_scheduler::Scheduler;

pub async fn run(scheduler: &Scheduler, format: OutputFormat) -> anyhow::Result<()> {
    let mut run_ids: Vec<String> = scheduler.list().await?.iter().map(ToString::to_string).collect();
    run_ids.sort();

    handle_list(format, &run_ids, "no runs known to this engine", |ids| {
        for id in ids {
            println!("{}", color::literal(id));
        }
    })
}
