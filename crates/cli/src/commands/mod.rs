// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One module per `agentpipe` subcommand (§6 "Control API").

pub mod cancel;
pub mod list;
pub mod progress;
pub mod start;
pub mod status;
pub mod watch;

use agentpipe_core::RunId;
use anyhow::Context as _;

/// Parse a `runId` argument, surfacing a readable error rather than a panic
/// on malformed input — the engine itself never rejects an ID shape, it
/// only rejects IDs it has no record of (`UnknownRun`, checked downstream).
pub fn parse_run_id(raw: &str) -> anyhow::Result<RunId> {
    if raw.trim().is_empty() {
        anyhow::bail!("run id must not be empty");
    }
    Ok(RunId::from_string(raw))
}

pub fn read_json_file<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> anyhow::Result<T> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {} as JSON", path.display()))
}
