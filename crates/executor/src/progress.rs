// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress marker parsing (§4.3 step 5).
//!
//! A line matching `PROGRESS: (\d{1,3})` forwards the captured percentage
//! (clamped to 0..=100). A line containing the case-insensitive phrases
//! "done"/"complete"/"completed" forwards 100.

use regex::Regex;
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"PROGRESS:\s*(\d{1,3})").expect("valid regex"))
}

/// Scan one line of worker output for a progress signal. Returns `None` for
/// lines carrying no recognizable marker.
pub fn parse_progress_line(line: &str) -> Option<u8> {
    if let Some(caps) = marker_re().captures(line) {
        let pct: u32 = caps[1].parse().ok()?;
        return Some(pct.min(100) as u8);
    }

    let lower = line.to_ascii_lowercase();
    if lower.contains("done") || lower.contains("complete") || lower.contains("completed") {
        return Some(100);
    }

    None
}

/// Fire-and-forget channel to a progress observer. Forwarding never blocks
/// the worker (§4.3 step 5) — sends use `try_send` and silently drop on a
/// full or closed channel.
#[derive(Clone)]
pub struct ProgressSink {
    tx: Arc<mpsc::Sender<u8>>,
}

impl ProgressSink {
    pub fn new(tx: mpsc::Sender<u8>) -> Self {
        Self { tx: Arc::new(tx) }
    }

    pub fn forward(&self, pct: u8) {
        let _ = self.tx.try_send(pct);
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
