// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_progress_marker() {
    assert_eq!(parse_progress_line("PROGRESS: 42"), Some(42));
}

#[test]
fn clamps_out_of_range_percentage() {
    assert_eq!(parse_progress_line("PROGRESS: 150"), Some(100));
}

#[test]
fn matches_done_phrase_case_insensitively() {
    assert_eq!(parse_progress_line("Task Done."), Some(100));
}

#[test]
fn matches_complete_phrase() {
    assert_eq!(parse_progress_line("review complete"), Some(100));
}

#[test]
fn lines_without_markers_return_none() {
    assert_eq!(parse_progress_line("just some log output"), None);
}

#[tokio::test]
async fn sink_forwards_without_blocking() {
    let (tx, mut rx) = tokio::sync::mpsc::channel(1);
    let sink = ProgressSink::new(tx);
    sink.forward(50);
    assert_eq!(rx.recv().await, Some(50));
}

#[tokio::test]
async fn sink_drops_on_full_channel_instead_of_blocking() {
    let (tx, _rx) = tokio::sync::mpsc::channel(1);
    let sink = ProgressSink::new(tx);
    sink.forward(1);
    sink.forward(2); // channel full, dropped, must not panic or block
}
