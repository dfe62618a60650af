// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[derive(Serialize)]
struct Widget {
    name: String,
}

#[test]
fn format_or_json_invokes_text_fn_for_text_format() {
    let mut invoked = false;
    format_or_json(OutputFormat::Text, &Widget { name: "a".to_string() }, || invoked = true).unwrap();
    assert!(invoked);
}

#[test]
fn format_or_json_skips_text_fn_for_json_format() {
    let mut invoked = false;
    format_or_json(OutputFormat::Json, &Widget { name: "a".to_string() }, || invoked = true).unwrap();
    assert!(!invoked);
}

#[test]
fn handle_list_prints_empty_message_for_text_format() {
    let items: Vec<Widget> = Vec::new();
    let mut rendered = false;
    handle_list(OutputFormat::Text, &items, "no widgets", |_| rendered = true).unwrap();
    assert!(!rendered);
}

#[test]
fn handle_list_renders_text_for_nonempty_items() {
    let items = vec![Widget { name: "a".to_string() }];
    let mut rendered = false;
    handle_list(OutputFormat::Text, &items, "no widgets", |_| rendered = true).unwrap();
    assert!(rendered);
}

#[test]
fn handle_list_does_not_invoke_render_text_for_json_format() {
    let items = vec![Widget { name: "a".to_string() }];
    let mut rendered = false;
    handle_list(OutputFormat::Json, &items, "no widgets", |_| rendered = true).unwrap();
    assert!(!rendered);
}
