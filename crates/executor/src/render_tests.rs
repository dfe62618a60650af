// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn resolves_dotted_placeholder() {
    let mut ctx = Context::new();
    ctx.set("a", json!({"b": {"c": "hello"}}));
    assert_eq!(render("value is {{a.b.c}}", &ctx), "value is hello");
}

#[test]
fn unresolved_placeholder_left_literal() {
    let ctx = Context::new();
    assert_eq!(render("value is {{missing.path}}", &ctx), "value is {{missing.path}}");
}

#[test]
fn numeric_values_rendered_as_text() {
    let mut ctx = Context::new();
    ctx.set("n", json!(42));
    assert_eq!(render("count: {{n}}", &ctx), "count: 42");
}

#[test]
fn tolerates_internal_whitespace_in_placeholder() {
    let mut ctx = Context::new();
    ctx.set("a", json!("x"));
    assert_eq!(render("{{ a }}", &ctx), "x");
}

#[test]
fn multiple_placeholders_all_resolved() {
    let mut ctx = Context::new();
    ctx.set("a", json!("1"));
    ctx.set("b", json!("2"));
    assert_eq!(render("{{a}}-{{b}}", &ctx), "1-2");
}

#[test]
fn instruction_block_names_both_paths() {
    let rendered = append_worker_instructions(
        "do the thing",
        std::path::Path::new("/tmp/x/context.json"),
        std::path::Path::new("/tmp/x/output.json"),
    );
    assert!(rendered.contains("do the thing"));
    assert!(rendered.contains("/tmp/x/context.json"));
    assert!(rendered.contains("/tmp/x/output.json"));
}
