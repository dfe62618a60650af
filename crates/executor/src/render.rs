// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `{{var}}` prompt interpolation (§4.3 step 2).

use agentpipe_core::Context;
use regex::Regex;
use std::sync::OnceLock;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([a-zA-Z0-9_.]+)\s*\}\}").expect("valid regex"))
}

/// Render `template` against `context`. `{{a.b.c}}` resolves by dotted-path
/// lookup; unresolved placeholders are left literal — this is a contract,
/// not an error, so agents may echo them for diagnostics (§4.3).
pub fn render(template: &str, context: &Context) -> String {
    placeholder_re()
        .replace_all(template, |caps: &regex::Captures| {
            let path = &caps[1];
            match context.get_path(path) {
                Some(value) => value_to_text(value),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The instruction block appended to every rendered prompt, identical
/// across invocations, telling the worker where to read context and write
/// output (§4.3 step 3).
pub fn append_worker_instructions(
    rendered_prompt: &str,
    context_file: &std::path::Path,
    output_file: &std::path::Path,
) -> String {
    format!(
        "{rendered_prompt}\n\n---\n\
         Context snapshot is available at: {}\n\
         Write your structured result as JSON to: {}\n\
         (also exposed as $AGENTPIPE_CONTEXT_FILE / $AGENTPIPE_OUTPUT_FILE)\n",
        context_file.display(),
        output_file.display(),
    )
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
