// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent definition resolution (§4.3 step 1).

use agentpipe_core::{EngineError, ErrorKind};
use std::path::{Path, PathBuf};

/// The canonical markup-file extension for agent definitions.
pub const AGENT_DEF_EXT: &str = "md";

/// Resolve `agent` to a definition file under `agents_dir`.
///
/// Tries the name as-is, then with [`AGENT_DEF_EXT`] appended. Neither
/// existing is `AgentNotFound`.
pub fn resolve_agent_def(agents_dir: &Path, agent: &str) -> Result<PathBuf, EngineError> {
    let as_is = agents_dir.join(agent);
    if as_is.is_file() {
        return Ok(as_is);
    }

    let with_ext = agents_dir.join(format!("{agent}.{AGENT_DEF_EXT}"));
    if with_ext.is_file() {
        return Ok(with_ext);
    }

    Err(EngineError::new(
        ErrorKind::AgentNotFound,
        format!("no agent definition for '{agent}' under {}", agents_dir.display()),
    ))
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
