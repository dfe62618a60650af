// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor runtime configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Construction parameters for [`crate::SubprocessExecutor`] (§10 "Configuration").
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Directory searched for agent definition files.
    pub agents_dir: PathBuf,
    /// Root under which per-execution scratch directories are created.
    pub scratch_root: PathBuf,
    /// Command used to spawn the worker process. The rendered prompt file
    /// path is appended as its principal argument.
    pub worker_command: Vec<String>,
    /// Applied when a job declares no `timeout`.
    pub default_timeout: Duration,
    /// Grace window between sending a termination signal and force-killing.
    pub kill_grace: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            agents_dir: PathBuf::from("./agents"),
            scratch_root: std::env::temp_dir().join("agentpipe"),
            worker_command: vec!["agentpipe-worker".to_string()],
            default_timeout: Duration::from_secs(300),
            kill_grace: Duration::from_secs(5),
        }
    }
}
