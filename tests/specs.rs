// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Black-box end-to-end tests driving the `agentpipe` binary itself (§8
//! "End-to-end scenarios"), in contrast to the in-process scheduler tests
//! in `agentpipe-scheduler`, which script an `AgentExecutor` directly.
//! These tests spawn the real CLI, which spawns a real worker subprocess —
//! a tiny shell script standing in for an agent runtime.

use assert_cmd::Command;
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self { dir: tempfile::tempdir().expect("create tempdir") }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Writes an agent definition file any job in these tests can resolve
    /// by name `echo`.
    fn write_agent(&self) {
        let agents_dir = self.path("agents");
        fs::create_dir_all(&agents_dir).unwrap();
        fs::write(agents_dir.join("echo.md"), "You are a no-op agent. Echo success.\n").unwrap();
    }

    /// A worker script that ignores its prompt and reports success by
    /// writing a fixed JSON object to the output file path the executor
    /// exposes as `$AGENTPIPE_OUTPUT_FILE` (§4.3 step 3).
    fn write_succeeding_worker(&self) -> PathBuf {
        self.write_worker_script("printf '{\"ok\":true}' > \"$AGENTPIPE_OUTPUT_FILE\"\n")
    }

    /// A worker script that always exits non-zero without writing output.
    fn write_failing_worker(&self) -> PathBuf {
        self.write_worker_script("echo 'boom' >&2\nexit 1\n")
    }

    fn write_worker_script(&self, body: &str) -> PathBuf {
        let path = self.path("worker.sh");
        fs::write(&path, format!("#!/bin/sh\nset -e\n{body}")).unwrap();
        set_executable(&path);
        path
    }

    fn write_pipeline(&self, name: &str, json: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, json).unwrap();
        path
    }

    fn cmd(&self, worker: &Path) -> Command {
        let mut cmd = Command::cargo_bin("agentpipe").expect("agentpipe binary built");
        cmd.arg("--state-dir")
            .arg(self.path("state"))
            .arg("--agents-dir")
            .arg(self.path("agents"))
            .arg("--scratch-dir")
            .arg(self.path("scratch"))
            .arg("--worker-command")
            .arg(worker);
        cmd
    }
}

#[cfg(unix)]
fn set_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) {}

const LINEAR_PIPELINE: &str = r#"{
  "name": "linear",
  "jobs": [
    {"id": "a", "agent": "echo", "task": "first"},
    {"id": "b", "agent": "echo", "task": "second", "dependsOn": "a"}
  ]
}"#;

#[test]
#[serial]
fn start_runs_a_linear_pipeline_to_completion_in_json_mode() {
    let ws = Workspace::new();
    ws.write_agent();
    let worker = ws.write_succeeding_worker();
    let pipeline = ws.write_pipeline("pipeline.json", LINEAR_PIPELINE);

    let output = ws
        .cmd(&worker)
        .arg("--format")
        .arg("json")
        .arg("start")
        .arg(&pipeline)
        .output()
        .expect("run agentpipe start");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"completed\""), "expected a completed run in output: {stdout}");
    assert!(stdout.contains("\"jobs\""), "final run state should be printed as JSON: {stdout}");
}

#[test]
#[serial]
fn start_fails_the_process_when_the_run_fails() {
    let ws = Workspace::new();
    ws.write_agent();
    let worker = ws.write_failing_worker();
    let pipeline = ws.write_pipeline(
        "pipeline.json",
        r#"{"name": "broken", "jobs": [{"id": "a", "agent": "echo", "retry": {"maxAttempts": 1}}]}"#,
    );

    let output = ws.cmd(&worker).arg("start").arg(&pipeline).output().expect("run agentpipe start");

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
#[serial]
fn start_on_an_invalid_pipeline_exits_with_code_two_before_spawning_anything() {
    let ws = Workspace::new();
    ws.write_agent();
    let worker = ws.write_succeeding_worker();
    // Duplicate job IDs: fails §4.1 validation.
    let pipeline = ws.write_pipeline(
        "pipeline.json",
        r#"{"name": "dup", "jobs": [{"id": "a", "agent": "echo"}, {"id": "a", "agent": "echo"}]}"#,
    );

    let output = ws.cmd(&worker).arg("start").arg(&pipeline).output().expect("run agentpipe start");

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
    assert!(fs::read_dir(ws.path("state")).map(|mut d| d.next().is_none()).unwrap_or(true));
}

#[test]
#[serial]
fn status_progress_and_list_reflect_a_completed_run() {
    let ws = Workspace::new();
    ws.write_agent();
    let worker = ws.write_succeeding_worker();
    let pipeline = ws.write_pipeline("pipeline.json", LINEAR_PIPELINE);

    let start_out = ws.cmd(&worker).arg("--format").arg("json").arg("start").arg(&pipeline).output().unwrap();
    assert!(start_out.status.success());
    let final_state: serde_json::Value =
        serde_json::from_str(last_json_line(&start_out.stdout)).expect("final run state is JSON");
    let run_id = final_state["run_id"].as_str().expect("runId field").to_string();

    let status_out = ws.cmd(&worker).arg("--format").arg("json").arg("status").arg(&run_id).output().unwrap();
    assert!(status_out.status.success());
    let status: serde_json::Value = serde_json::from_slice(&status_out.stdout).unwrap();
    assert_eq!(status["status"], "completed");

    let progress_out = ws.cmd(&worker).arg("--format").arg("json").arg("progress").arg(&run_id).output().unwrap();
    assert!(progress_out.status.success());
    let progress: serde_json::Value = serde_json::from_slice(&progress_out.stdout).unwrap();
    assert_eq!(progress["percent"], 100);

    let list_out = ws.cmd(&worker).arg("--format").arg("json").arg("list").output().unwrap();
    assert!(list_out.status.success());
    let runs: Vec<String> = serde_json::from_slice(&list_out.stdout).unwrap();
    assert!(runs.contains(&run_id));
}

#[test]
#[serial]
fn status_of_an_unknown_run_exits_with_code_three() {
    let ws = Workspace::new();
    ws.write_agent();
    let worker = ws.write_succeeding_worker();

    let output = ws.cmd(&worker).arg("status").arg("run-does-not-exist").output().unwrap();

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(3));
}

#[test]
#[serial]
fn cancel_on_an_already_completed_run_is_idempotent() {
    let ws = Workspace::new();
    ws.write_agent();
    let worker = ws.write_succeeding_worker();
    let pipeline = ws.write_pipeline(
        "pipeline.json",
        r#"{"name": "trivial", "jobs": [{"id": "a", "agent": "echo"}]}"#,
    );

    let start_out = ws.cmd(&worker).arg("--format").arg("json").arg("start").arg(&pipeline).output().unwrap();
    assert!(start_out.status.success());
    let final_state: serde_json::Value = serde_json::from_str(last_json_line(&start_out.stdout)).unwrap();
    let run_id = final_state["run_id"].as_str().unwrap().to_string();

    let cancel_out = ws.cmd(&worker).arg("--format").arg("json").arg("cancel").arg(&run_id).output().unwrap();
    assert!(cancel_out.status.success());
    let cancel: serde_json::Value = serde_json::from_slice(&cancel_out.stdout).unwrap();
    assert_eq!(cancel["cancelled"], false);
}

#[test]
#[serial]
fn a_failing_job_retries_the_configured_number_of_times() {
    let ws = Workspace::new();
    ws.write_agent();
    // Fails on the first invocation (no marker file yet), succeeds after.
    let worker = ws.write_worker_script(
        "marker=\"$(dirname \"$AGENTPIPE_OUTPUT_FILE\")/../attempted\"\n\
         if [ -f \"$marker\" ]; then\n\
           printf '{\"ok\":true}' > \"$AGENTPIPE_OUTPUT_FILE\"\n\
         else\n\
           touch \"$marker\"\n\
           exit 1\n\
         fi\n",
    );
    let pipeline = ws.write_pipeline(
        "pipeline.json",
        r#"{"name": "retrying", "jobs": [{"id": "a", "agent": "echo", "retry": {"maxAttempts": 2, "backoff": "fixed", "delayMs": 10}}]}"#,
    );

    let output = ws.cmd(&worker).arg("--format").arg("json").arg("start").arg(&pipeline).output().unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let final_state: serde_json::Value = serde_json::from_str(last_json_line(&output.stdout)).unwrap();
    assert_eq!(final_state["status"], "completed");
    assert_eq!(final_state["jobs"]["a"]["attempts"], 2);
}

// Mid-run cancellation of a run still in-flight inside the same process is
// covered in-process by `agentpipe-scheduler`'s scenario tests (p6): a
// `cancel` invoked as a *separate* CLI process has no live handle for a run
// started by another `start` process and correctly reports `cancelled:
// false` — the engine instance that owns a run's control channel is the
// only one that can act on it (§2 "a single engine instance runs on one
// host"). That's exercised by `cancel_on_an_already_completed_run_is_idempotent`
// and `status_of_an_unknown_run_exits_with_code_three` above.

/// `start` prints one line per lifecycle event followed by the final run
/// state; the final state is the last JSON value on stdout.
fn last_json_line(stdout: &[u8]) -> &str {
    let text = std::str::from_utf8(stdout).expect("utf8 stdout");
    text.lines().filter(|l| !l.trim().is_empty()).last().expect("at least one line of output")
}
