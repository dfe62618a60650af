// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess-spawning `AgentExecutor` (§4.3).

use crate::config::ExecutorConfig;
use crate::progress::parse_progress_line;
use crate::render::{append_worker_instructions, render};
use crate::scratch::ScratchDir;
use crate::{AgentExecutor, ExecuteOptions, JobResult};
use agentpipe_core::{Context, ErrorKind, Job};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

pub struct SubprocessExecutor {
    config: ExecutorConfig,
}

impl SubprocessExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl AgentExecutor for SubprocessExecutor {
    async fn execute(&self, job: &Job, context: &Context, options: ExecuteOptions) -> JobResult {
        let start = Instant::now();

        // Cancellation before spawn returns Cancelled without spawning (§4.3
        // "Cancellation semantics").
        if options.cancel.is_cancelled() {
            return JobResult::Failure {
                kind: ErrorKind::Cancelled,
                message: "cancelled before spawn".to_string(),
                duration_ms: start.elapsed().as_millis() as u64,
            };
        }

        match self.execute_inner(job, context, &options, start).await {
            Ok(result) => result,
            Err(engine_err) => JobResult::Failure {
                kind: engine_err.kind,
                message: engine_err.message,
                duration_ms: start.elapsed().as_millis() as u64,
            },
        }
    }
}

impl SubprocessExecutor {
    async fn execute_inner(
        &self,
        job: &Job,
        context: &Context,
        options: &ExecuteOptions,
        start: Instant,
    ) -> Result<JobResult, agentpipe_core::EngineError> {
        let agent_def_path = crate::resolve::resolve_agent_def(&self.config.agents_dir, &job.agent)?;
        let agent_def = std::fs::read_to_string(&agent_def_path).map_err(|e| {
            agentpipe_core::EngineError::new(
                ErrorKind::InternalExecutorError,
                format!("failed to read agent definition: {e}"),
            )
        })?;

        let rendered_task = render(&job.combined_prompt(), context);
        let prompt = format!("{agent_def}\n\n{rendered_task}");

        let execution_id = format!("{}-{}", job.id, nanoid::nanoid!(8));
        let (_root, context_file, _prompt_file, output_file) =
            ScratchDir::paths(&self.config.scratch_root, &execution_id);
        let prompt_with_instructions = append_worker_instructions(&prompt, &context_file, &output_file);
        let scratch = ScratchDir::create(
            &self.config.scratch_root,
            &execution_id,
            context,
            &prompt_with_instructions,
        )
        .await?;

        let result = self.spawn_and_await(job, &scratch, options, start).await;
        scratch.cleanup().await;
        result
    }

    async fn spawn_and_await(
        &self,
        job: &Job,
        scratch: &ScratchDir,
        options: &ExecuteOptions,
        start: Instant,
    ) -> Result<JobResult, agentpipe_core::EngineError> {
        let Some((program, args)) = self.config.worker_command.split_first() else {
            return Err(agentpipe_core::EngineError::new(
                ErrorKind::InternalExecutorError,
                "worker_command must name at least a program",
            ));
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg(&scratch.prompt_file)
            .env("AGENTPIPE_CONTEXT_FILE", &scratch.context_file)
            .env("AGENTPIPE_OUTPUT_FILE", &scratch.output_file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            agentpipe_core::EngineError::new(
                ErrorKind::InternalExecutorError,
                format!("failed to spawn worker: {e}"),
            )
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let progress = options.progress.clone();
        let stdout_task = stdout.map(|stdout| {
            tokio::spawn(watch_stream(stdout, progress.clone()))
        });
        let stderr_tail = std::sync::Arc::new(parking_lot::Mutex::new(Vec::<String>::new()));
        let stderr_task = stderr.map(|stderr| {
            tokio::spawn(collect_stderr_tail(stderr, stderr_tail.clone()))
        });

        let timeout = job
            .timeout
            .map(Duration::from_millis)
            .unwrap_or(self.config.default_timeout);

        tokio::select! {
            exit = child.wait() => {
                if let Some(t) = stdout_task { let _ = t.await; }
                if let Some(t) = stderr_task { let _ = t.await; }
                let status = exit.map_err(|e| agentpipe_core::EngineError::new(
                    ErrorKind::InternalExecutorError,
                    format!("failed to await worker: {e}"),
                ))?;
                self.finish(job, scratch, status.success(), stderr_tail, start).await
            }
            _ = tokio::time::sleep(timeout) => {
                self.terminate(&mut child, self.config.kill_grace).await;
                Ok(JobResult::Failure {
                    kind: ErrorKind::Timeout,
                    message: format!("job {} exceeded {}ms timeout", job.id, timeout.as_millis()),
                    duration_ms: start.elapsed().as_millis() as u64,
                })
            }
            _ = options.cancel.cancelled() => {
                self.terminate(&mut child, self.config.kill_grace).await;
                Ok(JobResult::Failure {
                    kind: ErrorKind::Cancelled,
                    message: format!("job {} cancelled", job.id),
                    duration_ms: start.elapsed().as_millis() as u64,
                })
            }
        }
    }

    /// Send a termination signal, then force-kill after the grace window
    /// (§4.3 step 6).
    async fn terminate(&self, child: &mut tokio::process::Child, grace: Duration) {
        let _ = child.start_kill();
        if tokio::time::timeout(grace, child.wait()).await.is_err() {
            let _ = child.kill().await;
        }
    }

    async fn finish(
        &self,
        job: &Job,
        scratch: &ScratchDir,
        success: bool,
        stderr_tail: std::sync::Arc<parking_lot::Mutex<Vec<String>>>,
        start: Instant,
    ) -> Result<JobResult, agentpipe_core::EngineError> {
        let duration_ms = start.elapsed().as_millis() as u64;
        if !success {
            let tail = stderr_tail.lock().join("\n");
            return Ok(JobResult::Failure {
                kind: ErrorKind::WorkerFailed,
                message: format!("worker for job {} exited non-zero: {tail}", job.id),
                duration_ms,
            });
        }

        match scratch.read_output().await {
            Ok(output) => Ok(JobResult::Success { output, duration_ms }),
            Err(e) => {
                let tail = stderr_tail.lock().join("\n");
                Ok(JobResult::Failure {
                    kind: e.kind,
                    message: format!("{}: stderr tail: {tail}", e.message),
                    duration_ms,
                })
            }
        }
    }
}

/// Scan each stdout line for a progress marker, forwarding any percentage
/// to the progress sink (§4.3 step 5).
async fn watch_stream(stream: impl tokio::io::AsyncRead + Unpin, progress: Option<crate::ProgressSink>) {
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(sink) = &progress {
            if let Some(pct) = parse_progress_line(&line) {
                sink.forward(pct);
            }
        }
    }
}

/// Keep the last handful of stderr lines for diagnostics on failure.
async fn collect_stderr_tail(
    stream: impl tokio::io::AsyncRead + Unpin,
    tail: std::sync::Arc<parking_lot::Mutex<Vec<String>>>,
) {
    const MAX_TAIL_LINES: usize = 20;
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut tail = tail.lock();
        tail.push(line);
        if tail.len() > MAX_TAIL_LINES {
            tail.remove(0);
        }
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
