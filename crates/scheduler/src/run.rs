// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-run state machine and scheduling loop (§4.4) — the heart of the
//! engine. One [`RunHandle`] is created per run by [`crate::Scheduler`] and
//! driven to completion by a single background task running [`run_loop`],
//! the sole writer over its [`RunState`] (§5 "Shared resources").

use agentpipe_core::{
    Clock, DependencyGraph, EngineError, ErrorKind, Job, JobFailure, JobStatus, Pipeline, RunId,
    RunState, RunStatus,
};
use agentpipe_executor::{AgentExecutor, CancelToken, ExecuteOptions, JobResult};
use agentpipe_storage::{Event, EventKind, InMemoryEventBus, StateStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Messages advancing the scheduling loop (§9 "Coroutine-style control
/// flow": each in-flight job is a record advanced by message-passing).
pub(crate) enum LoopEvent {
    Finished { job_id: String, result: JobResult },
    RetryReady { job_id: String },
    Cancel,
}

/// Capabilities the loop needs, bundled once per run.
pub(crate) struct LoopDeps<C: Clock> {
    pub executor: Arc<dyn AgentExecutor>,
    pub store: Arc<dyn StateStore>,
    pub events: Arc<InMemoryEventBus>,
    pub clock: C,
    pub max_concurrent_jobs: usize,
}

/// Live, in-process handle for one run. Holds the authoritative
/// [`RunState`] behind a `parking_lot::Mutex`; only [`run_loop`] (and the
/// narrow cancellation path it also owns) mutates it.
pub(crate) struct RunHandle {
    pub run_id: RunId,
    pub pipeline: Pipeline,
    pub graph: DependencyGraph,
    pub state: Mutex<RunState>,
    pub cancel_requested: AtomicBool,
    /// Cancel tokens for currently-`Running` jobs, keyed by job ID. Doubles
    /// as the admitted-pool membership set (§5 "Pool").
    pub job_cancels: Mutex<HashMap<String, CancelToken>>,
    /// Feeds [`LoopEvent`]s into the loop: job completions, retry-ready
    /// wakeups, and `cancel()` requests all go through this one channel.
    pub control_tx: mpsc::Sender<LoopEvent>,
    /// Retains its last value, so a `cancel()` caller that subscribes after
    /// the loop has already finished still observes completion instead of
    /// waiting forever (§4.4 "Wait for outstanding workers to unwind").
    pub done_rx: watch::Receiver<bool>,
}

impl RunHandle {
    pub fn is_terminal(&self) -> bool {
        self.state.lock().status.is_terminal()
    }

    pub async fn await_done(&self) {
        let mut rx = self.done_rx.clone();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}

async fn persist<C: Clock>(handle: &RunHandle, deps: &LoopDeps<C>) -> Result<(), EngineError> {
    let snapshot = handle.state.lock().clone();
    deps.store.save(&snapshot).await.map_err(EngineError::from)
}

fn emit<C: Clock>(
    deps: &LoopDeps<C>,
    handle: &RunHandle,
    kind: EventKind,
    job_id: Option<&str>,
    status: &str,
) {
    let timestamp_ms = deps.clock.epoch_ms();
    let event = match job_id {
        Some(id) => Event::job(kind, handle.run_id, id, status, timestamp_ms),
        None => Event::run(kind, handle.run_id, status, timestamp_ms),
    };
    deps.events.publish(event);
}

/// Best-effort terminal transition when persistence itself fails (§4.5
/// "When persist fires", §7 `StatePersistenceError`): the run is forced to
/// `Failed` even though the failing save is retried at most once more,
/// on a purely best-effort basis.
async fn force_failed<C: Clock>(handle: &RunHandle, deps: &LoopDeps<C>, cause: EngineError) {
    tracing::error!(run_id = %handle.run_id, error = %cause, "state persistence failed; forcing run to failed");
    {
        let mut state = handle.state.lock();
        state.status = RunStatus::Failed;
        state.completed_at_ms = Some(deps.clock.epoch_ms());
    }
    let _ = persist(handle, deps).await;
    emit(deps, handle, EventKind::RunFailed, None, "failed");
}

/// The scheduling loop (§4.4 "Scheduling loop"). Runs until the run reaches
/// a terminal status, then returns.
pub(crate) async fn run_loop<C: Clock + 'static>(
    handle: Arc<RunHandle>,
    deps: Arc<LoopDeps<C>>,
    mut rx: mpsc::Receiver<LoopEvent>,
    done_tx: watch::Sender<bool>,
) {
    loop {
        if let Err(e) = advance_ready_and_admit(&handle, &deps).await {
            force_failed(&handle, &deps, e).await;
            let _ = done_tx.send(true);
            return;
        }

        if handle.state.lock().all_terminal() {
            if let Err(e) = finalize(&handle, &deps).await {
                force_failed(&handle, &deps, e).await;
            }
            let _ = done_tx.send(true);
            return;
        }

        let Some(event) = rx.recv().await else {
            // No completions, retries, or cancel requests can ever arrive
            // again (every sender dropped) yet the run isn't terminal —
            // this only happens if every in-flight task died without
            // reporting, which `execute_job` below never does.
            break;
        };

        let result = match event {
            LoopEvent::Finished { job_id, result } => handle_finished(&handle, &deps, job_id, result).await,
            LoopEvent::RetryReady { job_id } => handle_retry_ready(&handle, &deps, job_id).await,
            LoopEvent::Cancel => handle_cancel(&handle, &deps).await,
        };

        if let Err(e) = result {
            force_failed(&handle, &deps, e).await;
            let _ = done_tx.send(true);
            return;
        }
    }
    let _ = done_tx.send(true);
}

/// Step 1 (readiness/skip/upstream-failure) and step 2-3 (admission) of the
/// scheduling loop, run every pass before awaiting the next event.
async fn advance_ready_and_admit<C: Clock>(
    handle: &Arc<RunHandle>,
    deps: &Arc<LoopDeps<C>>,
) -> Result<(), EngineError> {
    let ready = { handle.graph.ready_jobs(&handle.state.lock()) };
    for job_id in ready {
        let job = handle.pipeline.job(&job_id).expect("job id from graph exists in pipeline");
        let should_skip = job
            .when
            .as_deref()
            .map(|predicate| !agentpipe_core::eval_when(predicate, &handle.state.lock()))
            .unwrap_or(false);

        if should_skip {
            mark_skipped(handle, &job_id, agentpipe_core::SkipReason::PredicateFalse, deps.clock.epoch_ms());
        } else {
            let mut state = handle.state.lock();
            if let Some(js) = state.jobs.get_mut(&job_id) {
                js.status = JobStatus::Queued;
            }
        }
        persist(handle, deps).await?;
        if should_skip {
            emit(deps, handle, EventKind::JobSkipped, Some(&job_id), "skipped");
        }
    }

    let upstream_failed = { handle.graph.upstream_failed_jobs(&handle.state.lock()) };
    for job_id in upstream_failed {
        mark_skipped(handle, &job_id, agentpipe_core::SkipReason::UpstreamFailed, deps.clock.epoch_ms());
        persist(handle, deps).await?;
        emit(deps, handle, EventKind::JobSkipped, Some(&job_id), "skipped");
    }

    let capacity = deps
        .max_concurrent_jobs
        .saturating_sub(handle.job_cancels.lock().len());
    let queued: Vec<String> = {
        let state = handle.state.lock();
        handle
            .graph
            .declaration_order()
            .iter()
            .filter(|id| state.jobs.get(id.as_str()).map(|j| j.status == JobStatus::Queued).unwrap_or(false))
            .cloned()
            .collect()
    };

    for job_id in queued.into_iter().take(capacity) {
        admit(handle, deps, &job_id).await?;
    }

    Ok(())
}

fn mark_skipped(handle: &RunHandle, job_id: &str, reason: agentpipe_core::SkipReason, now: u64) {
    let mut state = handle.state.lock();
    if let Some(js) = state.jobs.get_mut(job_id) {
        js.status = JobStatus::Skipped;
        js.completed_at_ms = Some(now);
        js.skip_reason = Some(reason);
    }
}

async fn admit<C: Clock>(
    handle: &Arc<RunHandle>,
    deps: &Arc<LoopDeps<C>>,
    job_id: &str,
) -> Result<(), EngineError> {
    let job = handle.pipeline.job(job_id).expect("queued job exists in pipeline").clone();
    let context_snapshot = {
        let mut state = handle.state.lock();
        let now = deps.clock.epoch_ms();
        if let Some(js) = state.jobs.get_mut(job_id) {
            js.status = JobStatus::Running;
            js.attempts += 1;
            js.started_at_ms = Some(now);
        }
        state.context.snapshot()
    };
    persist(handle, deps).await?;
    emit(deps, handle, EventKind::JobStarted, Some(job_id), "running");

    let cancel = CancelToken::new();
    handle.job_cancels.lock().insert(job_id.to_string(), cancel.clone());

    spawn_execution(handle.clone(), deps.clone(), job, context_snapshot, cancel);
    Ok(())
}

fn spawn_execution<C: Clock + 'static>(
    handle: Arc<RunHandle>,
    deps: Arc<LoopDeps<C>>,
    job: Job,
    context: agentpipe_core::Context,
    cancel: CancelToken,
) {
    let control_tx = handle.control_tx.clone();
    let job_id = job.id.clone();
    tokio::spawn(async move {
        let options = ExecuteOptions { cancel, progress: None };
        let result = deps.executor.execute(&job, &context, options).await;
        let _ = control_tx.send(LoopEvent::Finished { job_id, result }).await;
    });
}

async fn handle_finished<C: Clock>(
    handle: &Arc<RunHandle>,
    deps: &Arc<LoopDeps<C>>,
    job_id: String,
    result: JobResult,
) -> Result<(), EngineError> {
    handle.job_cancels.lock().remove(&job_id);
    let now = deps.clock.epoch_ms();
    let cancelled_run = handle.cancel_requested.load(Ordering::SeqCst);

    enum Outcome {
        Completed,
        Retrying,
        Failed,
        Cancelled,
    }

    let outcome = {
        let mut state = handle.state.lock();
        let Some(js) = state.jobs.get_mut(&job_id) else {
            return Ok(());
        };

        if cancelled_run {
            js.status = JobStatus::Cancelled;
            js.completed_at_ms = Some(now);
            js.error = Some(JobFailure::new(ErrorKind::Cancelled, "run cancelled"));
            Outcome::Cancelled
        } else {
            match result {
                JobResult::Success { output, .. } => {
                    js.status = JobStatus::Completed;
                    js.completed_at_ms = Some(now);
                    js.output = Some(output.clone());
                    state.context.set_job_output(&job_id, output);
                    state.context.set_job_status(&job_id, "completed");
                    Outcome::Completed
                }
                JobResult::Failure { kind, message, .. } => {
                    let failure = JobFailure::new(kind, message);
                    let job_def = handle.pipeline.job(&job_id).expect("tracked job exists");
                    let retry = job_def.retry_policy();
                    if failure.is_retryable() && js.attempts < retry.max_attempts {
                        js.error = Some(failure);
                        js.status = JobStatus::Retrying;
                        Outcome::Retrying
                    } else {
                        js.error = Some(failure);
                        js.status = JobStatus::Failed;
                        js.completed_at_ms = Some(now);
                        state.context.set_job_status(&job_id, "failed");
                        Outcome::Failed
                    }
                }
            }
        }
    };

    persist(handle, deps).await?;

    match outcome {
        Outcome::Completed => emit(deps, handle, EventKind::JobCompleted, Some(&job_id), "completed"),
        Outcome::Failed => emit(deps, handle, EventKind::JobFailed, Some(&job_id), "failed"),
        Outcome::Cancelled => {} // no dedicated job.cancelled event in the lifecycle vocabulary (§4.5)
        Outcome::Retrying => {
            emit(deps, handle, EventKind::JobRetrying, Some(&job_id), "retrying");
            schedule_retry(handle.clone(), deps.clone(), job_id);
        }
    }

    Ok(())
}

/// Sleeps the computed backoff off the worker pool (§5 "a retrying job
/// vacates its slot during the wait"), then wakes the loop to requeue it.
fn schedule_retry<C: Clock + 'static>(handle: Arc<RunHandle>, deps: Arc<LoopDeps<C>>, job_id: String) {
    let delay = {
        let state = handle.state.lock();
        let attempts = state.jobs.get(&job_id).map(|j| j.attempts).unwrap_or(1);
        let job_def = handle.pipeline.job(&job_id).expect("tracked job exists");
        job_def.retry_policy().delay_for_attempt(attempts)
    };
    let control_tx = handle.control_tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = control_tx.send(LoopEvent::RetryReady { job_id }).await;
    });
}

async fn handle_retry_ready<C: Clock>(
    handle: &Arc<RunHandle>,
    deps: &Arc<LoopDeps<C>>,
    job_id: String,
) -> Result<(), EngineError> {
    let transitioned = {
        let mut state = handle.state.lock();
        match state.jobs.get_mut(&job_id) {
            Some(js) if js.status == JobStatus::Retrying => {
                js.status = JobStatus::Queued;
                true
            }
            // Already moved on (e.g. cancelled while waiting) — nothing to do.
            _ => false,
        }
    };
    if transitioned {
        persist(handle, deps).await?;
    }
    Ok(())
}

async fn handle_cancel<C: Clock>(handle: &Arc<RunHandle>, deps: &Arc<LoopDeps<C>>) -> Result<(), EngineError> {
    handle.cancel_requested.store(true, Ordering::SeqCst);
    let now = deps.clock.epoch_ms();
    {
        let mut state = handle.state.lock();
        state.status = RunStatus::Cancelled;
        for job in state.jobs.values_mut() {
            if matches!(job.status, JobStatus::Pending | JobStatus::Queued | JobStatus::Retrying) {
                job.status = JobStatus::Cancelled;
                job.completed_at_ms = Some(now);
                job.error = Some(JobFailure::new(ErrorKind::Cancelled, "run cancelled"));
            }
        }
    }
    for cancel in handle.job_cancels.lock().values() {
        cancel.cancel();
    }
    persist(handle, deps).await
}

/// Sets the final run status and emits the one terminal run event (§8
/// invariant 6: `run.completed`/`run.failed` fire at most once; likewise
/// `run.cancelled`). `handle_cancel` only sets the status to `Cancelled` —
/// the corresponding event fires here, the single place every run's
/// terminal event is emitted.
async fn finalize<C: Clock>(handle: &Arc<RunHandle>, deps: &Arc<LoopDeps<C>>) -> Result<(), EngineError> {
    let already_cancelled = handle.state.lock().status == RunStatus::Cancelled;
    let emitted_kind = {
        let mut state = handle.state.lock();
        let kind = if already_cancelled {
            None
        } else {
            let computed = state.terminal_run_status();
            state.status = computed;
            Some(match computed {
                RunStatus::Failed => EventKind::RunFailed,
                _ => EventKind::RunCompleted,
            })
        };
        state.completed_at_ms = Some(deps.clock.epoch_ms());
        kind
    };

    persist(handle, deps).await?;

    if already_cancelled {
        emit(deps, handle, EventKind::RunCancelled, None, "cancelled");
    } else if let Some(kind) = emitted_kind {
        let status = handle.state.lock().status.to_string();
        emit(deps, handle, kind, None, &status);
    }
    Ok(())
}
