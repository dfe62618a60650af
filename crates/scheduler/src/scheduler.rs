// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`Scheduler`]: the Control API (§6) over the per-run loop in [`crate::run`].

use crate::config::SchedulerConfig;
use crate::run::{run_loop, LoopDeps, LoopEvent, RunHandle};
use agentpipe_core::{
    Clock, Context, DependencyGraph, EngineError, JobStatus, Pipeline, RunId, RunState, RunStatus,
    SystemClock,
};
use agentpipe_executor::AgentExecutor;
use agentpipe_storage::{Event, EventFilter, EventKind, InMemoryEventBus, StateStore, SubscriptionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Capacity of the per-run control channel (completions, retry wakeups,
/// cancel requests). Generous: one job's lifecycle produces at most a
/// handful of messages, and the channel is drained continuously.
const CONTROL_CHANNEL_CAPACITY: usize = 1024;

/// The Run Scheduler (§4.4): owns every in-process [`RunHandle`] and
/// exposes the Control API (§6) — `startRun`, `status`, `progress`,
/// `cancel`, `list` — plus event subscription.
pub struct Scheduler<C: Clock = SystemClock> {
    executor: Arc<dyn AgentExecutor>,
    store: Arc<dyn StateStore>,
    events: Arc<InMemoryEventBus>,
    clock: C,
    config: SchedulerConfig,
    runs: Mutex<HashMap<RunId, Arc<RunHandle>>>,
}

impl<C: Clock + 'static> Scheduler<C> {
    pub fn new(
        executor: Arc<dyn AgentExecutor>,
        store: Arc<dyn StateStore>,
        events: Arc<InMemoryEventBus>,
        clock: C,
        config: SchedulerConfig,
    ) -> Self {
        Self { executor, store, events, clock, config, runs: Mutex::new(HashMap::new()) }
    }

    pub fn events(&self) -> &Arc<InMemoryEventBus> {
        &self.events
    }

    /// `startRun(pipeline, initialContext) → runId` (§4.4 "Start").
    pub async fn start_run(
        &self,
        pipeline: Pipeline,
        initial_context: HashMap<String, serde_json::Value>,
    ) -> Result<RunId, EngineError> {
        agentpipe_core::validate(&pipeline)?;
        let graph = DependencyGraph::build(&pipeline);
        graph.detect_cycles().map_err(|e| EngineError::invalid_pipeline(e.to_string()))?;

        let context = Context::merged(&pipeline.context, &initial_context);
        let run_id = RunId::new();
        let mut run_state = RunState::new(run_id, pipeline.clone(), context, self.clock.epoch_ms());
        run_state.status = RunStatus::Running;

        self.store.save(&run_state).await?;
        self.events.publish(Event::run(EventKind::RunStarted, run_id, "running", self.clock.epoch_ms()));

        self.spawn(run_state, graph, pipeline);
        Ok(run_id)
    }

    /// `status(runId)` (§6). Consults the live handle when the run is still
    /// in-process, falling back to the state store for historical runs.
    pub async fn status(&self, run_id: &RunId) -> Result<RunStatus, EngineError> {
        Ok(self.run_state(run_id).await?.status)
    }

    /// `progress(runId)` (§4.4): `100 * (completed + skipped) / total`.
    pub async fn progress(&self, run_id: &RunId) -> Result<u8, EngineError> {
        Ok(self.run_state(run_id).await?.progress())
    }

    /// A full snapshot of the run's current state.
    pub async fn run_state(&self, run_id: &RunId) -> Result<RunState, EngineError> {
        if let Some(handle) = self.runs.lock().get(run_id).cloned() {
            return Ok(handle.state.lock().clone());
        }
        self.store.load(run_id).await?.ok_or_else(|| EngineError::unknown_run(run_id))
    }

    /// `cancel(runId) → boolean` (§4.4). Idempotent on unknown or already
    /// terminal runs, which return `false` without touching any state.
    pub async fn cancel(&self, run_id: &RunId) -> Result<bool, EngineError> {
        let handle = self.runs.lock().get(run_id).cloned();
        let Some(handle) = handle else { return Ok(false) };
        if handle.is_terminal() {
            return Ok(false);
        }
        if handle.control_tx.send(LoopEvent::Cancel).await.is_err() {
            return Ok(false);
        }
        handle.await_done().await;
        Ok(true)
    }

    /// `list()` (§6): every run ID known to the state store.
    pub async fn list(&self) -> Result<Vec<RunId>, EngineError> {
        Ok(self.store.list().await?)
    }

    /// Restore non-terminal runs from the state store and resume their
    /// scheduling loops (§2 item 5, "optional recovery"). Jobs caught
    /// `Running` at crash time are requeued without consuming a retry
    /// attempt — they never reported a result, so nothing about their
    /// attempt count should change.
    pub async fn recover(&self) -> Result<Vec<RunId>, EngineError> {
        let mut resumed = Vec::new();
        for run_id in self.store.list().await? {
            if self.runs.lock().contains_key(&run_id) {
                continue;
            }
            let Some(mut run_state) = self.store.load(&run_id).await? else { continue };
            if run_state.status.is_terminal() {
                continue;
            }
            for job in run_state.jobs.values_mut() {
                if job.status == JobStatus::Running {
                    job.status = JobStatus::Queued;
                }
            }
            let pipeline = run_state.pipeline.clone();
            let graph = DependencyGraph::build(&pipeline);
            self.spawn(run_state, graph, pipeline);
            resumed.push(run_id);
        }
        Ok(resumed)
    }

    /// `subscribe(eventName|"*", handler)` (§6) — here, a typed
    /// [`EventFilter`] plus an `mpsc::Receiver` the caller polls.
    pub fn subscribe(&self, filter: EventFilter) -> (SubscriptionId, mpsc::Receiver<Event>) {
        self.events.subscribe(filter)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.events.unsubscribe(id);
    }

    fn spawn(&self, run_state: RunState, graph: DependencyGraph, pipeline: Pipeline) -> Arc<RunHandle> {
        let (control_tx, control_rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
        let (done_tx, done_rx) = watch::channel(false);
        let run_id = run_state.run_id;

        let handle = Arc::new(RunHandle {
            run_id,
            pipeline,
            graph,
            state: Mutex::new(run_state),
            cancel_requested: AtomicBool::new(false),
            job_cancels: Mutex::new(HashMap::new()),
            control_tx,
            done_rx,
        });

        let deps = Arc::new(LoopDeps {
            executor: self.executor.clone(),
            store: self.store.clone(),
            events: self.events.clone(),
            clock: self.clock.clone(),
            max_concurrent_jobs: self.config.max_concurrent_jobs.max(1),
        });

        self.runs.lock().insert(run_id, handle.clone());
        tokio::spawn(run_loop(handle.clone(), deps, control_rx, done_tx));
        handle
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
