// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The lifecycle event bus (§4.5, §6 "Event subscription").
//!
//! Publication is fire-and-forget: subscribers never block the scheduler,
//! and a slow subscriber may simply miss events — the persisted `RunState`
//! remains the source of truth (§4.5 "Event bus").

use agentpipe_core::RunId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// One of the nine named lifecycle events (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RunStarted,
    RunCompleted,
    RunFailed,
    RunCancelled,
    JobStarted,
    JobCompleted,
    JobFailed,
    JobSkipped,
    JobRetrying,
}

agentpipe_core::simple_display! {
    EventKind {
        RunStarted => "run.started",
        RunCompleted => "run.completed",
        RunFailed => "run.failed",
        RunCancelled => "run.cancelled",
        JobStarted => "job.started",
        JobCompleted => "job.completed",
        JobFailed => "job.failed",
        JobSkipped => "job.skipped",
        JobRetrying => "job.retrying",
    }
}

/// One lifecycle event record (§4.5): the `runId`, `jobId` where
/// applicable, a timestamp, and the new status spelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub run_id: RunId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub timestamp_ms: u64,
    pub status: String,
}

impl Event {
    pub fn run(kind: EventKind, run_id: RunId, status: impl Into<String>, timestamp_ms: u64) -> Self {
        Self { kind, run_id, job_id: None, timestamp_ms, status: status.into() }
    }

    pub fn job(
        kind: EventKind,
        run_id: RunId,
        job_id: impl Into<String>,
        status: impl Into<String>,
        timestamp_ms: u64,
    ) -> Self {
        Self { kind, run_id, job_id: Some(job_id.into()), timestamp_ms, status: status.into() }
    }
}

/// What a subscription listens for: a single [`EventKind`], or `"*"`
/// (every event), matching the control-API surface in §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    All,
    Kind(EventKind),
}

impl EventFilter {
    fn matches(&self, kind: EventKind) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Kind(k) => *k == kind,
        }
    }
}

/// Opaque handle returned by [`InMemoryEventBus::subscribe`], usable with
/// [`InMemoryEventBus::unsubscribe`]. Dropping the paired receiver has the
/// same effect lazily, the next time a publish finds the channel closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

struct Subscriber {
    filter: EventFilter,
    tx: mpsc::Sender<Event>,
}

/// Default channel depth per subscriber. A subscriber that falls this far
/// behind starts missing events rather than stalling the publisher.
const SUBSCRIBER_CHANNEL_CAPACITY: usize = 256;

/// In-process pub/sub hub. One instance is shared (via `Arc`) across the
/// scheduler and every embedder-registered subscriber.
#[derive(Default)]
pub struct InMemoryEventBus {
    subscribers: Mutex<HashMap<u64, Subscriber>>,
    next_id: AtomicU64,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in `filter`. Returns the subscription handle and a
    /// receiver that yields matching events as they're published.
    pub fn subscribe(&self, filter: EventFilter) -> (SubscriptionId, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().insert(id, Subscriber { filter, tx });
        (SubscriptionId(id), rx)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.lock().remove(&id.0);
    }

    /// Fire-and-forget publish. Never blocks: a full or closed subscriber
    /// channel is handled without waiting on the subscriber.
    pub fn publish(&self, event: Event) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|_, sub| {
            if !sub.filter.matches(event.kind) {
                return true;
            }
            match sub.tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!(kind = %event.kind, "event bus subscriber lagging, dropping event");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
