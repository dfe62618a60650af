// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline, Job and RetryPolicy value objects, plus validation.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One or more dependency IDs. Deserializes from either a bare string or a
/// JSON array, matching the on-disk surface described in §6 ("single ID or
/// sequence of IDs").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependsOn {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

impl DependsOn {
    /// Normalized view: empty `dependsOn` and omitted `dependsOn` are
    /// identical (§8 boundary behavior).
    pub fn ids(&self) -> Vec<&str> {
        match self {
            DependsOn::None => Vec::new(),
            DependsOn::One(id) => vec![id.as_str()],
            DependsOn::Many(ids) => ids.iter().map(String::as_str).collect(),
        }
    }
}

/// Backoff strategy for a [`RetryPolicy`]. See §3 for the delay formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    Fixed,
    Linear,
    Exponential,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Exponential
    }
}

/// Retry policy attached to a job. The default when only `maxAttempts` is
/// given is exponential backoff with a 2000ms base (§3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(default)]
    pub backoff: Backoff,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_delay_ms() -> u64 {
    2000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 1, backoff: Backoff::Exponential, delay_ms: default_delay_ms() }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts, ..Self::default() }
    }

    /// The effective delay before the given 1-indexed attempt, per §3:
    /// fixed → `delayMs`; linear → `attempt·delayMs`;
    /// exponential → `delayMs·2^(attempt-1)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> std::time::Duration {
        let attempt = attempt.max(1);
        let ms = match self.backoff {
            Backoff::Fixed => self.delay_ms,
            Backoff::Linear => self.delay_ms.saturating_mul(attempt as u64),
            Backoff::Exponential => {
                self.delay_ms.saturating_mul(1u64 << (attempt - 1).min(62))
            }
        };
        std::time::Duration::from_millis(ms)
    }
}

/// One node in the pipeline DAG: one agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub agent: String,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub depends_on: DependsOn,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
    #[serde(default)]
    pub stage: Option<String>,
    /// Arbitrary agent-specific fields passed through opaque to the executor.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Job {
    /// `task` and `prompt` concatenated, the text the executor renders (§4.3).
    pub fn combined_prompt(&self) -> String {
        match (&self.task, &self.prompt) {
            (Some(t), Some(p)) => format!("{t}\n{p}"),
            (Some(t), None) => t.clone(),
            (None, Some(p)) => p.clone(),
            (None, None) => String::new(),
        }
    }

    pub fn depends_on_ids(&self) -> Vec<&str> {
        self.depends_on.ids()
    }

    /// The effective retry policy: `maxAttempts = 1` (no retries) when absent.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.unwrap_or(RetryPolicy { max_attempts: 1, ..RetryPolicy::default() })
    }
}

/// A trigger declaration. Opaque to the core — consumed only by the
/// out-of-scope webhook ingress (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub config: HashMap<String, serde_json::Value>,
}

/// A validated DAG of jobs plus metadata. Immutable after [`validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
    pub jobs: Vec<Job>,
}

impl Pipeline {
    pub fn job(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }
}

/// Checks, in order, from §4.1. Acyclicity is delegated to
/// [`crate::graph::DependencyGraph::detect_cycles`] by the caller.
pub fn validate(pipeline: &Pipeline) -> Result<(), EngineError> {
    if pipeline.name.trim().is_empty() {
        return Err(EngineError::invalid_pipeline("pipeline name must be non-empty"));
    }
    if pipeline.jobs.is_empty() {
        return Err(EngineError::invalid_pipeline("pipeline must declare at least one job"));
    }

    let mut seen = std::collections::HashSet::new();
    for job in &pipeline.jobs {
        if job.id.trim().is_empty() {
            return Err(EngineError::invalid_pipeline("job id must be non-empty"));
        }
        if job.agent.trim().is_empty() {
            return Err(
                EngineError::invalid_pipeline("job agent must be non-empty").with_job(&job.id)
            );
        }
        if !seen.insert(job.id.as_str()) {
            return Err(EngineError::invalid_pipeline(format!(
                "duplicate job id: {}",
                job.id
            ))
            .with_job(&job.id));
        }
    }

    let known: std::collections::HashSet<&str> =
        pipeline.jobs.iter().map(|j| j.id.as_str()).collect();
    for job in &pipeline.jobs {
        for dep in job.depends_on_ids() {
            if !known.contains(dep) {
                return Err(EngineError::invalid_pipeline(format!(
                    "job {} depends on unknown job {}",
                    job.id, dep
                ))
                .with_job(&job.id));
            }
        }
    }

    Ok(())
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;

    pub struct JobBuilder {
        id: String,
        agent: String,
        depends_on: DependsOn,
        when: Option<String>,
        retry: Option<RetryPolicy>,
        task: Option<String>,
    }

    impl JobBuilder {
        pub fn new(id: impl Into<String>) -> Self {
            Self {
                id: id.into(),
                agent: "stub-agent".to_string(),
                depends_on: DependsOn::None,
                when: None,
                retry: None,
                task: Some("do the thing".to_string()),
            }
        }

        pub fn depends_on(mut self, ids: &[&str]) -> Self {
            self.depends_on = DependsOn::Many(ids.iter().map(|s| s.to_string()).collect());
            self
        }

        pub fn when(mut self, predicate: impl Into<String>) -> Self {
            self.when = Some(predicate.into());
            self
        }

        pub fn retry(mut self, policy: RetryPolicy) -> Self {
            self.retry = Some(policy);
            self
        }

        pub fn agent(mut self, agent: impl Into<String>) -> Self {
            self.agent = agent.into();
            self
        }

        pub fn build(self) -> Job {
            Job {
                id: self.id.clone(),
                name: self.id,
                agent: self.agent,
                task: self.task,
                prompt: None,
                depends_on: self.depends_on,
                when: self.when,
                timeout: None,
                retry: self.retry,
                stage: None,
                extra: HashMap::new(),
            }
        }
    }

    pub fn pipeline(name: &str, jobs: Vec<Job>) -> Pipeline {
        Pipeline {
            name: name.to_string(),
            version: None,
            triggers: Vec::new(),
            env: HashMap::new(),
            context: HashMap::new(),
            jobs,
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
