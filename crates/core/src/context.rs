// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The mutable run context: a mapping from strings to arbitrary values,
//! exclusively owned by `RunState`, read via dotted-path lookup.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A mapping from strings to arbitrary JSON values (§3 "Context").
///
/// Writes happen only in the scheduler, under `jobs.<id>.output` and
/// `jobs.<id>.status` paths. Executors receive read-only snapshots produced
/// by [`Context::snapshot`], which is a value copy — mutations inside a
/// worker never reach the owning `RunState`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    values: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: HashMap<String, Value>) -> Self {
        Self { values }
    }

    /// Compose pipeline-default context with caller-supplied initial
    /// context; caller overrides win (§4.4 "Start").
    pub fn merged(defaults: &HashMap<String, Value>, overrides: &HashMap<String, Value>) -> Self {
        let mut values = defaults.clone();
        for (k, v) in overrides {
            values.insert(k.clone(), v.clone());
        }
        Self { values }
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Set `jobs.<id>.output` and `jobs.<id>.status`, the only paths the
    /// scheduler writes under (§3).
    pub fn set_job_output(&mut self, job_id: &str, output: Value) {
        let jobs = self.values.entry("jobs".to_string()).or_insert_with(|| Value::Object(Default::default()));
        if let Value::Object(map) = jobs {
            let entry = map.entry(job_id).or_insert_with(|| Value::Object(Default::default()));
            if let Value::Object(job_map) = entry {
                job_map.insert("output".to_string(), output);
            }
        }
    }

    pub fn set_job_status(&mut self, job_id: &str, status: &str) {
        let jobs = self.values.entry("jobs".to_string()).or_insert_with(|| Value::Object(Default::default()));
        if let Value::Object(map) = jobs {
            let entry = map.entry(job_id).or_insert_with(|| Value::Object(Default::default()));
            if let Value::Object(job_map) = entry {
                job_map.insert("status".to_string(), Value::String(status.to_string()));
            }
        }
    }

    /// Resolve a dotted path (`a.b.c`) against the mapping. Returns `None`
    /// for any unresolved segment — callers decide what "unresolved" means
    /// (the interpolator leaves the placeholder literal; the predicate
    /// evaluator treats it as false).
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.values.get(first)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// A value copy suitable for handing to an executor as a read-only
    /// snapshot (§4.3 step 3, §5 "Shared resources").
    pub fn snapshot(&self) -> Context {
        self.clone()
    }

    pub fn as_map(&self) -> &HashMap<String, Value> {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
