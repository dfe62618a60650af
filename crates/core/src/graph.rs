// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency graph: adjacency list, cycle detection, readiness queries.

use crate::pipeline::Pipeline;
use crate::state::{JobStatus, RunState};
use std::collections::HashMap;

/// A cycle found by [`DependencyGraph::detect_cycles`].
///
/// `path` names the full cycle, in traversal order, closing back on its
/// first element — a strict superset of the spec's minimum requirement to
/// name only the cycle-closing edge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("circular dependency: {}", path.join(" -> "))]
pub struct CycleError {
    pub path: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Read-only adjacency list keyed by job ID, rebuilt fresh from the
/// [`Pipeline`] at run start (§4.2, §9 "Cyclic structures"). No mutable
/// graph state is retained across runs.
pub struct DependencyGraph {
    /// job id -> ids it depends on
    deps: HashMap<String, Vec<String>>,
    /// declaration order, used to make `ready_jobs` deterministic
    order: Vec<String>,
}

impl DependencyGraph {
    pub fn build(pipeline: &Pipeline) -> Self {
        let order: Vec<String> = pipeline.jobs.iter().map(|j| j.id.clone()).collect();
        let deps = pipeline
            .jobs
            .iter()
            .map(|j| {
                (
                    j.id.clone(),
                    j.depends_on_ids().into_iter().map(str::to_string).collect(),
                )
            })
            .collect();
        Self { deps, order }
    }

    pub fn dependencies_of(&self, job_id: &str) -> &[String] {
        self.deps.get(job_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// DFS with three-color marking. Fails on the first node found still on
    /// the current path, reporting the full cycle path.
    pub fn detect_cycles(&self) -> Result<(), CycleError> {
        let mut color: HashMap<&str, Color> =
            self.order.iter().map(|id| (id.as_str(), Color::White)).collect();
        let mut stack: Vec<String> = Vec::new();

        for start in &self.order {
            if color[start.as_str()] == Color::White {
                self.visit(start, &mut color, &mut stack)?;
            }
        }
        Ok(())
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        color: &mut HashMap<&'a str, Color>,
        stack: &mut Vec<String>,
    ) -> Result<(), CycleError> {
        color.insert(node, Color::Gray);
        stack.push(node.to_string());

        for dep in self.dependencies_of(node) {
            match color.get(dep.as_str()) {
                Some(Color::Gray) => {
                    let start = stack.iter().position(|n| n == dep).unwrap_or(0);
                    let mut path = stack[start..].to_vec();
                    path.push(dep.clone());
                    return Err(CycleError { path });
                }
                Some(Color::White) | None => {
                    self.visit(dep, color, stack)?;
                }
                Some(Color::Black) => {}
            }
        }

        stack.pop();
        color.insert(node, Color::Black);
        Ok(())
    }

    /// All jobs whose status is `Pending` and whose every dependency is
    /// `Completed` or `Skipped` (§4.2). Deterministic declaration order.
    pub fn ready_jobs(&self, run: &RunState) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| {
                let Some(job) = run.jobs.get(id.as_str()) else { return false };
                if job.status != JobStatus::Pending {
                    return false;
                }
                self.dependencies_of(id).iter().all(|dep| {
                    run.jobs
                        .get(dep.as_str())
                        .is_some_and(|d| matches!(d.status, JobStatus::Completed | JobStatus::Skipped))
                })
            })
            .cloned()
            .collect()
    }

    /// Jobs reachable now (deps all terminal) whose dependency set includes
    /// at least one `Failed` job — candidates for `Skipped(upstream_failed)`
    /// propagation (§4.4).
    pub fn upstream_failed_jobs(&self, run: &RunState) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| {
                let Some(job) = run.jobs.get(id.as_str()) else { return false };
                if job.status != JobStatus::Pending {
                    return false;
                }
                let deps = self.dependencies_of(id);
                let all_terminal = deps.iter().all(|dep| {
                    run.jobs.get(dep.as_str()).is_some_and(|d| d.status.is_terminal())
                });
                let any_failed = deps.iter().any(|dep| {
                    run.jobs.get(dep.as_str()).is_some_and(|d| d.status == JobStatus::Failed)
                });
                all_terminal && any_failed
            })
            .cloned()
            .collect()
    }

    pub fn declaration_order(&self) -> &[String] {
        &self.order
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
