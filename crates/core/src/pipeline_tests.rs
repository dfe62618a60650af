// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::test_support::{pipeline, JobBuilder};
use super::*;

#[test]
fn rejects_empty_name() {
    let p = pipeline("", vec![JobBuilder::new("a").build()]);
    let err = validate(&p).unwrap_err();
    assert_eq!(err.kind, crate::error::ErrorKind::InvalidPipeline);
}

#[test]
fn rejects_no_jobs() {
    let p = pipeline("p", vec![]);
    assert!(validate(&p).is_err());
}

#[test]
fn rejects_empty_job_id() {
    let mut job = JobBuilder::new("a").build();
    job.id = String::new();
    let p = pipeline("p", vec![job]);
    assert!(validate(&p).is_err());
}

#[test]
fn rejects_empty_agent() {
    let mut job = JobBuilder::new("a").build();
    job.agent = String::new();
    let p = pipeline("p", vec![job]);
    assert!(validate(&p).is_err());
}

#[test]
fn rejects_duplicate_job_ids() {
    let p = pipeline("p", vec![JobBuilder::new("a").build(), JobBuilder::new("a").build()]);
    assert!(validate(&p).is_err());
}

#[test]
fn rejects_unknown_dependency() {
    let p = pipeline("p", vec![JobBuilder::new("a").depends_on(&["ghost"]).build()]);
    let err = validate(&p).unwrap_err();
    assert!(err.message.contains("ghost"));
}

#[test]
fn accepts_valid_pipeline() {
    let p = pipeline(
        "p",
        vec![JobBuilder::new("a").build(), JobBuilder::new("b").depends_on(&["a"]).build()],
    );
    assert!(validate(&p).is_ok());
}

#[test]
fn revalidating_a_valid_pipeline_is_a_no_op() {
    let p = pipeline("p", vec![JobBuilder::new("a").build()]);
    assert!(validate(&p).is_ok());
    assert!(validate(&p).is_ok());
}

#[test]
fn empty_depends_on_same_as_omitted() {
    let mut job = JobBuilder::new("a").build();
    job.depends_on = DependsOn::Many(vec![]);
    assert!(job.depends_on_ids().is_empty());
    job.depends_on = DependsOn::None;
    assert!(job.depends_on_ids().is_empty());
}

#[test]
fn retry_delay_fixed() {
    let policy = RetryPolicy { max_attempts: 3, backoff: Backoff::Fixed, delay_ms: 100 };
    assert_eq!(policy.delay_for_attempt(1).as_millis(), 100);
    assert_eq!(policy.delay_for_attempt(3).as_millis(), 100);
}

#[test]
fn retry_delay_linear() {
    let policy = RetryPolicy { max_attempts: 3, backoff: Backoff::Linear, delay_ms: 100 };
    assert_eq!(policy.delay_for_attempt(1).as_millis(), 100);
    assert_eq!(policy.delay_for_attempt(3).as_millis(), 300);
}

#[test]
fn retry_delay_exponential() {
    let policy = RetryPolicy { max_attempts: 4, backoff: Backoff::Exponential, delay_ms: 2000 };
    assert_eq!(policy.delay_for_attempt(1).as_millis(), 2000);
    assert_eq!(policy.delay_for_attempt(2).as_millis(), 4000);
    assert_eq!(policy.delay_for_attempt(3).as_millis(), 8000);
}

#[test]
fn default_retry_policy_is_exponential_base_2000() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.backoff, Backoff::Exponential);
    assert_eq!(policy.delay_ms, 2000);
}

#[test]
fn job_combined_prompt_concatenates_task_and_prompt() {
    let mut job = JobBuilder::new("a").build();
    job.task = Some("do X".to_string());
    job.prompt = Some("please".to_string());
    assert_eq!(job.combined_prompt(), "do X\nplease");
}

#[test]
fn pipeline_json_round_trips() {
    let p = pipeline("p", vec![JobBuilder::new("a").depends_on(&[]).build()]);
    let json = serde_json::to_string(&p).unwrap();
    let back: Pipeline = serde_json::from_str(&json).unwrap();
    assert_eq!(back.name, p.name);
    assert_eq!(back.jobs.len(), 1);
}

#[test]
fn depends_on_deserializes_from_bare_string() {
    let json = r#"{"id":"b","agent":"a","dependsOn":"a"}"#;
    let job: Job = serde_json::from_str(json).unwrap();
    assert_eq!(job.depends_on_ids(), vec!["a"]);
}

#[test]
fn depends_on_deserializes_from_array() {
    let json = r#"{"id":"c","agent":"a","dependsOn":["a","b"]}"#;
    let job: Job = serde_json::from_str(json).unwrap();
    assert_eq!(job.depends_on_ids(), vec!["a", "b"]);
}
