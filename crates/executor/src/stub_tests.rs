// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use agentpipe_core::test_support::JobBuilder;

#[tokio::test]
async fn default_result_is_returned_when_nothing_scripted() {
    let executor = StubExecutor::succeeding();
    let job = JobBuilder::new("a").build();
    let ctx = Context::new();
    let result = executor.execute(&job, &ctx, ExecuteOptions::default()).await;
    assert!(result.is_success());
}

#[tokio::test]
async fn scripted_results_are_consumed_in_order() {
    let executor = StubExecutor::succeeding();
    executor.script("a", JobResult::Failure {
        kind: ErrorKind::WorkerFailed,
        message: "first attempt fails".to_string(),
        duration_ms: 0,
    });
    executor.script("a", JobResult::Success { output: serde_json::json!({"n": 1}), duration_ms: 0 });

    let job = JobBuilder::new("a").build();
    let ctx = Context::new();

    let first = executor.execute(&job, &ctx, ExecuteOptions::default()).await;
    assert!(!first.is_success());

    let second = executor.execute(&job, &ctx, ExecuteOptions::default()).await;
    assert!(second.is_success());

    let third = executor.execute(&job, &ctx, ExecuteOptions::default()).await;
    assert!(third.is_success(), "falls back to the default once the script is exhausted");
}

#[tokio::test]
async fn scripts_are_scoped_per_job_id() {
    let executor = StubExecutor::failing(ErrorKind::WorkerFailed);
    executor.script("a", JobResult::Success { output: serde_json::json!({}), duration_ms: 0 });

    let ctx = Context::new();
    let a = executor.execute(&JobBuilder::new("a").build(), &ctx, ExecuteOptions::default()).await;
    let b = executor.execute(&JobBuilder::new("b").build(), &ctx, ExecuteOptions::default()).await;

    assert!(a.is_success());
    assert!(!b.is_success());
}

#[tokio::test]
async fn cancelled_token_short_circuits_without_consuming_script() {
    let executor = StubExecutor::succeeding();
    executor.script("a", JobResult::Success { output: serde_json::json!({"n": 1}), duration_ms: 0 });

    let options = ExecuteOptions::default();
    options.cancel.cancel();

    let job = JobBuilder::new("a").build();
    let ctx = Context::new();
    let result = executor.execute(&job, &ctx, options).await;
    match result {
        JobResult::Failure { kind, .. } => assert_eq!(kind, ErrorKind::Cancelled),
        other => panic!("expected cancelled, got {other:?}"),
    }
}

#[tokio::test]
async fn calls_records_every_invocation_in_order() {
    let executor = StubExecutor::succeeding();
    let ctx = Context::new();
    executor.execute(&JobBuilder::new("a").build(), &ctx, ExecuteOptions::default()).await;
    executor.execute(&JobBuilder::new("b").build(), &ctx, ExecuteOptions::default()).await;
    executor.execute(&JobBuilder::new("a").build(), &ctx, ExecuteOptions::default()).await;
    assert_eq!(executor.calls(), vec!["a", "b", "a"]);
}
