// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `agentpipe`: the reference embedder of the Control API — loads a
//! pipeline from a JSON file, wires a [`Scheduler`] to a file-backed state
//! store and a subprocess agent executor, and exposes `start`, `status`,
//! `progress`, `cancel`, `list` and `watch` as subcommands.

mod color;
mod commands;
mod exit_error;
mod output;

use agentpipe_core::{ErrorKind, SystemClock};
use agentpipe_executor::{ExecutorConfig, SubprocessExecutor};
use agentpipe_scheduler::{Scheduler, SchedulerConfig};
use agentpipe_storage::{FileStateStore, InMemoryEventBus};
use clap::{Parser, Subcommand};
use exit_error::ExitError;
use output::OutputFormat;
use std::path::PathBuf;
use std::sync::Arc;

/// Dependency-aware DAG pipeline orchestrator for AI-agent subprocess workers.
#[derive(Parser)]
#[command(name = "agentpipe", version, about, styles = color::styles())]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding one `<runId>.json` file per run.
    #[arg(long, global = true, default_value = "./.agentpipe/runs", env = "AGENTPIPE_STATE_DIR")]
    state_dir: PathBuf,

    /// Directory searched for agent definition files.
    #[arg(long, global = true, default_value = "./agents", env = "AGENTPIPE_AGENTS_DIR")]
    agents_dir: PathBuf,

    /// Root under which per-execution scratch directories are created.
    /// Defaults to a subdirectory of the system temp directory.
    #[arg(long, global = true, env = "AGENTPIPE_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Command used to spawn the worker process; the rendered prompt file
    /// path is appended as its final argument.
    #[arg(
        long,
        global = true,
        num_args = 1..,
        default_value = "agentpipe-worker",
        env = "AGENTPIPE_WORKER_COMMAND"
    )]
    worker_command: Vec<String>,

    /// Bounded worker pool size.
    #[arg(long, global = true, default_value_t = 3, env = "AGENTPIPE_MAX_CONCURRENT_JOBS")]
    max_concurrent_jobs: usize,

    /// Output rendering for every subcommand.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Command {
    /// Validate, start and run a pipeline to completion, streaming its
    /// lifecycle events as they arrive.
    Start {
        /// Path to a pipeline definition, as JSON.
        pipeline: PathBuf,
        /// Optional JSON object merged into the run's initial context.
        #[arg(long)]
        context: Option<PathBuf>,
    },
    /// Print a run's full state.
    Status { run_id: String },
    /// Print a run's completion percentage.
    Progress { run_id: String },
    /// Request cancellation of a run.
    Cancel { run_id: String },
    /// List every run known to the state store.
    List,
    /// Subscribe to every lifecycle event and print them as they arrive.
    Watch,
}

fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(dispatch(cli)) {
        let exit = classify(err);
        eprintln!("error: {}", exit.message);
        std::process::exit(exit.code);
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let scheduler = build_scheduler(&cli);
    match cli.command {
        Command::Start { pipeline, context } => {
            commands::start::run(&scheduler, &pipeline, context.as_deref(), cli.format).await
        }
        Command::Status { run_id } => commands::status::run(&scheduler, &run_id, cli.format).await,
        Command::Progress { run_id } => commands::progress::run(&scheduler, &run_id, cli.format).await,
        Command::Cancel { run_id } => commands::cancel::run(&scheduler, &run_id, cli.format).await,
        Command::List => commands::list::run(&scheduler, cli.format).await,
        Command::Watch => commands::watch::run(&scheduler, cli.format).await,
    }
}

fn build_scheduler(cli: &Cli) -> Scheduler<SystemClock> {
    let executor_config = ExecutorConfig {
        agents_dir: cli.agents_dir.clone(),
        scratch_root: cli.scratch_dir.clone().unwrap_or_else(|| std::env::temp_dir().join("agentpipe")),
        worker_command: cli.worker_command.clone(),
        ..ExecutorConfig::default()
    };
    let executor = Arc::new(SubprocessExecutor::new(executor_config));
    let store = Arc::new(FileStateStore::new(cli.state_dir.clone()));
    let events = Arc::new(InMemoryEventBus::new());
    let config = SchedulerConfig { max_concurrent_jobs: cli.max_concurrent_jobs.max(1) };
    Scheduler::new(executor, store, events, SystemClock, config)
}

/// Maps an [`agentpipe_core::EngineError`] to a distinct exit code where one
/// is useful for scripting; everything else is a generic failure.
fn classify(err: anyhow::Error) -> ExitError {
    if let Some(engine_err) = err.downcast_ref::<agentpipe_core::EngineError>() {
        let code = match engine_err.kind {
            ErrorKind::InvalidPipeline => 2,
            ErrorKind::UnknownRun => 3,
            _ => 1,
        };
        return ExitError::new(code, engine_err.to_string());
    }
    if let Some(exit_err) = err.downcast_ref::<ExitError>() {
        return ExitError::new(exit_err.code, exit_err.message.clone());
    }
    ExitError::new(1, err.to_string())
}
