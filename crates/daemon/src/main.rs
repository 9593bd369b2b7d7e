//! corpora-worker — the orchestration daemon.
//!
//! Wires the task engine, throttle registry, analyser pools, downloader,
//! and the recurring job scheduler, then ticks the scheduler until ctrl-c.
//! The two built-in jobs drive the download and analysis activation passes.

mod runners;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use corpora_analysis::{AnalyserManager, AnalyserRegistry, TextMetricsAnalyser};
use corpora_core::config::{Config, ExecutionMode};
use corpora_core::{DocumentStore, MemoryDocumentStore};
use corpora_engine::{TaskEngine, ThrottleRegistry};
use corpora_fetch::{Downloader, HttpSourceClient, SourceClient};
use corpora_jobs::{run_scheduler_loop, Job, JobRunnerRegistry, JobScheduler, JobStore, MemoryJobStore};

use runners::{ActivateAnalysesRunner, ActivateDownloadsRunner, ACTIVATE_ANALYSES, ACTIVATE_DOWNLOADS};

/// Document-work orchestration daemon.
#[derive(Parser, Debug)]
#[command(name = "corpora-worker", version, about)]
struct Cli {
    /// Path to a TOML config file. Falls back to environment variables.
    #[arg(long, env = "CORPORA_CONFIG")]
    config: Option<PathBuf>,

    /// Run the engine synchronously (single-tenant / debugging).
    #[arg(long)]
    sync: bool,

    /// Override the engine worker thread count.
    #[arg(long, env = "CORPORA_ENGINE_WORKERS")]
    workers: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    corpora_core::config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::from_toml_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::from_env(),
    };
    if cli.sync {
        config.engine.mode = ExecutionMode::Synchronous;
    }
    if let Some(workers) = cli.workers {
        config.engine.worker_threads = workers;
    }
    config.log_summary();

    // ── shared state ────────────────────────────────────────────────
    let engine = Arc::new(TaskEngine::new(&config.engine));
    let throttle = Arc::new(ThrottleRegistry::new());
    let documents: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    let jobs: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());

    let analysers = Arc::new(
        AnalyserRegistry::builder()
            .register(TextMetricsAnalyser::descriptor(), Box::new(|| Box::new(TextMetricsAnalyser)))
            .build()?,
    );

    let client: Arc<dyn SourceClient> = Arc::new(HttpSourceClient::new(&config.fetch)?);
    let downloader = Arc::new(Downloader::new(
        Arc::clone(&engine),
        Arc::clone(&throttle),
        client,
        Arc::clone(&documents),
        Duration::from_millis(config.fetch.host_min_interval_ms),
    ));
    let manager = Arc::new(AnalyserManager::new(
        Arc::clone(&engine),
        Arc::clone(&analysers),
        Arc::clone(&documents),
    ));

    // ── recurring jobs ──────────────────────────────────────────────
    let runners = Arc::new(
        JobRunnerRegistry::builder()
            .register(Arc::new(ActivateDownloadsRunner::new(
                Arc::clone(&downloader),
                config.jobs.activation_batch,
            )))
            .register(Arc::new(ActivateAnalysesRunner::new(
                Arc::clone(&manager),
                config.jobs.activation_batch,
            )))
            .build()?,
    );

    let scheduler = Arc::new(JobScheduler::new(Arc::clone(&jobs), runners, Arc::clone(&engine)));
    scheduler.load();
    if jobs.get(ACTIVATE_DOWNLOADS).is_none() {
        scheduler.add_job(Job::new(ACTIVATE_DOWNLOADS, ACTIVATE_DOWNLOADS, "* * * * *"))?;
    }
    if jobs.get(ACTIVATE_ANALYSES).is_none() {
        scheduler.add_job(Job::new(ACTIVATE_ANALYSES, ACTIVATE_ANALYSES, "* * * * *"))?;
    }
    info!(
        planned = scheduler.planned_job_count(),
        runners = scheduler.registered_runner_count(),
        "scheduler primed"
    );

    let loop_scheduler = Arc::clone(&scheduler);
    let poll = Duration::from_secs(config.jobs.poll_interval_seconds);
    let timer = tokio::spawn(run_scheduler_loop(loop_scheduler, poll));

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutdown requested");

    timer.abort();
    engine.shutdown();
    Ok(())
}
