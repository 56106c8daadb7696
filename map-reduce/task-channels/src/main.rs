// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

mod orchestrator;

use anyhow::Context;
use clap::Parser;
use map_reduce_shuffle::{CleanupPolicy, JobConfig};
use orchestrator::Orchestrator;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Word count over a set of input files, one map task per file
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON job description; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    job_name: Option<String>,

    /// Number of reduce tasks
    #[arg(short, long)]
    reduce_count: Option<usize>,

    /// Directory holding shards and outputs
    #[arg(short, long)]
    work_dir: Option<PathBuf>,

    /// Tasks running at the same time within a phase
    #[arg(short, long)]
    max_workers: Option<usize>,

    /// Remove each reduce task's shards once its output is written
    #[arg(long)]
    remove_shards: bool,

    /// Input files
    inputs: Vec<PathBuf>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<JobConfig> {
        let mut config = match &self.config {
            Some(path) => JobConfig::load(path)?,
            None => JobConfig {
                job_name: "wc".to_string(),
                inputs: Vec::new(),
                reduce_count: 10,
                work_dir: PathBuf::from("mr-work"),
                max_workers: 4,
                cleanup: CleanupPolicy::Retain,
            },
        };

        if let Some(job_name) = self.job_name {
            config.job_name = job_name;
        }
        if let Some(reduce_count) = self.reduce_count {
            config.reduce_count = reduce_count;
        }
        if let Some(work_dir) = self.work_dir {
            config.work_dir = work_dir;
        }
        if let Some(max_workers) = self.max_workers {
            config.max_workers = max_workers;
        }
        if self.remove_shards {
            config.cleanup = CleanupPolicy::RemoveShards;
        }
        if !self.inputs.is_empty() {
            config.inputs = self.inputs;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let start_time = Instant::now();

    let config = Args::parse().into_config().context("invalid job configuration")?;
    info!(
        job = %config.job_name,
        inputs = config.map_count(),
        reducers = config.reduce_count,
        workers = config.max_workers,
        work_dir = %config.work_dir.display(),
        cleanup = ?config.cleanup,
        "configuration loaded"
    );

    let orchestrator = Orchestrator::new(config)?;

    let cancel_token = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received, no further tasks will be dispatched");
            cancel_token.cancel();
        }
    });

    let records = orchestrator.run().await?;

    println!("\n=== RESULTS ===");
    let mut by_count: Vec<_> = records
        .iter()
        .map(|r| (r.key.as_str(), r.value.parse::<u64>().unwrap_or(0)))
        .collect();
    by_count.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    for (word, count) in by_count.iter().take(20) {
        println!("{}: {}", word, count);
    }
    if by_count.len() > 20 {
        println!("... ({} more words)", by_count.len() - 20);
    }

    println!("\nTotal time: {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(())
}
