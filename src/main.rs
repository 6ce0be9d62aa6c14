//! Demo entry point: simulated transfers through the coordinator.

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

use task_coordinator::{
    Coordinator, CoordinatorConfig, DigestKeys, TaskContext, TaskError, TaskListener,
};

#[derive(Debug, Parser)]
#[command(
    name = "task-coordinator-demo",
    about = "Run simulated transfers through a task coordinator"
)]
struct Args {
    /// Number of transfers to submit
    #[arg(long, default_value_t = 6)]
    tasks: usize,

    /// Worker threads (overrides the config file)
    #[arg(long)]
    pool_size: Option<usize>,

    /// Chunks per transfer
    #[arg(long, default_value_t = 20)]
    steps: u64,

    /// Milliseconds per chunk
    #[arg(long, default_value_t = 25)]
    step_ms: u64,

    /// Cancel every Nth transfer (0 disables)
    #[arg(long, default_value_t = 3)]
    cancel_every: usize,

    /// Fail every Nth transfer (0 disables)
    #[arg(long, default_value_t = 5)]
    fail_every: usize,

    /// TOML coordinator config
    #[arg(long)]
    config: Option<PathBuf>,
}

struct LogListener {
    name: String,
}

impl TaskListener<String, u64> for LogListener {
    fn on_start(&self, _key: &String) {
        info!("{}: started", self.name);
    }

    fn on_success(&self, _key: &String, bytes: &u64) {
        info!("{}: finished, {} bytes", self.name, bytes);
    }

    fn on_failed(&self, _key: &String, error: &TaskError) {
        warn!("{}: failed: {}", self.name, error);
    }

    fn on_canceled(&self, _key: &String) {
        info!("{}: canceled", self.name);
    }
}

/// Simulated chunked transfer that polls for cancellation between chunks
fn transfer(
    steps: u64,
    step_ms: u64,
    fail: bool,
) -> impl FnOnce(&TaskContext<String>) -> Result<u64, TaskError> {
    move |ctx| {
        let mut bytes = 0;
        for step in 0..steps {
            ctx.check_canceled()?;
            if fail && step == steps / 2 {
                return Err(TaskError::failed("connection reset by peer"));
            }
            std::thread::sleep(Duration::from_millis(step_ms));
            bytes += 1024;
        }
        Ok(bytes)
    }
}

fn short(key: &str) -> &str {
    key.get(..8).unwrap_or(key)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CoordinatorConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CoordinatorConfig::default(),
    };
    if let Some(pool_size) = args.pool_size {
        config = config.with_pool_size(pool_size);
    }

    let coordinator: Coordinator<String, u64> = Coordinator::new(config)?;
    let mut events = coordinator.subscribe();
    coordinator.start();

    let mut pending = HashSet::new();
    for i in 0..args.tasks {
        let url = format!("http://mirror.example/files/{}.bin", i);
        let name = format!("transfer-{}", i);
        let key = DigestKeys::key_for(&[&url, &name]);

        if coordinator.find(&key).is_some() {
            warn!("{} already in flight, skipping", name);
            continue;
        }

        let fail = args.fail_every > 0 && i % args.fail_every == args.fail_every - 1;
        coordinator.submit_with(
            key.clone(),
            transfer(args.steps, args.step_ms, fail),
            LogListener { name },
        );
        pending.insert(key.clone());

        if args.cancel_every > 0 && i % args.cancel_every == args.cancel_every - 1 {
            coordinator.cancel(key);
        }
    }

    while !pending.is_empty() {
        match events.blocking_recv() {
            Ok(event) => {
                debug!("{} {}", event.event_name(), short(event.key()));
                if event.is_terminal() {
                    pending.remove(event.key());
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event stream lagged by {} events", skipped);
                pending.retain(|key| coordinator.find_finished(key).is_none());
            }
            Err(RecvError::Closed) => {
                error!("Coordinator event stream closed early");
                break;
            }
        }
    }

    let stats = coordinator.stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    coordinator.shutdown();
    Ok(())
}
