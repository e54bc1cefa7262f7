mod cli;
mod logger;

use crate::cli::{Cli, Commands};
use crate::logger::LOGGER;
use clap::Parser;
use log::{LevelFilter, error, info};
use lume_server::reload::{HostMessage, host_channel};
use lume_server::worker::{Worker, WorkerConfig, WorkerContext, WorkerMessage, run_stdio};
use lume_shared::LumeResult;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> LumeResult {
    let cli = Cli::parse();

    // Map verbosity count (-v, -vv) to log levels
    let log_level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log_level);
    }

    match cli.command {
        Commands::Cms { root, config } => {
            let config = config.map(|path| path.to_string_lossy().into_owned());
            let (worker, host_rx) = spawn_worker(root);
            run_host(worker, host_rx, config).await
        }
        Commands::Worker { root } => {
            let (worker, host_rx) = spawn_worker(root);
            let stdin = BufReader::new(tokio::io::stdin());
            run_stdio(worker, host_rx, stdin, tokio::io::stdout()).await
        }
    }
}

fn spawn_worker(root: PathBuf) -> (Arc<Worker>, mpsc::Receiver<HostMessage>) {
    let config = WorkerConfig::new().with_root(root);
    let (host, host_rx) = host_channel(config.host_capacity);
    let worker = Worker::new(WorkerContext::files(config), host);
    (Arc::new(worker), host_rx)
}

/// Hosts the worker in-process: builds once, then rebuilds on every reload
/// request until Ctrl-C.
async fn run_host(
    worker: Arc<Worker>,
    mut host_rx: mpsc::Receiver<HostMessage>,
    config: Option<String>,
) -> LumeResult {
    info!(target: "cms", "initializing...");
    worker
        .handle(WorkerMessage::Build {
            config: config.clone(),
        })
        .await?;

    loop {
        tokio::select! {
            message = host_rx.recv() => match message {
                Some(HostMessage::Reload) => {
                    // Reloads queued meanwhile are served by this rebuild.
                    while host_rx.try_recv().is_ok() {}

                    let rebuild = WorkerMessage::Rebuild { config: config.clone() };
                    if let Err(e) = worker.handle(rebuild).await {
                        error!(target: "cms", "Reload failed: {}", e);
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!(target: "cms", "shutting down...");
                break;
            }
        }
    }

    worker.shutdown().await;
    Ok(())
}
