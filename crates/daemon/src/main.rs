// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AutoPhone coordinator (autophoned): owns the Fleet Registry, Dispatcher,
//! Status Aggregator, and Command Server, and the tasks that glue them
//! together.

use autophone_adapters::{BuildEvent, BuildEventBus, BusError, HttpDownloader, Mailer, RealDeviceDriver};
use autophone_core::SystemClock;
use autophone_daemon::cli::Cli;
use autophone_daemon::{ctx::DaemonCtx, logging};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.into_config()?;

    logging::rotate_log_if_needed(&config);
    let _log_guard = logging::setup_logging(&config)?;

    tracing::info!(pid = std::process::id(), "starting autophoned");

    if !config.restarting {
        autophone_daemon::fleet::reset_cache(&config.cache_path)?;
    }

    let plugins = load_plugins(&config.test_path);

    let (status_tx, status_rx) = mpsc::channel(1024);
    let ctx = Arc::new(DaemonCtx {
        driver: Arc::new(RealDeviceDriver::default()),
        downloader: Arc::new(HttpDownloader::default()),
        plugins,
        notifier: Arc::new(Mailer::new(config.emailcfg_path.clone())),
        clock: Arc::new(SystemClock),
        status_tx,
        fleet: parking_lot::Mutex::new(std::collections::HashMap::new()),
        views: parking_lot::Mutex::new(std::collections::HashMap::new()),
        cmd_lock: tokio::sync::Mutex::new(()),
        start_time: std::time::Instant::now(),
        shutdown: Notify::new(),
        config,
    });

    if ctx.config.restarting {
        autophone_daemon::fleet::read_cache(&ctx)?;
        if ctx.config.reboot_phones {
            let fleet = ctx.fleet.lock();
            for entry in fleet.values() {
                entry.handle.reboot();
            }
        }
    }

    tokio::spawn(autophone_daemon::aggregator::run(ctx.clone(), status_rx));

    let addr: SocketAddr = format!("0.0.0.0:{}", ctx.config.port).parse()?;
    let command_server = autophone_daemon::command_server::CommandServer::bind(addr, ctx.clone())
        .map_err(|source| autophone_daemon::StartupError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    tracing::info!(%addr, "command server listening");
    tokio::spawn(command_server.run());

    spawn_build_event_pipeline(ctx.clone());

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    tokio::select! {
        _ = ctx.shutdown.notified() => tracing::info!("shutdown requested via command channel"),
        _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
    }

    tracing::info!("autophoned stopped");
    Ok(())
}

/// Loads the test-plugin manifest, wrapping each entry with a `command` into
/// a runnable [`autophone_adapters::ShellTestPlugin`]. Entries with no
/// `command` are logged and skipped: their suite has no implementation yet.
fn load_plugins(test_path: &std::path::Path) -> Vec<Arc<dyn autophone_adapters::TestPlugin>> {
    let entries = match autophone_adapters::load_manifest(test_path) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = %e, path = %test_path.display(), "could not load test manifest, running with no plugins");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|entry| match entry.command {
            Some(command) => Some(Arc::new(autophone_adapters::ShellTestPlugin::new(entry.name, command))
                as Arc<dyn autophone_adapters::TestPlugin>),
            None => {
                tracing::warn!(name = %entry.name, "test plugin has no command, skipping");
                None
            }
        })
        .collect()
}

/// Build-event bus with no upstream wired: the bus's internal workings are
/// out of scope (§6), so production startup defaults to a source that never
/// yields. Operators drive dispatch through `triggerjobs` until a real bus
/// client is configured.
struct NullBuildEventBus;

#[async_trait::async_trait]
impl BuildEventBus for NullBuildEventBus {
    async fn next_event(&self) -> Result<BuildEvent, BusError> {
        std::future::pending().await
    }
}

/// Models the bus callback as a one-way queue (§9 "Cyclic callback shape"):
/// a producer task blocks in `bus.next_event()` and forwards onto an
/// internal channel; the dispatcher consumes that channel on its own task,
/// so the bus client never re-enters the dispatcher directly.
fn spawn_build_event_pipeline(ctx: Arc<DaemonCtx>) {
    let bus: Arc<dyn BuildEventBus> = Arc::new(NullBuildEventBus);
    let (tx, mut rx) = mpsc::channel::<BuildEvent>(256);

    tokio::spawn(async move {
        loop {
            match bus.next_event().await {
                Ok(event) => {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                Err(_closed) => break,
            }
        }
    });

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            autophone_daemon::dispatcher::on_build(&ctx, event).await;
        }
    });
}
