//! storage-watchdog
//!
//! ```text
//!   ┌──────────────────────────── storage-watchdog ─────────────────────────────┐
//!   │                                                                           │
//!   │  config ──▶ storages ──▶ route rules ──▶ route table ◀──── broadcast      │
//!   │                │                             │                 ▲          │
//!   │                ▼                             ▼                 │          │
//!   │         watchdog per storage ──▶ acquire (route/attach/connect)│          │
//!   │                                              │                 │          │
//!   │                                              ▼                 │          │
//!   │                                   lag query ──▶ DataRow decode ┘          │
//!   │                                                                           │
//!   │  lifecycle: signals, hot reload, shutdown   observability: logs, metrics  │
//!   └───────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use storage_watchdog::config::{load_config, ConfigWatcher, PoolerConfig};
use storage_watchdog::lifecycle::startup::{build_runtime, reload, WatchdogSupervisor};
use storage_watchdog::lifecycle::{Signal, SignalListener};
use storage_watchdog::observability::{logging, metrics};

#[derive(Debug, Parser)]
#[command(
    name = "storage-watchdog",
    version,
    about = "Replication lag watchdog for pooled PostgreSQL storages"
)]
struct Cli {
    /// Path to the TOML configuration
    #[arg(short, long, default_value = "watchdog.toml")]
    config: PathBuf,

    /// Validate the configuration, print it as JSON and exit
    #[arg(long)]
    check: bool,

    /// Reload when the configuration file changes
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    if cli.check {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    logging::init_logging(&config.observability)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?cli.config,
        "storage-watchdog starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut runtime = build_runtime(&config)?;
    let mut supervisor = WatchdogSupervisor::new(runtime.table.clone(), runtime.backend.clone());
    supervisor.start(&runtime.registry).await?;

    let (watcher, mut updates) = ConfigWatcher::new(&cli.config);
    let _watcher = if cli.watch { Some(watcher.run()?) } else { None };
    let mut signals = SignalListener::new()?;

    loop {
        let next: Option<PoolerConfig> = tokio::select! {
            signal = signals.next() => match signal {
                Signal::Terminate => break,
                Signal::Reload => match load_config(&cli.config) {
                    Ok(config) => Some(config),
                    Err(e) => {
                        tracing::error!(error = %e, "Reload failed, keeping current configuration");
                        None
                    }
                },
            },
            Some(config) = updates.recv() => Some(config),
        };

        if let Some(config) = next {
            match reload(&config, &runtime.table, &mut supervisor).await {
                Ok(registry) => runtime.registry = registry,
                Err(e) => tracing::error!(error = %e, "Failed to apply configuration"),
            }
        }
    }

    tracing::info!("Shutting down");
    supervisor.stop().await;
    for mut server in runtime.table.drain_idle() {
        if let Some(io) = server.take_io() {
            if let Err(e) = io.terminate().await {
                tracing::debug!(server = %server.id(), error = %e, "Terminate failed");
            }
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
