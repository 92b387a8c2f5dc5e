//! Startup orchestration.
//!
//! # Responsibilities
//! - Build storages, route rules and the backend from configuration
//! - Start one watchdog task per watched storage
//! - Replace the whole watchdog generation on reload
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - A generation starts only if every watchdog in it could be built
//! - Stopping waits for every task of the generation to finish

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinSet;

use crate::config::loader::ConfigError;
use crate::config::PoolerConfig;
use crate::health::{LagWatchdog, WatchdogInitError, WatchdogStats, WatchdogStatsSnapshot};
use crate::lifecycle::shutdown::Shutdown;
use crate::net::{Backend, PgBackend};
use crate::router::table::build_rules;
use crate::router::{Router, RouteTable, RuleError};
use crate::storage::{StorageError, StorageRegistry};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error(transparent)]
    Watchdog(#[from] WatchdogInitError),
}

/// Everything the watchdogs run against.
pub struct Runtime {
    pub registry: StorageRegistry,
    pub table: Arc<RouteTable>,
    pub backend: Arc<dyn Backend>,
}

pub fn build_runtime(config: &PoolerConfig) -> Result<Runtime, StartupError> {
    let registry = StorageRegistry::from_config(&config.storages)?;
    let table = RouteTable::new(build_rules(&config.rules, &registry)?);
    tracing::info!(
        storages = registry.len(),
        rules = config.rules.len(),
        "Routing initialized"
    );
    Ok(Runtime {
        registry,
        table: Arc::new(table),
        backend: Arc::new(PgBackend::new(&config.timeouts)),
    })
}

struct Generation {
    shutdown: Shutdown,
    tasks: JoinSet<()>,
    stats: Vec<(String, Arc<WatchdogStats>)>,
}

/// Owns the running watchdog tasks.
pub struct WatchdogSupervisor {
    router: Arc<dyn Router>,
    backend: Arc<dyn Backend>,
    generation: Option<Generation>,
}

impl WatchdogSupervisor {
    pub fn new(router: Arc<dyn Router>, backend: Arc<dyn Backend>) -> Self {
        Self {
            router,
            backend,
            generation: None,
        }
    }

    /// Start a watchdog for every watched storage in `registry`.
    ///
    /// A running generation is stopped first, once every new watchdog
    /// has been built. If building fails the running one is left alone.
    pub async fn start(&mut self, registry: &StorageRegistry) -> Result<usize, StartupError> {
        let watchdogs = registry
            .watched()
            .map(|storage| {
                LagWatchdog::new(storage.clone(), self.router.clone(), self.backend.clone())
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.stop().await;

        let shutdown = Shutdown::new();
        let mut tasks = JoinSet::new();
        let mut stats = Vec::with_capacity(watchdogs.len());
        for watchdog in watchdogs {
            stats.push((watchdog.storage().to_string(), watchdog.stats()));
            tasks.spawn(watchdog.run(shutdown.subscribe()));
        }

        let count = stats.len();
        tracing::info!(watchdogs = count, "Watchdogs started");
        self.generation = Some(Generation {
            shutdown,
            tasks,
            stats,
        });
        Ok(count)
    }

    /// Signal every watchdog and wait for all of them.
    pub async fn stop(&mut self) {
        let Some(mut generation) = self.generation.take() else {
            return;
        };
        generation.shutdown.trigger();
        while let Some(result) = generation.tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Watchdog task failed");
            }
        }
        tracing::info!(watchdogs = generation.stats.len(), "Watchdogs stopped");
    }

    pub fn running(&self) -> usize {
        self.generation.as_ref().map_or(0, |g| g.tasks.len())
    }

    pub fn stats(&self) -> Vec<(String, WatchdogStatsSnapshot)> {
        self.generation.as_ref().map_or_else(Vec::new, |g| {
            g.stats.iter().map(|(name, s)| (name.clone(), s.snapshot())).collect()
        })
    }
}

/// Apply a new configuration: rebuild storages and rules, swap them into
/// `table`, restart the watchdogs. Returns the new registry.
pub async fn reload(
    config: &PoolerConfig,
    table: &RouteTable,
    supervisor: &mut WatchdogSupervisor,
) -> Result<StorageRegistry, StartupError> {
    let registry = StorageRegistry::from_config(&config.storages)?;
    let rules = build_rules(&config.rules, &registry)?;
    table.reload(rules);
    supervisor.start(&registry).await?;
    Ok(registry)
}
