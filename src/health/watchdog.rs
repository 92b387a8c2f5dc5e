//! Replication lag watchdog.
//!
//! # Responsibilities
//! - Periodically acquire a server of the watched storage
//! - Run the lag query, retrying up to `check_retry` times
//! - Reconnect before the next attempt when a query drops the connection
//! - Broadcast the decoded lag to every route of the storage
//!
//! # Design Decisions
//! - Acquisition failures restart at once (after yielding) without cooldown
//! - Shutdown is checked after acquiring, before every retry, and around
//!   the cooldown; an in-flight query is never abandoned halfway
//! - The internal client is released on every path

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;

use crate::client::InternalClient;
use crate::health::acquire::{acquire, AcquireError};
use crate::health::stats::WatchdogStats;
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::net::Backend;
use crate::observability::metrics;
use crate::protocol::{decode_lag_row, Lag};
use crate::router::{broadcast_heartbeat, Router};
use crate::storage::{AllocationError, StorageRule, Watchdog};

#[derive(Debug, Error)]
pub enum WatchdogInitError {
    #[error("storage '{0}' has no watchdog configured")]
    NotConfigured(String),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

/// Outcome of one outer iteration.
#[derive(Debug)]
pub enum Iteration {
    /// A lag was decoded and written to `routes` routes.
    Broadcast { lag: Lag, routes: usize },
    /// Every attempt failed.
    Exhausted,
    AcquireFailed(AcquireError),
    Cancelled,
}

pub struct LagWatchdog {
    storage: Arc<StorageRule>,
    settings: Watchdog,
    router: Arc<dyn Router>,
    backend: Arc<dyn Backend>,
    stats: Arc<WatchdogStats>,
}

impl LagWatchdog {
    pub fn new(
        storage: Arc<StorageRule>,
        router: Arc<dyn Router>,
        backend: Arc<dyn Backend>,
    ) -> Result<Self, WatchdogInitError> {
        let settings = storage
            .watchdog()
            .ok_or_else(|| WatchdogInitError::NotConfigured(storage.name().to_string()))?
            .try_copy()?;
        Ok(Self {
            storage,
            settings,
            router,
            backend,
            stats: Arc::new(WatchdogStats::new()),
        })
    }

    pub fn storage(&self) -> &str {
        self.storage.name()
    }

    pub fn stats(&self) -> Arc<WatchdogStats> {
        self.stats.clone()
    }

    /// Run until shutdown.
    pub async fn run(self, shutdown: broadcast::Receiver<()>) {
        let mut shutdown = ShutdownSignal::from(shutdown);
        tracing::info!(
            storage = %self.storage(),
            route_usr = %self.settings.route_usr(),
            route_db = %self.settings.route_db(),
            check_retry = self.settings.check_retry(),
            interval = ?self.settings.interval(),
            "Watchdog started"
        );

        loop {
            if shutdown.is_triggered() {
                break;
            }
            match self.run_iteration(&mut shutdown).await {
                Iteration::Cancelled => break,
                Iteration::AcquireFailed(_) => {
                    tokio::task::yield_now().await;
                    continue;
                }
                Iteration::Broadcast { .. } | Iteration::Exhausted => {}
            }
            if !self.cooldown(&mut shutdown).await {
                break;
            }
        }

        tracing::info!(storage = %self.storage(), "Watchdog stopped");
    }

    /// One acquire, query, release cycle.
    pub async fn run_iteration(&self, shutdown: &mut ShutdownSignal) -> Iteration {
        self.stats.record_iteration();
        let mut client = InternalClient::new(self.settings.route_usr(), self.settings.route_db());

        if let Err(e) = acquire(self.router.as_ref(), self.backend.as_ref(), &mut client).await {
            self.stats.record_acquire_failure();
            metrics::record_acquire_failure(self.storage(), e.stage());
            tracing::debug!(
                storage = %self.storage(),
                client = %client.id(),
                error = %e,
                "Watchdog could not acquire a server"
            );
            return Iteration::AcquireFailed(e);
        }

        let outcome = if shutdown.is_triggered() {
            Iteration::Cancelled
        } else {
            self.poll_lag(&mut client, shutdown).await
        };

        self.router.detach(&mut client);
        self.router.unroute(&mut client);
        outcome
    }

    async fn poll_lag(
        &self,
        client: &mut InternalClient,
        shutdown: &mut ShutdownSignal,
    ) -> Iteration {
        let storage = self.storage();
        let check_retry = self.settings.check_retry();
        let mut reconnect = false;

        for attempt in 1..=check_retry {
            if attempt > 1 && shutdown.is_triggered() {
                return Iteration::Cancelled;
            }
            let Some(server) = client.server_mut() else {
                break;
            };

            // a fatal query error dropped the connection
            if reconnect {
                if let Err(e) = self.backend.connect(server).await {
                    self.stats.record_query_failure();
                    metrics::record_query_failure(storage);
                    tracing::warn!(
                        storage,
                        attempt,
                        check_retry,
                        error = %e,
                        "Watchdog could not reconnect"
                    );
                    continue;
                }
                reconnect = false;
            }

            self.stats.record_query();
            let raw = match self.backend.send_query(server, self.settings.query()).await {
                Ok(raw) => raw,
                Err(e) => {
                    self.stats.record_query_failure();
                    metrics::record_query_failure(storage);
                    tracing::warn!(
                        storage,
                        attempt,
                        check_retry,
                        error = %e,
                        "Watchdog query failed"
                    );
                    reconnect = e.is_fatal();
                    continue;
                }
            };

            match decode_lag_row(&raw) {
                Ok(lag) => {
                    let routes = broadcast_heartbeat(self.router.as_ref(), storage, lag);
                    self.stats.record_broadcast(lag);
                    metrics::record_lag(storage, lag);
                    metrics::record_broadcast(storage, routes);
                    tracing::debug!(storage, lag, routes, attempt, "Replication lag updated");
                    return Iteration::Broadcast { lag, routes };
                }
                Err(e) => {
                    self.stats.record_decode_failure();
                    metrics::record_query_failure(storage);
                    tracing::warn!(
                        storage,
                        attempt,
                        check_retry,
                        error = %e,
                        "Watchdog response could not be decoded"
                    );
                }
            }
        }

        tracing::warn!(storage, check_retry, "Watchdog attempts exhausted");
        Iteration::Exhausted
    }

    /// Sleep `interval`. Returns false when shutdown came first.
    async fn cooldown(&self, shutdown: &mut ShutdownSignal) -> bool {
        self.stats.record_cooldown();
        tokio::select! {
            biased;
            _ = shutdown.recv() => false,
            _ = tokio::time::sleep(self.settings.interval()) => true,
        }
    }
}
