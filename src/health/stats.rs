//! Watchdog counters.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

use crate::protocol::Lag;

/// Per-watchdog counters, updated lock-free from the watchdog task.
#[derive(Debug, Default)]
pub struct WatchdogStats {
    iterations: AtomicU64,
    acquire_failures: AtomicU64,
    queries: AtomicU64,
    query_failures: AtomicU64,
    decode_failures: AtomicU64,
    broadcasts: AtomicU64,
    cooldowns: AtomicU64,
    last_lag: AtomicI64,
}

impl WatchdogStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_acquire_failure(&self) {
        self.acquire_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_query_failure(&self) {
        self.query_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_broadcast(&self, lag: Lag) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.last_lag.store(lag, Ordering::Relaxed);
    }

    pub(crate) fn record_cooldown(&self) {
        self.cooldowns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WatchdogStatsSnapshot {
        WatchdogStatsSnapshot {
            iterations: self.iterations.load(Ordering::Relaxed),
            acquire_failures: self.acquire_failures.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
            query_failures: self.query_failures.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            cooldowns: self.cooldowns.load(Ordering::Relaxed),
            last_lag: self.last_lag.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`WatchdogStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WatchdogStatsSnapshot {
    /// Outer iterations started
    pub iterations: u64,
    pub acquire_failures: u64,
    /// Queries sent, retries included
    pub queries: u64,
    pub query_failures: u64,
    pub decode_failures: u64,
    pub broadcasts: u64,
    pub cooldowns: u64,
    /// Last lag broadcast, 0 before the first
    pub last_lag: Lag,
}
