//! Metrics collection and exposition.
//!
//! # Metrics
//! - `watchdog_replication_lag` (gauge): last lag per storage
//! - `watchdog_query_failures_total` (counter): failed or undecodable lag queries
//! - `watchdog_acquire_failures_total` (counter): by storage and stage
//! - `watchdog_broadcast_routes_total` (counter): route updates per storage

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::protocol::Lag;

/// Start the Prometheus endpoint and install it as the global recorder.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics exporter listening");
    Ok(())
}

pub fn record_lag(storage: &str, lag: Lag) {
    gauge!("watchdog_replication_lag", "storage" => storage.to_string()).set(lag as f64);
}

pub fn record_query_failure(storage: &str) {
    counter!("watchdog_query_failures_total", "storage" => storage.to_string()).increment(1);
}

pub fn record_acquire_failure(storage: &str, stage: &'static str) {
    counter!(
        "watchdog_acquire_failures_total",
        "storage" => storage.to_string(),
        "stage" => stage
    )
    .increment(1);
}

pub fn record_broadcast(storage: &str, routes: usize) {
    counter!("watchdog_broadcast_routes_total", "storage" => storage.to_string())
        .increment(routes as u64);
}
