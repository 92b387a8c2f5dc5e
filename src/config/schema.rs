//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the watchdog.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PoolerConfig {
    /// Storage backends (`[[storage]]` tables).
    #[serde(rename = "storage")]
    pub storages: Vec<StorageConfig>,

    /// Routing rules (`[[rule]]` tables).
    #[serde(rename = "rule")]
    pub rules: Vec<RuleConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// One storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Unique storage identifier.
    pub name: String,

    /// Storage type: `remote` or `local`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Backend host; absent means the local machine.
    pub host: Option<String>,

    pub port: u16,

    /// Maximum clients concurrently routed through one route of this
    /// storage (0 = unlimited).
    pub server_max_routing: usize,

    /// TLS mode (`disable`, `allow`, `require`, `verify_ca`, `verify_full`).
    pub tls: Option<String>,
    pub tls_ca_file: Option<String>,
    pub tls_cert_file: Option<String>,
    pub tls_key_file: Option<String>,
    pub tls_protocols: Option<String>,

    /// Optional lag polling watchdog.
    pub watchdog: Option<WatchdogConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: "remote".to_string(),
            host: None,
            port: 5432,
            server_max_routing: 0,
            tls: None,
            tls_ca_file: None,
            tls_cert_file: None,
            tls_key_file: None,
            tls_protocols: None,
            watchdog: None,
        }
    }
}

/// Lag polling watchdog of a storage.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Monitoring query; must return one row with one integer column.
    pub query: String,

    /// User of the internal route the watchdog connects through.
    pub route_usr: String,

    /// Database of the internal route the watchdog connects through.
    pub route_db: String,

    /// Query attempts per iteration.
    pub check_retry: u32,

    /// Cooldown between iterations in milliseconds.
    pub interval_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            query: String::new(),
            route_usr: String::new(),
            route_db: String::new(),
            check_retry: 10,
            interval_ms: 1000,
        }
    }
}

/// Routing rule mapping a user/database pair to a storage.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleConfig {
    /// User to match (`*` matches any).
    #[serde(default = "wildcard")]
    pub user: String,

    /// Database to match (`*` matches any).
    #[serde(default = "wildcard")]
    pub database: String,

    /// Storage name this rule routes to.
    pub storage: String,

    /// Maximum server connections per route (0 = unlimited).
    #[serde(default)]
    pub pool_size: usize,
}

fn wildcard() -> String {
    "*".to_string()
}

/// Timeout configuration for backend I/O.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment (including startup handshake) in milliseconds.
    pub connect_ms: u64,

    /// Single query round trip in milliseconds.
    pub query_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 5000,
            query_ms: 3000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
