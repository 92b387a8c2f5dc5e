//! Storage rule value type.
//!
//! # Responsibilities
//! - Describe one configured backend (name, kind, address, TLS, watchdog)
//! - Deep-copy itself for every route rule that references it
//! - Release everything it owns on drop
//!
//! # Design Decisions
//! - Strings are duplicated through fallible allocation so a copy under
//!   memory pressure reports `AllocationError` instead of aborting
//! - A failed copy is dropped before the error is returned

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::config::StorageConfig;
use crate::storage::tls::{TlsMode, TlsOpts};
use crate::storage::watchdog::{Watchdog, WatchdogError};

/// Memory could not be reserved while copying a storage rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("allocation of {requested} bytes failed")]
pub struct AllocationError {
    pub requested: usize,
}

/// Errors raised while constructing a storage rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage name is empty")]
    EmptyName,
    #[error("storage '{storage}' has an empty type")]
    EmptyType { storage: String },
    #[error("storage '{storage}' has unknown type '{kind}'")]
    UnknownType { storage: String, kind: String },
    #[error("storage '{storage}' has unknown tls mode '{mode}'")]
    UnknownTlsMode { storage: String, mode: String },
    #[error("storage '{storage}' watchdog: {source}")]
    Watchdog {
        storage: String,
        #[source]
        source: WatchdogError,
    },
    #[error("storage '{storage}' is local and cannot be watched")]
    WatchdogOnLocal { storage: String },
    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

/// Where a storage lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// A PostgreSQL server reached over the network.
    Remote,
    /// Served by the pooler itself (admin console); has no backend socket.
    Local,
}

impl FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "remote" => Ok(StorageType::Remote),
            "local" => Ok(StorageType::Local),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::Remote => f.write_str("remote"),
            StorageType::Local => f.write_str("local"),
        }
    }
}

/// A configured storage backend.
#[derive(Debug, PartialEq, Eq)]
pub struct StorageRule {
    name: String,
    storage_type: StorageType,
    type_label: String,
    host: Option<String>,
    port: u16,
    server_max_routing: usize,
    tls_opts: TlsOpts,
    watchdog: Option<Watchdog>,
}

impl StorageRule {
    /// Default PostgreSQL port.
    pub const DEFAULT_PORT: u16 = 5432;

    /// Create a storage with empty TLS options and no watchdog.
    pub fn new(
        name: impl Into<String>,
        type_label: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let name = name.into();
        let type_label = type_label.into();
        if name.is_empty() {
            return Err(StorageError::EmptyName);
        }
        if type_label.is_empty() {
            return Err(StorageError::EmptyType { storage: name });
        }
        let storage_type = type_label
            .parse::<StorageType>()
            .map_err(|kind| StorageError::UnknownType {
                storage: name.clone(),
                kind,
            })?;

        Ok(Self {
            name,
            storage_type,
            type_label,
            host: None,
            port: Self::DEFAULT_PORT,
            server_max_routing: 0,
            tls_opts: TlsOpts::default(),
            watchdog: None,
        })
    }

    /// Build a storage from its configuration entry.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut rule = Self::new(config.name.clone(), config.kind.clone())?;
        rule.host = config.host.clone().filter(|h| !h.is_empty());
        rule.port = config.port;
        rule.server_max_routing = config.server_max_routing;

        let mode = match config.tls.as_deref() {
            Some(mode) => mode.parse::<TlsMode>().map_err(|mode| StorageError::UnknownTlsMode {
                storage: rule.name.clone(),
                mode,
            })?,
            None => TlsMode::Disable,
        };
        rule.tls_opts = TlsOpts {
            mode,
            tls: non_empty(&config.tls),
            ca_file: non_empty(&config.tls_ca_file),
            cert_file: non_empty(&config.tls_cert_file),
            key_file: non_empty(&config.tls_key_file),
            protocols: non_empty(&config.tls_protocols),
        };

        if let Some(wd) = &config.watchdog {
            let watchdog = Watchdog::new(&*wd.query, &*wd.route_usr, &*wd.route_db)
                .and_then(|w| w.with_check_retry(wd.check_retry))
                .and_then(|w| w.with_interval(Duration::from_millis(wd.interval_ms)))
                .map_err(|source| StorageError::Watchdog {
                    storage: rule.name.clone(),
                    source,
                })?;
            rule.set_watchdog(Some(watchdog))?;
        }

        Ok(rule)
    }

    /// Deep copy. Unset optional fields stay unset; the copy is either
    /// complete or not produced at all.
    pub fn try_copy(&self) -> Result<Self, AllocationError> {
        Ok(Self {
            name: dup_str(&self.name)?,
            storage_type: self.storage_type,
            type_label: dup_str(&self.type_label)?,
            host: dup_opt(self.host.as_deref())?,
            port: self.port,
            server_max_routing: self.server_max_routing,
            tls_opts: self.tls_opts.try_copy()?,
            watchdog: self.watchdog.as_ref().map(Watchdog::try_copy).transpose()?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage_type(&self) -> StorageType {
        self.storage_type
    }

    pub fn type_label(&self) -> &str {
        &self.type_label
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn set_host(&mut self, host: Option<String>) {
        self.host = host;
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    pub fn server_max_routing(&self) -> usize {
        self.server_max_routing
    }

    pub fn set_server_max_routing(&mut self, cap: usize) {
        self.server_max_routing = cap;
    }

    pub fn tls_opts(&self) -> &TlsOpts {
        &self.tls_opts
    }

    pub fn tls_opts_mut(&mut self) -> &mut TlsOpts {
        &mut self.tls_opts
    }

    pub fn watchdog(&self) -> Option<&Watchdog> {
        self.watchdog.as_ref()
    }

    /// Attach or remove the watchdog. Local storage cannot be watched.
    pub fn set_watchdog(&mut self, watchdog: Option<Watchdog>) -> Result<(), StorageError> {
        if watchdog.is_some() && self.storage_type == StorageType::Local {
            return Err(StorageError::WatchdogOnLocal {
                storage: self.name.clone(),
            });
        }
        self.watchdog = watchdog;
        Ok(())
    }

    /// `host:port`, with an absent host meaning the local machine.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host.as_deref().unwrap_or("127.0.0.1"), self.port)
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// Duplicate a string, reporting allocation failure instead of aborting.
pub(crate) fn dup_str(s: &str) -> Result<String, AllocationError> {
    let mut copy = String::new();
    copy.try_reserve_exact(s.len())
        .map_err(|_| AllocationError { requested: s.len() })?;
    copy.push_str(s);
    Ok(copy)
}

pub(crate) fn dup_opt(s: Option<&str>) -> Result<Option<String>, AllocationError> {
    s.map(dup_str).transpose()
}
