//! Backend connection collaborator.
//!
//! # Responsibilities
//! - Open a connection for an attached server
//! - Run the watchdog query on it and hand back the raw `DataRow`
//!
//! # Design Decisions
//! - A trait seam so the watchdog runs against scripted backends in tests
//! - Connect and query are bounded by the configured timeouts
//! - A connection that failed mid-protocol is dropped from its server, so
//!   detach will not return it to the idle list

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::config::TimeoutConfig;
use crate::net::pg::PgConnection;
use crate::pool::Server;
use crate::resilience::timeouts::with_timeout;
use crate::storage::{StorageType, TlsMode};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("server error: {0}")]
    Server(String),
    #[error("unsupported authentication request (code {0})")]
    UnsupportedAuth(u32),
    #[error("tls mode '{0}' needs a handshake this backend does not perform")]
    TlsUnsupported(TlsMode),
    #[error("storage '{0}' is local and has no backend")]
    LocalStorage(String),
    #[error("server is not connected")]
    NotConnected,
    #[error("query returned no rows")]
    NoRows,
}

impl BackendError {
    /// Whether the connection can no longer be trusted after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BackendError::Io(_) | BackendError::Timeout { .. } | BackendError::Protocol(_)
        )
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Open a connection for `server` to its storage.
    async fn connect(&self, server: &mut Server) -> Result<(), BackendError>;

    /// Run `query` and return the first `DataRow` message, tag included.
    async fn send_query(&self, server: &mut Server, query: &str) -> Result<Bytes, BackendError>;
}

/// PostgreSQL over plain TCP.
#[derive(Debug, Clone)]
pub struct PgBackend {
    connect_timeout: Duration,
    query_timeout: Duration,
}

impl PgBackend {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(timeouts.connect_ms),
            query_timeout: Duration::from_millis(timeouts.query_ms),
        }
    }
}

#[async_trait]
impl Backend for PgBackend {
    async fn connect(&self, server: &mut Server) -> Result<(), BackendError> {
        let storage = server.storage().clone();
        if storage.storage_type() == StorageType::Local {
            return Err(BackendError::LocalStorage(storage.name().to_string()));
        }
        let mode = storage.tls_opts().mode;
        if mode.requires_tls() {
            return Err(BackendError::TlsUnsupported(mode));
        }

        let address = storage.address();
        let route = server.route_id().clone();
        tracing::debug!(
            server = %server.id(),
            address = %address,
            route = %route,
            "Connecting to storage"
        );

        let io = with_timeout(
            "connect",
            self.connect_timeout,
            PgConnection::connect(&address, &route.user, &route.database),
        )
        .await?;
        server.set_io(io);
        Ok(())
    }

    async fn send_query(&self, server: &mut Server, query: &str) -> Result<Bytes, BackendError> {
        let io = server.io_mut().ok_or(BackendError::NotConnected)?;
        let result = with_timeout("query", self.query_timeout, io.simple_query(query)).await;
        if let Err(e) = &result {
            if e.is_fatal() {
                tracing::debug!(
                    server = %server.id(),
                    error = %e,
                    "Dropping broken server connection"
                );
                server.take_io();
            }
        }
        result
    }
}
