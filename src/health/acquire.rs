//! Connection acquisition for an internal client.
//!
//! # Responsibilities
//! - Route the client, attach a pooled server, connect it if needed
//! - Undo every completed step, newest first, when a later step fails
//!
//! # Design Decisions
//! - No retries here; the watchdog loop decides what happens next
//! - On error the client holds neither route nor server

use thiserror::Error;

use crate::client::InternalClient;
use crate::net::{Backend, BackendError};
use crate::router::{Router, RouterStatus};

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("routing failed: {0}")]
    Routing(RouterStatus),
    #[error("attach failed: {0}")]
    Attach(RouterStatus),
    #[error("connect failed: {0}")]
    Connect(#[source] BackendError),
}

impl AcquireError {
    /// Step that failed, used as a metric label.
    pub fn stage(&self) -> &'static str {
        match self {
            AcquireError::Routing(_) => "route",
            AcquireError::Attach(_) => "attach",
            AcquireError::Connect(_) => "connect",
        }
    }
}

/// Route, attach and connect `client`.
pub async fn acquire(
    router: &dyn Router,
    backend: &dyn Backend,
    client: &mut InternalClient,
) -> Result<(), AcquireError> {
    let status = router.route(client);
    if !status.is_ok() {
        return Err(AcquireError::Routing(status));
    }

    let status = router.attach(client);
    if !status.is_ok() {
        router.unroute(client);
        return Err(AcquireError::Attach(status));
    }

    let connected = match client.server_mut() {
        Some(server) if server.is_connected() => Ok(()),
        Some(server) => backend.connect(server).await,
        None => {
            // attach reported ok without binding a server
            router.unroute(client);
            return Err(AcquireError::Attach(RouterStatus::PoolExhausted));
        }
    };

    if let Err(e) = connected {
        router.close(client);
        router.unroute(client);
        return Err(AcquireError::Connect(e));
    }

    tracing::debug!(client = %client.id(), "Server acquired");
    Ok(())
}
