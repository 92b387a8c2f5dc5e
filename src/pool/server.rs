//! Pooled backend server.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::net::PgConnection;
use crate::router::RouteId;
use crate::storage::StorageRule;

/// Relaxed is enough: only uniqueness matters.
static SERVER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerId(u64);

impl ServerId {
    pub fn new() -> Self {
        Self(SERVER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ServerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ServerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// A server slot of a route. Holds a live connection once connected.
#[derive(Debug)]
pub struct Server {
    id: ServerId,
    route: RouteId,
    storage: Arc<StorageRule>,
    io: Option<PgConnection>,
}

impl Server {
    pub fn new(route: RouteId, storage: Arc<StorageRule>) -> Self {
        Self {
            id: ServerId::new(),
            route,
            storage,
            io: None,
        }
    }

    pub fn id(&self) -> ServerId {
        self.id
    }

    pub fn route_id(&self) -> &RouteId {
        &self.route
    }

    pub fn storage(&self) -> &Arc<StorageRule> {
        &self.storage
    }

    pub fn is_connected(&self) -> bool {
        self.io.is_some()
    }

    pub fn set_io(&mut self, io: PgConnection) {
        self.io = Some(io);
    }

    pub fn io_mut(&mut self) -> Option<&mut PgConnection> {
        self.io.as_mut()
    }

    pub fn take_io(&mut self) -> Option<PgConnection> {
        self.io.take()
    }
}
