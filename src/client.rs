//! Internal clients.
//!
//! A watchdog talks to its storage through the same routing path as a
//! pooler client. It does so with an `InternalClient`, created per
//! iteration and dropped when the iteration ends.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::pool::Server;
use crate::router::Route;

static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl ClientId {
    pub fn new() -> Self {
        Self(CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "a{}", self.0)
    }
}

#[derive(Debug)]
pub struct InternalClient {
    id: ClientId,
    user: String,
    database: String,
    route: Option<Arc<Route>>,
    server: Option<Server>,
}

impl InternalClient {
    pub fn new(user: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            id: ClientId::new(),
            user: user.into(),
            database: database.into(),
            route: None,
            server: None,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    pub fn set_route(&mut self, route: Arc<Route>) {
        self.route = Some(route);
    }

    pub fn take_route(&mut self) -> Option<Arc<Route>> {
        self.route.take()
    }

    pub fn server(&self) -> Option<&Server> {
        self.server.as_ref()
    }

    pub fn server_mut(&mut self) -> Option<&mut Server> {
        self.server.as_mut()
    }

    pub fn set_server(&mut self, server: Server) {
        self.server = Some(server);
    }

    pub fn take_server(&mut self) -> Option<Server> {
        self.server.take()
    }

    /// Holds neither a route nor a server.
    pub fn is_idle(&self) -> bool {
        self.route.is_none() && self.server.is_none()
    }
}

impl Drop for InternalClient {
    fn drop(&mut self) {
        if !self.is_idle() {
            tracing::warn!(
                client = %self.id,
                routed = self.route.is_some(),
                attached = self.server.is_some(),
                "Internal client dropped while still routed"
            );
        }
    }
}
