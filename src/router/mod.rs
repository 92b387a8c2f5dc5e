//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Client (user, database)
//!     → rule.rs (most specific matching rule)
//!     → table.rs (get or create Route, reserve a routing slot)
//!     → attach: checkout a Server from the route's pool
//!     → detach / close / unroute release in reverse order
//!
//! Watchdog decode success:
//!     → broadcast.rs (for each route of the storage: lock, set heartbeat)
//! ```
//!
//! # Design Decisions
//! - Rules are swapped atomically on reload; routing never blocks on it
//! - Every route has its own lock; there is no global routing lock
//! - Router is a trait so the watchdog can be driven against test doubles

pub mod broadcast;
pub mod route;
pub mod rule;
pub mod table;

use std::fmt;
use std::sync::Arc;

use crate::client::InternalClient;

pub use broadcast::broadcast_heartbeat;
pub use route::{Route, RouteId, RouteState};
pub use rule::{RouteRule, RuleError};
pub use table::RouteTable;

/// Outcome of a routing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterStatus {
    Ok,
    /// No rule matches the client's user and database.
    NoRule,
    /// The route reached its concurrent routing cap.
    Busy,
    /// Attach was requested for a client that holds no route.
    NotRouted,
    /// The route's server pool is at capacity.
    PoolExhausted,
}

impl RouterStatus {
    pub fn is_ok(&self) -> bool {
        *self == RouterStatus::Ok
    }
}

impl fmt::Display for RouterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RouterStatus::Ok => "ok",
            RouterStatus::NoRule => "no matching rule",
            RouterStatus::Busy => "route busy",
            RouterStatus::NotRouted => "client not routed",
            RouterStatus::PoolExhausted => "server pool exhausted",
        };
        f.write_str(s)
    }
}

/// Client routing and backend attachment.
///
/// `route` reserves a slot on a route, `attach` binds a pooled server,
/// `detach` returns the server, `close` discards it, `unroute` releases the
/// route slot.
pub trait Router: Send + Sync {
    fn route(&self, client: &mut InternalClient) -> RouterStatus;
    fn attach(&self, client: &mut InternalClient) -> RouterStatus;
    fn detach(&self, client: &mut InternalClient);
    fn unroute(&self, client: &mut InternalClient);
    fn close(&self, client: &mut InternalClient);

    /// Visit every live route. The callback must not call back into the
    /// router.
    fn for_each_route(&self, f: &mut dyn FnMut(&Arc<Route>));
}
