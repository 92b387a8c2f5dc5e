//! Heartbeat fan-out to routes.

use crate::protocol::Lag;
use crate::router::Router;

/// Publish `lag` to every route backed by `storage`.
///
/// Each route is updated under its own lock; routes of other storages are
/// left alone. Returns how many routes were written.
pub fn broadcast_heartbeat(router: &dyn Router, storage: &str, lag: Lag) -> usize {
    let mut updated = 0;
    router.for_each_route(&mut |route| {
        if route.storage().name() == storage {
            route.set_heartbeat(lag);
            updated += 1;
        }
    });
    tracing::debug!(storage, lag, routes = updated, "Heartbeat broadcast");
    updated
}
