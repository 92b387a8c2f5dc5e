//! A resolved (user, database) route.
//!
//! # Responsibilities
//! - Hold the storage copy the route's rule points at
//! - Track routed clients against the storage's `server_max_routing`
//! - Own the route's server pool
//! - Hold the last heartbeat (replication lag) observed for the storage

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::pool::ServerPool;
use crate::protocol::Lag;
use crate::storage::StorageRule;

/// Route key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteId {
    pub user: String,
    pub database: String,
}

impl RouteId {
    pub fn new(user: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            database: database.into(),
        }
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.user, self.database)
    }
}

/// State read by routing decisions. Only touched under the route lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteState {
    pub last_heartbeat: Lag,
    /// When `last_heartbeat` was last written; `None` if never.
    pub updated_at: Option<Instant>,
}

#[derive(Debug)]
pub struct Route {
    id: RouteId,
    storage: Arc<StorageRule>,
    state: Mutex<RouteState>,
    pool: Mutex<ServerPool>,
    routed: AtomicUsize,
}

impl Route {
    /// `pool_size` of 0 leaves the pool unbounded.
    pub fn new(id: RouteId, storage: Arc<StorageRule>, pool_size: usize) -> Self {
        Self {
            id,
            storage,
            state: Mutex::new(RouteState::default()),
            pool: Mutex::new(ServerPool::new(pool_size)),
            routed: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> &RouteId {
        &self.id
    }

    pub fn storage(&self) -> &Arc<StorageRule> {
        &self.storage
    }

    /// Run `f` with the route locked.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut RouteState) -> R) -> R {
        let mut state = lock(&self.state);
        f(&mut state)
    }

    pub fn state(&self) -> RouteState {
        self.with_state(|state| *state)
    }

    pub fn last_heartbeat(&self) -> Lag {
        self.with_state(|state| state.last_heartbeat)
    }

    pub fn set_heartbeat(&self, lag: Lag) {
        self.with_state(|state| {
            state.last_heartbeat = lag;
            state.updated_at = Some(Instant::now());
        });
    }

    pub fn with_pool<R>(&self, f: impl FnOnce(&mut ServerPool) -> R) -> R {
        let mut pool = lock(&self.pool);
        f(&mut pool)
    }

    /// Clients currently holding a routing slot.
    pub fn routed_clients(&self) -> usize {
        self.routed.load(Ordering::SeqCst)
    }

    /// Take a routing slot unless `server_max_routing` is reached.
    pub fn try_reserve(&self) -> bool {
        let cap = self.storage.server_max_routing();
        self.routed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (cap == 0 || n < cap).then_some(n + 1)
            })
            .is_ok()
    }

    /// Give a routing slot back.
    pub fn release(&self) {
        let _ = self
            .routed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
