//! Per-route server pool.

use crate::pool::server::Server;

/// Idle servers plus a count of checked-out ones.
#[derive(Debug)]
pub struct ServerPool {
    idle: Vec<Server>,
    active: usize,
    /// 0 means unbounded.
    max: usize,
}

impl ServerPool {
    pub fn new(max: usize) -> Self {
        Self {
            idle: Vec::new(),
            active: 0,
            max,
        }
    }

    /// Reuse an idle server, or build one with `make` if under the cap.
    pub fn checkout(&mut self, make: impl FnOnce() -> Server) -> Option<Server> {
        if let Some(server) = self.idle.pop() {
            self.active += 1;
            return Some(server);
        }
        if self.max != 0 && self.total() >= self.max {
            return None;
        }
        self.active += 1;
        Some(make())
    }

    /// Return a server. Only connected servers are kept for reuse.
    pub fn checkin(&mut self, server: Server) {
        self.active = self.active.saturating_sub(1);
        if server.is_connected() {
            self.idle.push(server);
        }
    }

    /// Drop a checked-out server.
    pub fn discard(&mut self, server: Server) {
        self.active = self.active.saturating_sub(1);
        drop(server);
    }

    pub fn drain_idle(&mut self) -> Vec<Server> {
        std::mem::take(&mut self.idle)
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn idle(&self) -> usize {
        self.idle.len()
    }

    pub fn total(&self) -> usize {
        self.active + self.idle.len()
    }

    pub fn max(&self) -> usize {
        self.max
    }
}
