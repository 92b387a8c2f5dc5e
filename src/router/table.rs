//! Route table.
//!
//! # Responsibilities
//! - Resolve clients to routes, creating routes on first use
//! - Check servers in and out of each route's pool
//! - Swap the rule set on reload and evict routes it no longer backs

use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;

use crate::client::InternalClient;
use crate::config::RuleConfig;
use crate::pool::Server;
use crate::router::route::{Route, RouteId};
use crate::router::rule::{find_rule, RouteRule, RuleError};
use crate::router::{Router, RouterStatus};
use crate::storage::StorageRegistry;

/// Rules plus the routes created from them.
#[derive(Debug)]
pub struct RouteTable {
    rules: ArcSwap<Vec<RouteRule>>,
    routes: DashMap<RouteId, Arc<Route>>,
}

impl RouteTable {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self {
            rules: ArcSwap::from_pointee(rules),
            routes: DashMap::new(),
        }
    }

    pub fn from_config(
        configs: &[RuleConfig],
        registry: &StorageRegistry,
    ) -> Result<Self, RuleError> {
        Ok(Self::new(build_rules(configs, registry)?))
    }

    /// Install a new rule set.
    ///
    /// Routes whose rule still resolves to an equal storage and pool size
    /// are kept. Others are evicted; clients already holding them keep
    /// working until they let go. Returns the number of evicted routes.
    pub fn reload(&self, rules: Vec<RouteRule>) -> usize {
        self.rules.store(Arc::new(rules));
        let rules = self.rules.load();

        let before = self.routes.len();
        self.routes.retain(|id, route| {
            find_rule(&rules, &id.user, &id.database).is_some_and(|rule| {
                *rule.storage == **route.storage()
                    && route.with_pool(|pool| pool.max()) == rule.pool_size
            })
        });
        let evicted = before.saturating_sub(self.routes.len());
        tracing::info!(rules = rules.len(), evicted, "Route rules reloaded");
        evicted
    }

    pub fn get(&self, id: &RouteId) -> Option<Arc<Route>> {
        self.routes.get(id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Remove every idle server from every route.
    pub fn drain_idle(&self) -> Vec<Server> {
        let mut servers = Vec::new();
        for route in self.routes.iter() {
            servers.extend(route.with_pool(|pool| pool.drain_idle()));
        }
        servers
    }

    fn resolve(&self, user: &str, database: &str) -> Option<Arc<Route>> {
        let id = RouteId::new(user, database);
        if let Some(route) = self.routes.get(&id) {
            return Some(route.value().clone());
        }

        let rules = self.rules.load();
        let rule = find_rule(&rules, user, database)?;
        let route = self
            .routes
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::debug!(route = %id, storage = %rule.storage.name(), "Route created");
                Arc::new(Route::new(id, rule.storage.clone(), rule.pool_size))
            })
            .value()
            .clone();
        Some(route)
    }
}

/// Build rules from configuration, copying every storage they reference.
pub fn build_rules(
    configs: &[RuleConfig],
    registry: &StorageRegistry,
) -> Result<Vec<RouteRule>, RuleError> {
    configs
        .iter()
        .map(|config| RouteRule::from_config(config, registry))
        .collect()
}

impl Router for RouteTable {
    fn route(&self, client: &mut InternalClient) -> RouterStatus {
        if client.route().is_some() {
            return RouterStatus::Ok;
        }
        let Some(route) = self.resolve(client.user(), client.database()) else {
            return RouterStatus::NoRule;
        };
        if !route.try_reserve() {
            return RouterStatus::Busy;
        }
        client.set_route(route);
        RouterStatus::Ok
    }

    fn attach(&self, client: &mut InternalClient) -> RouterStatus {
        let Some(route) = client.route().cloned() else {
            return RouterStatus::NotRouted;
        };
        if client.server().is_some() {
            return RouterStatus::Ok;
        }
        let server = route.with_pool(|pool| {
            pool.checkout(|| Server::new(route.id().clone(), route.storage().clone()))
        });
        match server {
            Some(server) => {
                tracing::debug!(
                    client = %client.id(),
                    server = %server.id(),
                    route = %route.id(),
                    "Server attached"
                );
                client.set_server(server);
                RouterStatus::Ok
            }
            None => RouterStatus::PoolExhausted,
        }
    }

    fn detach(&self, client: &mut InternalClient) {
        let Some(server) = client.take_server() else {
            return;
        };
        match client.route() {
            Some(route) => route.with_pool(|pool| pool.checkin(server)),
            None => drop(server),
        }
    }

    fn unroute(&self, client: &mut InternalClient) {
        if client.server().is_some() {
            self.close(client);
        }
        if let Some(route) = client.take_route() {
            route.release();
        }
    }

    fn close(&self, client: &mut InternalClient) {
        let Some(server) = client.take_server() else {
            return;
        };
        tracing::debug!(client = %client.id(), server = %server.id(), "Server closed");
        match client.route() {
            Some(route) => route.with_pool(|pool| pool.discard(server)),
            None => drop(server),
        }
    }

    fn for_each_route(&self, f: &mut dyn FnMut(&Arc<Route>)) {
        for entry in self.routes.iter() {
            f(entry.value());
        }
    }
}
