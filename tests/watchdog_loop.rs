//! Watchdog loop behavior against scripted collaborators and a fake server.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use storage_watchdog::client::InternalClient;
use storage_watchdog::config::TimeoutConfig;
use storage_watchdog::health::{Iteration, LagWatchdog};
use storage_watchdog::lifecycle::Shutdown;
use storage_watchdog::net::{Backend, PgBackend};
use storage_watchdog::router::{RouteId, RouteRule, Router, RouterStatus};
use storage_watchdog::storage::StorageRule;

mod common;

use common::{MockRouter, Reply, ScriptedBackend};

fn watchdog(
    storage: &Arc<StorageRule>,
    router: &Arc<MockRouter>,
    backend: Arc<dyn Backend>,
) -> LagWatchdog {
    let router: Arc<dyn Router> = router.clone();
    LagWatchdog::new(storage.clone(), router, backend).unwrap()
}

#[tokio::test]
async fn failing_queries_are_bounded_by_check_retry() {
    let shutdown = Arc::new(Shutdown::new());
    let storage = Arc::new(common::watched_storage("primary", 3));
    let router = Arc::new(MockRouter::for_storage(storage.clone()));
    let backend = Arc::new(ScriptedBackend::failing().shutdown_at_query(3, shutdown.clone()));

    let watchdog = watchdog(&storage, &router, backend.clone());
    let stats = watchdog.stats();
    tokio::time::timeout(Duration::from_secs(5), watchdog.run(shutdown.subscribe()))
        .await
        .unwrap();

    let stats = stats.snapshot();
    assert_eq!(backend.queries.load(Ordering::SeqCst), 3);
    assert_eq!(stats.queries, 3);
    assert_eq!(stats.query_failures, 3);
    assert_eq!(stats.broadcasts, 0);
    assert_eq!(stats.cooldowns, 1);
    assert_eq!(router.count("detach"), 1);
    assert_eq!(router.count("unroute"), 1);

    let route = router.table.get(&RouteId::new("wd", "postgres")).unwrap();
    assert_eq!(route.last_heartbeat(), 0);
    assert_eq!(route.routed_clients(), 0);
}

#[tokio::test]
async fn shutdown_before_retry_cancels_iteration() {
    let shutdown = Arc::new(Shutdown::new());
    let storage = Arc::new(common::watched_storage("primary", 5));
    let router = Arc::new(MockRouter::for_storage(storage.clone()));
    let backend = Arc::new(ScriptedBackend::failing().shutdown_at_query(1, shutdown.clone()));

    let watchdog = watchdog(&storage, &router, backend.clone());
    let stats = watchdog.stats();
    watchdog.run(shutdown.subscribe()).await;

    let stats = stats.snapshot();
    assert_eq!(stats.iterations, 1);
    assert_eq!(stats.queries, 1);
    assert_eq!(stats.cooldowns, 0);
    assert_eq!(router.count("detach"), 1);
    assert_eq!(router.count("unroute"), 1);
}

#[tokio::test]
async fn decode_failure_consumes_a_retry() {
    let storage = Arc::new(common::watched_storage("primary", 3));
    let router = Arc::new(MockRouter::for_storage(storage.clone()));
    let truncated = common::data_row("42").slice(..9);
    let backend = Arc::new(ScriptedBackend::answering(common::data_row("42")).then(Ok(truncated)));

    let watchdog = watchdog(&storage, &router, backend.clone());
    let shutdown = Shutdown::new();
    let outcome = watchdog.run_iteration(&mut shutdown.signal()).await;

    assert!(matches!(outcome, Iteration::Broadcast { lag: 42, routes: 1 }));
    let stats = watchdog.stats().snapshot();
    assert_eq!(stats.queries, 2);
    assert_eq!(stats.decode_failures, 1);
    assert_eq!(stats.last_lag, 42);
}

#[tokio::test]
async fn lag_fans_out_to_every_route_of_the_storage() {
    let storage = Arc::new(common::watched_storage("primary", 3));
    let replica = Arc::new(StorageRule::new("replica", "remote").unwrap());
    let router = Arc::new(MockRouter::new(vec![
        RouteRule::new("*", "reports", replica, 0),
        RouteRule::new("*", "*", storage.clone(), 0),
    ]));

    let mut clients: Vec<_> = [("app", "db1"), ("app", "db2"), ("app", "reports")]
        .into_iter()
        .map(|(user, database)| InternalClient::new(user, database))
        .collect();
    for client in clients.iter_mut() {
        assert_eq!(router.table.route(client), RouterStatus::Ok);
    }

    let backend = Arc::new(ScriptedBackend::answering(common::data_row("42")));
    let watchdog = watchdog(&storage, &router, backend);
    let shutdown = Shutdown::new();
    let outcome = watchdog.run_iteration(&mut shutdown.signal()).await;

    // app.db1, app.db2 and the watchdog's own wd.postgres
    assert!(matches!(outcome, Iteration::Broadcast { lag: 42, routes: 3 }));
    for database in ["db1", "db2"] {
        let route = router.table.get(&RouteId::new("app", database)).unwrap();
        assert_eq!(route.last_heartbeat(), 42);
        assert!(route.state().updated_at.is_some());
    }
    let reports = router.table.get(&RouteId::new("app", "reports")).unwrap();
    assert_eq!(reports.last_heartbeat(), 0);

    for client in clients.iter_mut() {
        router.table.unroute(client);
    }
}

#[tokio::test]
async fn acquisition_failures_retry_without_cooldown() {
    let shutdown = Arc::new(Shutdown::new());
    let storage = Arc::new(common::watched_storage("primary", 3));
    let router = Arc::new(
        MockRouter::for_storage(storage.clone())
            .fail_route(RouterStatus::Busy)
            .shutdown_after_routes(4, shutdown.clone()),
    );
    let backend = Arc::new(ScriptedBackend::answering(common::data_row("1")));

    let watchdog = watchdog(&storage, &router, backend.clone());
    let stats = watchdog.stats();
    tokio::time::timeout(Duration::from_secs(5), watchdog.run(shutdown.subscribe()))
        .await
        .unwrap();

    let stats = stats.snapshot();
    assert_eq!(stats.iterations, 4);
    assert_eq!(stats.acquire_failures, 4);
    assert_eq!(stats.cooldowns, 0);
    assert_eq!(backend.queries.load(Ordering::SeqCst), 0);
    assert_eq!(router.count("unroute"), 0);
}

#[tokio::test]
async fn end_to_end_against_fake_postgres() {
    let shutdown = Arc::new(Shutdown::new());
    let server = common::start_fake_postgres(vec![Reply::Row("42")], Some(shutdown.clone())).await;

    let mut storage = common::watched_storage("primary", 2);
    storage.set_host(Some(server.addr.ip().to_string()));
    storage.set_port(server.addr.port());
    let storage = Arc::new(storage);
    let router = Arc::new(MockRouter::for_storage(storage.clone()));
    let backend = Arc::new(PgBackend::new(&TimeoutConfig::default()));

    let watchdog = watchdog(&storage, &router, backend);
    let stats = watchdog.stats();
    tokio::time::timeout(Duration::from_secs(5), watchdog.run(shutdown.subscribe()))
        .await
        .unwrap();

    let stats = stats.snapshot();
    assert_eq!(stats.iterations, 1);
    assert_eq!(stats.queries, 1);
    assert_eq!(stats.broadcasts, 1);
    assert_eq!(stats.cooldowns, 1);
    assert_eq!(stats.last_lag, 42);
    assert_eq!(server.queries.load(Ordering::SeqCst), 1);

    let route = router.table.get(&RouteId::new("wd", "postgres")).unwrap();
    assert_eq!(route.last_heartbeat(), 42);
    assert_eq!(route.routed_clients(), 0);
    // the healthy connection went back to the pool
    assert_eq!(route.with_pool(|pool| pool.idle()), 1);
}

#[tokio::test]
async fn dropped_connection_is_reconnected_before_retry() {
    let server = common::start_fake_postgres(vec![Reply::Silent, Reply::Row("5")], None).await;

    let mut storage = common::watched_storage("primary", 5);
    storage.set_host(Some(server.addr.ip().to_string()));
    storage.set_port(server.addr.port());
    let storage = Arc::new(storage);
    let router = Arc::new(MockRouter::for_storage(storage.clone()));
    let backend = Arc::new(PgBackend::new(&TimeoutConfig {
        connect_ms: 1_000,
        query_ms: 50,
    }));

    let watchdog = watchdog(&storage, &router, backend);
    let stats = watchdog.stats();
    let shutdown = Shutdown::new();
    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        watchdog.run_iteration(&mut shutdown.signal()),
    )
    .await
    .unwrap();

    assert!(matches!(outcome, Iteration::Broadcast { lag: 5, .. }));
    assert_eq!(server.startups.load(Ordering::SeqCst), 2);
    assert_eq!(server.queries.load(Ordering::SeqCst), 2);

    let stats = stats.snapshot();
    assert_eq!(stats.queries, 2);
    assert_eq!(stats.query_failures, 1);
    assert_eq!(stats.broadcasts, 1);

    let route = router.table.get(&RouteId::new("wd", "postgres")).unwrap();
    assert_eq!(route.last_heartbeat(), 5);
    assert_eq!(route.routed_clients(), 0);
}
