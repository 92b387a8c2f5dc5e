//! Acquisition unwinds every completed step when a later one fails.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use storage_watchdog::client::InternalClient;
use storage_watchdog::health::{acquire, AcquireError};
use storage_watchdog::router::{RouteId, Router, RouterStatus};

mod common;

use common::{MockRouter, ScriptedBackend};

fn router() -> MockRouter {
    MockRouter::for_storage(Arc::new(common::watched_storage("primary", 3)))
}

#[tokio::test]
async fn routing_failure_stops_immediately() {
    let router = router().fail_route(RouterStatus::NoRule);
    let backend = ScriptedBackend::answering(common::data_row("1"));
    let mut client = InternalClient::new("wd", "postgres");

    let err = acquire(&router, &backend, &mut client).await.unwrap_err();
    assert!(matches!(err, AcquireError::Routing(RouterStatus::NoRule)));
    assert_eq!(router.calls(), vec!["route"]);
    assert_eq!(backend.connects.load(Ordering::SeqCst), 0);
    assert!(client.is_idle());
}

#[tokio::test]
async fn attach_failure_unroutes() {
    let router = router().fail_attach(RouterStatus::PoolExhausted);
    let backend = ScriptedBackend::answering(common::data_row("1"));
    let mut client = InternalClient::new("wd", "postgres");

    let err = acquire(&router, &backend, &mut client).await.unwrap_err();
    assert!(matches!(err, AcquireError::Attach(RouterStatus::PoolExhausted)));
    assert_eq!(router.calls(), vec!["route", "attach", "unroute"]);
    assert_eq!(backend.connects.load(Ordering::SeqCst), 0);
    assert!(client.is_idle());

    let route = router.table.get(&RouteId::new("wd", "postgres")).unwrap();
    assert_eq!(route.routed_clients(), 0);
}

#[tokio::test]
async fn connect_failure_closes_then_unroutes() {
    let router = router();
    let backend = ScriptedBackend::refusing_connections();
    let mut client = InternalClient::new("wd", "postgres");

    let err = acquire(&router, &backend, &mut client).await.unwrap_err();
    assert!(matches!(err, AcquireError::Connect(_)));
    assert_eq!(router.calls(), vec!["route", "attach", "close", "unroute"]);
    assert_eq!(backend.connects.load(Ordering::SeqCst), 1);
    assert!(client.is_idle());

    let route = router.table.get(&RouteId::new("wd", "postgres")).unwrap();
    assert_eq!(route.routed_clients(), 0);
    assert_eq!(route.with_pool(|pool| pool.total()), 0);
}

#[tokio::test]
async fn success_holds_route_and_server() {
    let router = router();
    let backend = ScriptedBackend::answering(common::data_row("1"));
    let mut client = InternalClient::new("wd", "postgres");

    acquire(&router, &backend, &mut client).await.unwrap();
    assert_eq!(router.calls(), vec!["route", "attach"]);
    assert!(client.route().is_some());
    assert!(client.server().is_some());

    let route = client.route().cloned().unwrap();
    assert_eq!(route.routed_clients(), 1);
    assert_eq!(route.with_pool(|pool| pool.active()), 1);

    router.detach(&mut client);
    router.unroute(&mut client);
    assert!(client.is_idle());
    assert_eq!(route.routed_clients(), 0);
}
