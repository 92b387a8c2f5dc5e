//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use storage_watchdog::client::InternalClient;
use storage_watchdog::lifecycle::Shutdown;
use storage_watchdog::net::{Backend, BackendError};
use storage_watchdog::pool::Server;
use storage_watchdog::router::{Route, RouteRule, RouteTable, Router, RouterStatus};
use storage_watchdog::storage::{StorageRule, Watchdog};

/// A remote storage with a watchdog routed as `wd.postgres`.
pub fn watched_storage(name: &str, check_retry: u32) -> StorageRule {
    let mut storage = StorageRule::new(name, "remote").unwrap();
    storage
        .set_watchdog(Some(
            Watchdog::new("SELECT lag FROM replication_lag", "wd", "postgres")
                .unwrap()
                .with_check_retry(check_retry)
                .unwrap()
                .with_interval(Duration::from_millis(10))
                .unwrap(),
        ))
        .unwrap();
    storage
}

/// Encode a single-column `DataRow` holding `text`.
pub fn data_row(text: &str) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u8(b'D');
    buf.put_u32((4 + 2 + 4 + text.len()) as u32);
    buf.put_u16(1);
    buf.put_u32(text.len() as u32);
    buf.put_slice(text.as_bytes());
    buf.freeze()
}

/// Router that records every call and can be told to fail a step.
/// Successful steps are delegated to a real `RouteTable`.
pub struct MockRouter {
    pub table: RouteTable,
    calls: Mutex<Vec<&'static str>>,
    route_failure: Option<RouterStatus>,
    attach_failure: Option<RouterStatus>,
    shutdown_after_routes: Option<(usize, Arc<Shutdown>)>,
    routes: AtomicUsize,
}

impl MockRouter {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self {
            table: RouteTable::new(rules),
            calls: Mutex::new(Vec::new()),
            route_failure: None,
            attach_failure: None,
            shutdown_after_routes: None,
            routes: AtomicUsize::new(0),
        }
    }

    /// Single catch-all rule to `storage`.
    pub fn for_storage(storage: Arc<StorageRule>) -> Self {
        Self::new(vec![RouteRule::new("*", "*", storage, 0)])
    }

    pub fn fail_route(mut self, status: RouterStatus) -> Self {
        self.route_failure = Some(status);
        self
    }

    pub fn fail_attach(mut self, status: RouterStatus) -> Self {
        self.attach_failure = Some(status);
        self
    }

    pub fn shutdown_after_routes(mut self, n: usize, shutdown: Arc<Shutdown>) -> Self {
        self.shutdown_after_routes = Some((n, shutdown));
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Router for MockRouter {
    fn route(&self, client: &mut InternalClient) -> RouterStatus {
        self.record("route");
        let n = self.routes.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, shutdown)) = &self.shutdown_after_routes {
            if n >= *after {
                shutdown.trigger();
            }
        }
        match self.route_failure {
            Some(status) => status,
            None => self.table.route(client),
        }
    }

    fn attach(&self, client: &mut InternalClient) -> RouterStatus {
        self.record("attach");
        match self.attach_failure {
            Some(status) => status,
            None => self.table.attach(client),
        }
    }

    fn detach(&self, client: &mut InternalClient) {
        self.record("detach");
        self.table.detach(client);
    }

    fn unroute(&self, client: &mut InternalClient) {
        self.record("unroute");
        self.table.unroute(client);
    }

    fn close(&self, client: &mut InternalClient) {
        self.record("close");
        self.table.close(client);
    }

    fn for_each_route(&self, f: &mut dyn FnMut(&Arc<Route>)) {
        self.table.for_each_route(f);
    }
}

/// Backend with scripted query responses. `connect` never opens a socket
/// so servers stay unconnected and are reconnected on every acquisition.
pub struct ScriptedBackend {
    connect_fails: bool,
    responses: Mutex<VecDeque<Result<Bytes, BackendError>>>,
    fallback: Option<Bytes>,
    shutdown_at_query: Option<(usize, Arc<Shutdown>)>,
    pub connects: AtomicUsize,
    pub queries: AtomicUsize,
}

impl ScriptedBackend {
    /// Every query fails.
    pub fn failing() -> Self {
        Self {
            connect_fails: false,
            responses: Mutex::new(VecDeque::new()),
            fallback: None,
            shutdown_at_query: None,
            connects: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
        }
    }

    /// Every query answers with `row`.
    pub fn answering(row: Bytes) -> Self {
        Self {
            fallback: Some(row),
            ..Self::failing()
        }
    }

    pub fn refusing_connections() -> Self {
        Self {
            connect_fails: true,
            ..Self::failing()
        }
    }

    /// Responses served before the fallback.
    pub fn then(self, response: Result<Bytes, BackendError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    /// Trigger `shutdown` while serving query number `n` (1-based).
    pub fn shutdown_at_query(mut self, n: usize, shutdown: Arc<Shutdown>) -> Self {
        self.shutdown_at_query = Some((n, shutdown));
        self
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn connect(&self, _server: &mut Server) -> Result<(), BackendError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.connect_fails {
            return Err(BackendError::Io(std::io::ErrorKind::ConnectionRefused.into()));
        }
        Ok(())
    }

    async fn send_query(&self, _server: &mut Server, _query: &str) -> Result<Bytes, BackendError> {
        let n = self.queries.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, shutdown)) = &self.shutdown_at_query {
            if n == *at {
                shutdown.trigger();
            }
        }
        if let Some(response) = self.responses.lock().unwrap().pop_front() {
            return response;
        }
        match &self.fallback {
            Some(row) => Ok(row.clone()),
            None => Err(BackendError::Server("scripted failure".into())),
        }
    }
}

/// How the fake PostgreSQL server answers a query.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Row(&'static str),
    Error(&'static str),
    /// Never answer.
    Silent,
}

pub struct FakePostgres {
    pub addr: SocketAddr,
    pub queries: Arc<AtomicUsize>,
    pub startups: Arc<AtomicUsize>,
}

/// Start a fake PostgreSQL server speaking trust auth and simple queries.
/// Replies are served in order; the last one repeats.
pub async fn start_fake_postgres(
    replies: Vec<Reply>,
    on_query: Option<Arc<Shutdown>>,
) -> FakePostgres {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let queries = Arc::new(AtomicUsize::new(0));
    let startups = Arc::new(AtomicUsize::new(0));
    let replies = Arc::new(replies);

    let (q, s) = (queries.clone(), startups.clone());
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let (replies, on_query) = (replies.clone(), on_query.clone());
            let (q, s) = (q.clone(), s.clone());
            tokio::spawn(async move {
                let _ = serve(socket, &replies, &q, &s, on_query.as_deref()).await;
            });
        }
    });

    FakePostgres {
        addr,
        queries,
        startups,
    }
}

async fn serve(
    mut socket: TcpStream,
    replies: &[Reply],
    queries: &AtomicUsize,
    startups: &AtomicUsize,
    on_query: Option<&Shutdown>,
) -> std::io::Result<()> {
    let len = socket.read_i32().await?;
    let mut startup = vec![0u8; (len - 4) as usize];
    socket.read_exact(&mut startup).await?;
    startups.fetch_add(1, Ordering::SeqCst);

    let mut out = BytesMut::new();
    message(&mut out, b'R', &0u32.to_be_bytes());
    message(&mut out, b'S', b"server_version\x0016.0\x00");
    message(&mut out, b'K', &[0, 0, 0, 7, 0, 0, 0, 9]);
    message(&mut out, b'Z', b"I");
    socket.write_all(&out).await?;

    loop {
        let tag = socket.read_u8().await?;
        let len = socket.read_i32().await?;
        let mut body = vec![0u8; (len - 4) as usize];
        socket.read_exact(&mut body).await?;
        match tag {
            b'Q' => {}
            b'X' => return Ok(()),
            _ => continue,
        }

        let n = queries.fetch_add(1, Ordering::SeqCst);
        if let Some(shutdown) = on_query {
            shutdown.trigger();
        }
        let reply = replies.get(n).or(replies.last()).copied().unwrap_or(Reply::Silent);

        let mut out = BytesMut::new();
        match reply {
            Reply::Row(text) => {
                message(&mut out, b'T', ROW_DESCRIPTION);
                out.put_slice(&data_row(text));
                message(&mut out, b'C', b"SELECT 1\x00");
            }
            Reply::Error(text) => {
                let mut fields = b"SERROR\x00M".to_vec();
                fields.extend_from_slice(text.as_bytes());
                fields.extend_from_slice(b"\x00\x00");
                message(&mut out, b'E', &fields);
            }
            Reply::Silent => {
                std::future::pending::<()>().await;
            }
        }
        message(&mut out, b'Z', b"I");
        socket.write_all(&out).await?;
    }
}

/// One int8 column named `lag`, text format.
const ROW_DESCRIPTION: &[u8] =
    b"\x00\x01lag\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x14\x00\x08\xff\xff\xff\xff\x00\x00";

fn message(out: &mut BytesMut, tag: u8, body: &[u8]) {
    out.put_u8(tag);
    out.put_u32((body.len() + 4) as u32);
    out.put_slice(body);
}
