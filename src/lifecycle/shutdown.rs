//! Shutdown coordination.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Subscribe, wrapped for polling.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal::from(self.subscribe())
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of tasks still subscribed.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a [`Shutdown`].
///
/// Once fired it stays fired. A dropped sender counts as a shutdown.
#[derive(Debug)]
pub struct ShutdownSignal {
    rx: broadcast::Receiver<()>,
    fired: bool,
}

impl ShutdownSignal {
    /// Non-blocking check.
    pub fn is_triggered(&mut self) -> bool {
        if !self.fired {
            self.fired = !matches!(self.rx.try_recv(), Err(TryRecvError::Empty));
        }
        self.fired
    }

    /// Wait until shutdown is requested.
    pub async fn recv(&mut self) {
        if !self.fired {
            let _ = self.rx.recv().await;
            self.fired = true;
        }
    }
}

impl From<broadcast::Receiver<()>> for ShutdownSignal {
    fn from(rx: broadcast::Receiver<()>) -> Self {
        Self { rx, fired: false }
    }
}
