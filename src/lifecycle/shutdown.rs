//! Shutdown coordination for the proxy.
//!
//! The server-level "is running" flag lives here. Long-running loops poll
//! [`ShutdownSignal::is_running`] at their boundaries, and tasks parked on I/O
//! or a timer can race [`ShutdownSignal::recv`] to wake up early.

use tokio::sync::watch;

/// Coordinator for graceful shutdown.
///
/// Provides a watch channel that all long-running tasks can subscribe to.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a new shutdown coordinator in the running state.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(true);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(false);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of [`Shutdown`], cheap to clone into spawned tasks.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Returns true until shutdown has been triggered.
    pub fn is_running(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until shutdown is triggered.
    ///
    /// Also resolves if the coordinator was dropped.
    pub async fn recv(&mut self) {
        let _ = self.rx.wait_for(|running| !*running).await;
    }
}
