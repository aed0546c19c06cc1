//! Bidirectional byte piping for an established tunnel.
//!
//! Two copy loops, A→B and B→A, share one [`Tunnel`]. The first loop to hit
//! EOF or an error tears the tunnel down; the sibling sees it on its next
//! iteration, or right away if it is parked on a read.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

use crate::lifecycle::ShutdownSignal;
use crate::net::is_benign;
use crate::net::parser::READ_CHUNK_SIZE;

/// Shared "still established" flag of one tunnel.
#[derive(Debug, Clone)]
pub struct Tunnel {
    established: std::sync::Arc<watch::Sender<bool>>,
}

impl Tunnel {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(true);
        Self {
            established: std::sync::Arc::new(tx),
        }
    }

    pub fn is_established(&self) -> bool {
        *self.established.borrow()
    }

    /// Mark the tunnel closed. Returns true for the call that closed it.
    pub fn tear_down(&self) -> bool {
        self.established.send_replace(false)
    }

    /// Resolves once the tunnel is torn down.
    pub async fn closed(&self) {
        let mut rx = self.established.subscribe();
        let _ = rx.wait_for(|established| !*established).await;
    }
}

impl Default for Tunnel {
    fn default() -> Self {
        Self::new()
    }
}

/// Bytes relayed in each direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipeStats {
    pub a_to_b: u64,
    pub b_to_a: u64,
}

/// Pipe `a` and `b` into each other until either side closes or fails, or
/// the server stops running. Returns once both directions have exited; both
/// connections are closed on return.
pub async fn pipe<A, B>(a: A, b: B, running: ShutdownSignal) -> PipeStats
where
    A: AsyncRead + AsyncWrite + Send + 'static,
    B: AsyncRead + AsyncWrite + Send + 'static,
{
    let tunnel = Tunnel::new();
    let (a_read, a_write) = tokio::io::split(a);
    let (b_read, b_write) = tokio::io::split(b);

    let reverse = tokio::spawn(copy_loop(b_read, a_write, tunnel.clone(), running.clone(), "b->a"));
    let a_to_b = copy_loop(a_read, b_write, tunnel, running, "a->b").await;
    let b_to_a = match reverse.await {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, "Pipe task failed");
            0
        }
    };

    PipeStats { a_to_b, b_to_a }
}

async fn copy_loop<R, W>(
    mut src: R,
    mut dst: W,
    tunnel: Tunnel,
    running: ShutdownSignal,
    direction: &'static str,
) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; READ_CHUNK_SIZE];
    let mut total = 0u64;

    while running.is_running() && tunnel.is_established() {
        let read = tokio::select! {
            result = src.read(&mut buffer) => result,
            _ = tunnel.closed() => break,
        };

        let n = match read {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                log_failure(direction, "read", &e);
                break;
            }
        };

        if let Err(e) = dst.write_all(&buffer[..n]).await {
            log_failure(direction, "write", &e);
            break;
        }
        total += n as u64;
    }

    if tunnel.tear_down() {
        tracing::trace!(direction, bytes = total, "Tunnel torn down");
    }
    total
}

fn log_failure(direction: &'static str, op: &'static str, e: &std::io::Error) {
    if is_benign(e) {
        tracing::trace!(direction, op, error = %e, "Pipe closed by peer");
    } else {
        tracing::warn!(direction, op, error = %e, "Pipe I/O error");
    }
}
