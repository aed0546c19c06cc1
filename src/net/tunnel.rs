//! Raw tunnel proxy.
//!
//! # Connection Flow
//!
//! ```text
//! Reading ──malformed──▶ 400 Bad Request, close
//!    │
//!    ▼
//! BackendDial ──failed──▶ 502 Bad Gateway, close
//!    │
//!    ├── CONNECT ──▶ 200 Connection Established to client
//!    └── other   ──▶ replay the bytes read so far to the backend
//!                       (send failed: 502 Bad Gateway, close)
//!    │
//!    ▼
//! Piping ──either side closes──▶ Closed
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::TunnelConfig;
use crate::http::response::raw_status;
use crate::lifecycle::ShutdownSignal;
use crate::net::connection::{ConnectionId, ConnectionTracker};
use crate::net::listener::Listener;
use crate::net::parser::{ParseError, ParsedRequest, RawRequestParser};
use crate::net::pipe::pipe;
use crate::observability::metrics;

/// TCP-level proxy that tunnels every connection to one backend.
pub struct TunnelProxy {
    backend_address: String,
    parser: RawRequestParser,
    tracker: ConnectionTracker,
}

impl TunnelProxy {
    pub fn new(config: &TunnelConfig) -> Self {
        Self {
            backend_address: config.backend_address.clone(),
            parser: RawRequestParser::new(config.max_header_bytes),
            tracker: ConnectionTracker::new(),
        }
    }

    /// Accept connections until shutdown. Each connection runs in its own task.
    pub async fn run(self, listener: Listener, mut shutdown: ShutdownSignal) {
        let proxy = Arc::new(self);
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(
                address = %addr,
                backend = %proxy.backend_address,
                "Tunnel proxy starting"
            );
        }

        while shutdown.is_running() {
            let accepted = tokio::select! {
                result = listener.accept() => result,
                _ = shutdown.recv() => break,
            };

            let (stream, peer, permit) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "Tunnel accept error");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    continue;
                }
            };

            let proxy = Arc::clone(&proxy);
            let running = shutdown.clone();
            tokio::spawn(async move {
                let _permit = permit;
                proxy.handle(stream, peer, running).await;
            });
        }

        tracing::info!("Tunnel proxy stopped accepting");
    }

    async fn handle(&self, mut client: TcpStream, peer: SocketAddr, running: ShutdownSignal) {
        let guard = self.tracker.track();
        let id = guard.id();

        let request = match self.parser.parse(&mut client, &running).await {
            Ok(request) => request,
            Err(ParseError::Io(e)) => {
                tracing::warn!(
                    connection_id = %id,
                    peer = %peer,
                    error = %e,
                    "Failed reading request"
                );
                metrics::record_tunnel("read_error");
                return;
            }
            Err(e) => {
                tracing::debug!(
                    connection_id = %id,
                    peer = %peer,
                    error = %e,
                    "Rejecting request"
                );
                respond_and_close(&mut client, id, peer, 400, "Bad Request").await;
                metrics::record_tunnel("bad_request");
                return;
            }
        };

        tracing::info!(
            connection_id = %id,
            peer = %peer,
            request = %request.request_line(),
            "Proxy request"
        );

        let mut backend = match TcpStream::connect(&self.backend_address).await {
            Ok(backend) => backend,
            Err(e) => {
                tracing::warn!(
                    connection_id = %id,
                    backend = %self.backend_address,
                    error = %e,
                    "Backend dial failed"
                );
                respond_and_close(&mut client, id, peer, 502, "Bad Gateway").await;
                metrics::record_tunnel("bad_gateway");
                return;
            }
        };

        let ready = open_tunnel(&mut client, &mut backend, &request, id, peer).await;
        drop(request);
        if !ready {
            return;
        }

        metrics::record_tunnel("established");
        let stats = pipe(client, backend, running).await;
        tracing::debug!(
            connection_id = %id,
            peer = %peer,
            client_to_backend = stats.a_to_b,
            backend_to_client = stats.b_to_a,
            "Tunnel closed"
        );
    }
}

/// Last step before piping: confirm a CONNECT to the client, or replay the
/// buffered request to the backend. A failed replay is answered with 502.
async fn open_tunnel<C, B>(
    client: &mut C,
    backend: &mut B,
    request: &ParsedRequest,
    id: ConnectionId,
    peer: SocketAddr,
) -> bool
where
    C: AsyncWrite + Unpin,
    B: AsyncWrite + Unpin,
{
    if request.is_connect() {
        if let Err(e) = respond(client, id, peer, 200, "Connection Established").await {
            tracing::warn!(connection_id = %id, peer = %peer, error = %e, "Client went away");
            metrics::record_tunnel("start_error");
            return false;
        }
        return true;
    }

    if let Err(e) = backend.write_all(&request.payload).await {
        tracing::warn!(connection_id = %id, peer = %peer, error = %e, "Backend send failed");
        respond_and_close(client, id, peer, 502, "Bad Gateway").await;
        metrics::record_tunnel("bad_gateway");
        return false;
    }
    true
}

async fn respond<W>(
    conn: &mut W,
    id: ConnectionId,
    peer: SocketAddr,
    code: u16,
    reason: &str,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    tracing::info!(connection_id = %id, peer = %peer, code, reason, "Responding");
    conn.write_all(raw_status(code, reason).as_bytes()).await?;
    conn.flush().await
}

async fn respond_and_close<W>(
    conn: &mut W,
    id: ConnectionId,
    peer: SocketAddr,
    code: u16,
    reason: &str,
) where
    W: AsyncWrite + Unpin,
{
    if let Err(e) = respond(conn, id, peer, code, reason).await {
        tracing::warn!(
            connection_id = %id,
            peer = %peer,
            code,
            error = %e,
            "Failed writing error response"
        );
        return;
    }
    let _ = conn.shutdown().await;
}
