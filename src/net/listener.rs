//! TCP listener with backpressure.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Enforce max_connections limit via semaphore

use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Failed to bind: {0}")]
    Bind(#[source] std::io::Error),

    #[error("Failed to accept: {0}")]
    Accept(#[source] std::io::Error),
}

/// A bounded TCP listener that limits concurrent connections.
///
/// When the limit is reached, accepting waits until a slot is released.
pub struct Listener {
    inner: TcpListener,
    connection_limit: Arc<Semaphore>,
    max_connections: usize,
}

impl Listener {
    /// Bind to `addr` (`host:port`, hostnames are resolved) with a connection limit.
    pub async fn bind(addr: &str, max_connections: usize) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        Ok(Self::from_tcp(listener, max_connections))
    }

    /// Wrap an already bound listener.
    pub fn from_tcp(inner: TcpListener, max_connections: usize) -> Self {
        if let Ok(local_addr) = inner.local_addr() {
            tracing::info!(
                address = %local_addr,
                max_connections,
                "Listener bound"
            );
        }

        Self {
            inner,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        }
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// The returned permit must be held for the connection's lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        // The semaphore is never closed, so acquiring can only succeed.
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ListenerError::Accept(std::io::Error::other(e)))?;

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// A connection slot, released on drop.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn permits_are_released_on_drop() {
        let listener = Listener::bind("127.0.0.1:0", 2).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let _c1 = TcpStream::connect(addr).await.unwrap();
        let (_s1, _, permit) = listener.accept().await.unwrap();
        assert_eq!(listener.available_permits(), 1);

        drop(permit);
        assert_eq!(listener.available_permits(), 2);
        assert_eq!(listener.max_connections(), 2);
    }

    #[tokio::test]
    async fn binds_to_hostname() {
        let listener = Listener::bind("localhost:0", 1).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn bad_address_fails_to_bind() {
        assert!(matches!(
            Listener::bind("not-an-address", 1).await,
            Err(ListenerError::Bind(_))
        ));
    }
}
