//! TCP listener with backpressure.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Enforce max_connections limit via semaphore
//! - Classify accept errors as transient or fatal

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ListenerConfig;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("invalid bind address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to accept: {0}")]
    Accept(#[source] io::Error),

    #[error("connection limiter closed")]
    Closed,
}

impl ListenerError {
    /// Accept failures leave the listening socket usable, including fd
    /// exhaustion (EMFILE/ENFILE), so the accept loop backs off and retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, ListenerError::Accept(_))
    }
}

/// A bounded TCP listener that limits concurrent connections.
///
/// When the limit is reached, `accept` waits until a slot is released.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
    connection_limit: Arc<Semaphore>,
}

impl Listener {
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config
            .bind_address
            .parse()
            .map_err(|source| ListenerError::InvalidAddress {
                address: config.bind_address.clone(),
                source,
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind { address: addr, source })?;

        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::Bind { address: addr, source })?;

        tracing::info!(
            address = %local_addr,
            max_connections = config.max_connections,
            "Listener bound"
        );

        Ok(Self {
            inner: listener,
            local_addr,
            connection_limit: Arc::new(Semaphore::new(config.max_connections)),
        })
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// The returned permit must be held for the connection's lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        // Permit first (backpressure)
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    /// Stop handing out connection slots; the next `accept` fails with `Closed`.
    #[cfg(test)]
    pub(crate) fn close(&self) {
        self.connection_limit.close();
    }
}

/// A connection slot. Released on drop, even if the handler panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(bind_address: &str, max_connections: usize) -> ListenerConfig {
        ListenerConfig {
            bind_address: bind_address.to_string(),
            max_connections,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let listener = Listener::bind(&config("127.0.0.1:0", 4)).await.unwrap();
        assert_ne!(listener.local_addr().port(), 0);
        assert_eq!(listener.available_permits(), 4);
    }

    #[tokio::test]
    async fn test_bind_invalid_address() {
        let err = Listener::bind(&config("not-an-address", 4)).await.unwrap_err();
        assert!(matches!(err, ListenerError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn test_bind_port_in_use() {
        let first = Listener::bind(&config("127.0.0.1:0", 4)).await.unwrap();
        let taken = first.local_addr().to_string();
        let err = Listener::bind(&config(&taken, 4)).await.unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
    }

    #[tokio::test]
    async fn test_permit_held_per_connection() {
        let listener = Listener::bind(&config("127.0.0.1:0", 2)).await.unwrap();
        let addr = listener.local_addr();

        let _client = TcpStream::connect(addr).await.unwrap();
        let (_stream, _peer, permit) = listener.accept().await.unwrap();
        assert_eq!(listener.available_permits(), 1);

        drop(permit);
        assert_eq!(listener.available_permits(), 2);
    }

    #[test]
    fn test_transient_errors() {
        let reset = ListenerError::Accept(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(reset.is_transient());

        // EMFILE: the process is out of descriptors, not the listener broken
        let exhausted = ListenerError::Accept(io::Error::from_raw_os_error(24));
        assert!(exhausted.is_transient());

        assert!(!ListenerError::Closed.is_transient());
    }

    #[tokio::test]
    async fn test_closed_limiter_fails_accept() {
        let listener = Listener::bind(&config("127.0.0.1:0", 2)).await.unwrap();
        listener.close();

        let err = listener.accept().await.unwrap_err();
        assert!(matches!(err, ListenerError::Closed));
        assert!(!err.is_transient());
    }
}
