//! Per-node TCP listener with backpressure.
//!
//! # Responsibilities
//! - Bind each configured node address
//! - Accept incoming TCP connections
//! - Enforce the node's max_connections limit via semaphore
//! - Hand accepted streams to the bound transport core

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::config::schema::NodeConfig;

/// A bounded TCP listener for one node.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is reached,
/// new connections wait until a slot becomes available.
#[derive(Debug)]
pub struct NodeListener {
    /// Node identifier, for logs and error reports.
    name: String,
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Semaphore to limit concurrent connections.
    connection_limit: Arc<Semaphore>,
}

impl NodeListener {
    /// Bind the node's configured address with its connection limit.
    pub async fn bind(config: &NodeConfig) -> std::io::Result<Self> {
        let addr: SocketAddr = config
            .listen
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!(
            node = %config.name,
            address = %local_addr,
            max_connections = config.max_connections,
            "Node listener bound"
        );

        Ok(Self {
            name: config.name.clone(),
            inner: listener,
            connection_limit: Arc::new(Semaphore::new(config.max_connections)),
        })
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// Returns the stream and a permit that must be held for the connection's
    /// lifetime.
    pub async fn accept(&self) -> std::io::Result<(TcpStream, SocketAddr, ConnectionPermit)> {
        // Acquire permit first (backpressure)
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .expect("Semaphore closed unexpectedly");

        let (stream, addr) = self.inner.accept().await?;

        tracing::debug!(
            node = %self.name,
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    /// Node identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The local address this listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

/// A permit representing a connection slot on one node.
///
/// When dropped, the slot is released back to the node's pool, so the limit
/// holds even if the connection task panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str, listen: &str) -> NodeConfig {
        NodeConfig {
            name: name.into(),
            listen: listen.into(),
            max_connections: 4,
        }
    }

    #[tokio::test]
    async fn bind_ephemeral_port() {
        let listener = NodeListener::bind(&config("n1", "127.0.0.1:0")).await.unwrap();
        assert_eq!(listener.name(), "n1");
        assert!(listener.local_addr().unwrap().port() > 0);
    }

    #[tokio::test]
    async fn bind_invalid_address_fails() {
        let err = NodeListener::bind(&config("bad", "no-such-address"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn double_bind_same_port_fails() {
        let first = NodeListener::bind(&config("n1", "127.0.0.1:0")).await.unwrap();
        let addr = first.local_addr().unwrap();
        let err = NodeListener::bind(&config("n2", &addr.to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AddrInUse);
    }
}
