//! TCP listener implementation.
//!
//! # Responsibilities
//! - Bind to the configured host and port with the configured backlog
//! - Accept incoming TCP connections one at a time
//! - Run the sequential accept loop until a shutdown signal arrives
//! - Graceful handling of accept errors

use std::future::Future;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::broadcast;

use crate::config::ServerConfig;
use crate::net::connection::Connection;
use crate::resilience::backoff::calculate_backoff;

/// Base delay before retrying a failed accept.
const ACCEPT_RETRY_BASE_MS: u64 = 10;
/// Upper bound on the accept retry delay.
const ACCEPT_RETRY_MAX_MS: u64 = 1000;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to resolve or bind the address.
    #[error("Failed to bind: {0}")]
    Bind(std::io::Error),
    /// Failed to accept connection.
    #[error("Failed to accept: {0}")]
    Accept(std::io::Error),
}

/// A bound TCP listener that hands out one connection at a time.
#[derive(Debug)]
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Address actually bound (port 0 resolved).
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to the configured address.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ListenerError> {
        let host = config.resolved_host();
        let addr = tokio::net::lookup_host((host, config.bind_port))
            .await
            .map_err(ListenerError::Bind)?
            .next()
            .ok_or_else(|| {
                ListenerError::Bind(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("no address found for host {:?}", host),
                ))
            })?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(ListenerError::Bind)?;

        socket.set_reuseaddr(true).map_err(ListenerError::Bind)?;
        socket.bind(addr).map_err(ListenerError::Bind)?;
        let listener = socket.listen(config.backlog).map_err(ListenerError::Bind)?;

        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

        tracing::info!(
            address = %local_addr,
            backlog = config.backlog,
            "Listener bound"
        );

        Ok(Self {
            inner: listener,
            local_addr,
        })
    }

    /// Block until a client connects.
    pub async fn accept_one(&self) -> Result<Connection<TcpStream>, ListenerError> {
        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;
        let connection = Connection::new(stream, Some(addr));

        tracing::debug!(
            connection_id = %connection.id(),
            peer_addr = %addr,
            "Connection accepted"
        );

        Ok(connection)
    }

    /// Accept connections and run `handler` on each, strictly one after another.
    ///
    /// The next `accept` is not issued until the handler's future completes.
    /// Returns once `shutdown` fires or its sender is dropped; a cycle that is
    /// already in progress is allowed to finish first.
    pub async fn serve_forever<H, Fut>(&self, mut handler: H, mut shutdown: broadcast::Receiver<()>)
    where
        H: FnMut(Connection<TcpStream>) -> Fut,
        Fut: Future<Output = ()>,
    {
        tracing::info!(
            host = %self.local_addr.ip(),
            port = self.local_addr.port(),
            "Serving HTTP on port {} ...",
            self.local_addr.port()
        );

        let mut consecutive_failures: u32 = 0;

        loop {
            let accepted = tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Listener received shutdown signal, exiting accept loop");
                    break;
                }
                res = self.accept_one() => res,
            };

            match accepted {
                Ok(connection) => {
                    consecutive_failures = 0;
                    handler(connection).await;
                }
                Err(e) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    let delay = calculate_backoff(
                        consecutive_failures.min(8),
                        ACCEPT_RETRY_BASE_MS,
                        ACCEPT_RETRY_MAX_MS,
                    );
                    tracing::warn!(
                        error = %e,
                        attempt = consecutive_failures,
                        delay = ?delay,
                        "Accept failed, retrying"
                    );
                    tokio::select! {
                        _ = shutdown.recv() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
