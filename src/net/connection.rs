//! Accepted connections and lifetime tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Own the client stream for the duration of one request cycle
//! - Count open connections (the serve loop never exceeds one)

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A bidirectional byte stream to one client.
///
/// Generic over the stream so the request cycle can be driven by in-memory
/// pipes in tests; the listener always produces `Connection<TcpStream>`.
#[derive(Debug)]
pub struct Connection<S = TcpStream> {
    id: ConnectionId,
    peer_addr: Option<SocketAddr>,
    stream: S,
    closed: bool,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an accepted stream.
    pub fn new(stream: S, peer_addr: Option<SocketAddr>) -> Self {
        Self {
            id: ConnectionId::new(),
            peer_addr,
            stream,
            closed: false,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Perform a single read of at most `limit` bytes.
    ///
    /// Returns an empty vector when the peer sent nothing before closing.
    pub async fn read_once(&mut self, limit: usize) -> std::io::Result<Vec<u8>> {
        let mut buf = vec![0u8; limit];
        let n = self.stream.read(&mut buf).await?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Write the whole buffer and flush it.
    pub async fn send_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await
    }

    /// Shut down the write half. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.stream.shutdown().await {
            tracing::trace!(connection_id = %self.id, error = %e, "Shutdown after close failed");
        }
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

/// Tracks open connections.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
    total_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self, id: ConnectionId) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        self.total_count.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id,
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Connections seen since the tracker was created.
    pub fn total_count(&self) -> u64 {
        self.total_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(connection_id = %self.id, "Connection released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id2.as_u64() > id1.as_u64());
    }

    #[test]
    fn connection_tracker_counts() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.active_count(), 0);

        let guard1 = tracker.track(ConnectionId::new());
        assert_eq!(tracker.active_count(), 1);

        let guard2 = tracker.track(ConnectionId::new());
        assert_eq!(tracker.active_count(), 2);

        drop(guard1);
        assert_eq!(tracker.active_count(), 1);

        drop(guard2);
        assert_eq!(tracker.active_count(), 0);
        assert_eq!(tracker.total_count(), 2);
    }

    #[tokio::test]
    async fn read_once_stops_after_one_read() {
        let (client, server) = tokio::io::duplex(64);
        let mut client = client;
        let mut conn = Connection::new(server, None);

        client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
        let bytes = conn.read_once(4).await.unwrap();
        assert_eq!(bytes, b"GET ");
    }

    #[tokio::test]
    async fn read_once_returns_empty_on_eof() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);
        let mut conn = Connection::new(server, None);

        assert!(conn.read_once(1024).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (_client, server) = tokio::io::duplex(64);
        let mut conn = Connection::new(server, None);

        conn.close().await;
        conn.close().await;
        assert!(conn.is_closed());
    }
}
