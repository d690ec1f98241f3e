//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, accept loop, accept-error backoff)
//!     → connection.rs (connection id, exclusive stream ownership)
//!     → Hand off to the HTTP request cycle
//! ```
//!
//! # Design Decisions
//! - One connection in flight: the accept loop awaits each handler inline
//! - Accept errors are retried, never fatal
//! - The stream is owned by exactly one `Connection` and closed with it

pub mod connection;
pub mod listener;

pub use connection::{Connection, ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{Listener, ListenerError};
