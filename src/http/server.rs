//! HTTP server setup and the accept loop.
//!
//! # Responsibilities
//! - Bind the listener and derive `SERVER_NAME` / `SERVER_PORT`
//! - Run each accepted connection through a full `RequestCycle`
//! - Log and count every cycle outcome
//! - Keep the accept loop alive whatever a single cycle does

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;

use crate::config::ServerConfig;
use crate::http::app::Application;
use crate::http::cycle::{CycleError, CycleReport, CycleSettings, RequestCycle};
use crate::net::connection::{Connection, ConnectionTracker};
use crate::net::listener::{Listener, ListenerError};
use crate::observability::metrics;

/// A bound server ready to serve one application.
pub struct HttpServer {
    listener: Listener,
    application: Arc<dyn Application>,
    settings: CycleSettings,
    tracker: ConnectionTracker,
}

impl HttpServer {
    /// Bind the configured address and attach `application`.
    pub async fn bind<A>(config: &ServerConfig, application: A) -> Result<Self, ListenerError>
    where
        A: Application + 'static,
    {
        let listener = Listener::bind(config).await?;
        let local_addr = listener.local_addr();

        let settings = CycleSettings {
            server_name: config
                .server_name
                .clone()
                .unwrap_or_else(|| local_addr.ip().to_string()),
            server_port: local_addr.port(),
            server_software: config.server_software.clone(),
            read_buffer_size: config.read_buffer_size,
        };

        tracing::debug!(
            server_name = %settings.server_name,
            server_port = settings.server_port,
            "HTTP server configured"
        );

        Ok(Self {
            listener,
            application: Arc::new(application),
            settings,
            tracker: ConnectionTracker::new(),
        })
    }

    /// Serve connections one at a time until `shutdown` fires.
    pub async fn run(self, shutdown: broadcast::Receiver<()>) {
        let this = &self;
        this.listener
            .serve_forever(
                move |connection| async move {
                    this.handle_connection(connection).await;
                },
                shutdown,
            )
            .await;

        tracing::info!(
            connections = self.tracker.total_count(),
            "HTTP server stopped"
        );
    }

    /// Run one full request cycle. Errors are logged, never returned.
    pub async fn handle_connection<S>(&self, connection: Connection<S>) -> Option<CycleReport>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let connection_id = connection.id();
        let peer_addr = connection.peer_addr();
        let guard = self.tracker.track(connection_id);
        metrics::record_connection_accepted();
        metrics::set_active_connections(self.tracker.active_count());

        let start_time = Instant::now();
        let outcome = RequestCycle::new(connection, &self.settings)
            .run(&*self.application)
            .await;

        let report = match outcome {
            Ok(report) => {
                tracing::info!(
                    connection_id = %connection_id,
                    peer_addr = ?peer_addr,
                    method = %report.request.method,
                    path = %report.request.path,
                    status = %report.status_line,
                    bytes = report.bytes_written,
                    "Request served"
                );
                metrics::record_request(&report.request.method, report.status_code, start_time);
                Some(report)
            }
            Err(CycleError::EmptyRead) => {
                tracing::debug!(connection_id = %connection_id, "Client sent nothing, connection closed");
                metrics::record_cycle_aborted(CycleError::EmptyRead.reason());
                None
            }
            Err(e) => {
                tracing::error!(
                    connection_id = %connection_id,
                    peer_addr = ?peer_addr,
                    reason = e.reason(),
                    error = %e,
                    "Request cycle aborted"
                );
                metrics::record_cycle_aborted(e.reason());
                None
            }
        };

        drop(guard);
        metrics::set_active_connections(self.tracker.active_count());
        report
    }

    /// Get the address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Values handed to every request cycle.
    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    /// Connection counters for this server.
    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }
}
