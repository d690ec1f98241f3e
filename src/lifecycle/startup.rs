//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter when enabled
//! - Bind the listener (fatal on failure)
//! - Serve until a shutdown signal arrives

use thiserror::Error;

use crate::config::{ConfigError, GatewayConfig};
use crate::http::app::Application;
use crate::http::server::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_signal;
use crate::net::listener::ListenerError;
use crate::observability::metrics;

/// Errors that stop the process before it serves anything.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bind(#[from] ListenerError),
}

/// Bind, serve, and return after a shutdown signal.
pub async fn start<A>(config: GatewayConfig, application: A) -> Result<(), StartupError>
where
    A: Application + 'static,
{
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                );
            }
        }
    }

    let server = HttpServer::bind(&config.server, application).await?;
    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_signal().await;
            shutdown.trigger();
        }
    });

    server.run(receiver).await;
    drop(shutdown);
    Ok(())
}
