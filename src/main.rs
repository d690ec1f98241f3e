//! gateway-server
//!
//! ```text
//!     Client Request
//!     ───────────────▶ net::listener ──▶ http::cycle ──▶ application
//!                        (accept)        read, parse,      start_response(),
//!                                        build context     body chunks
//!                                             │
//!     Client Response                         ▼
//!     ◀─────────────── close ◀─── write ◀─ http::response (serialize)
//! ```
//!
//! One connection is served to completion before the next is accepted.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use gateway_server::apps;
use gateway_server::config::{load_config, validated, GatewayConfig};
use gateway_server::lifecycle::startup::{self, StartupError};
use gateway_server::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "gateway-server")]
#[command(about = "Minimal single-connection HTTP gateway server", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides the config file).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides the config file).
    #[arg(short, long)]
    port: Option<u16>,

    /// Listen backlog (overrides the config file).
    #[arg(long)]
    backlog: Option<u32>,

    /// Application to serve.
    #[arg(short, long, value_enum, default_value_t = AppKind::Hello)]
    app: AppKind,
}

#[derive(Clone, Copy, ValueEnum)]
enum AppKind {
    /// Plain-text greeting.
    Hello,
    /// JSON dump of the request context.
    Environ,
}

impl Cli {
    fn resolve_config(&self) -> Result<GatewayConfig, StartupError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => GatewayConfig::default(),
        };

        if let Some(host) = &self.host {
            config.server.bind_host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.bind_port = port;
        }
        if let Some(backlog) = self.backlog {
            config.server.backlog = backlog;
        }
        Ok(validated(config)?)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    init_logging(&config.observability)?;

    tracing::info!("gateway-server v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_host = %config.server.bind_host,
        bind_port = config.server.bind_port,
        backlog = config.server.backlog,
        "Configuration loaded"
    );

    match cli.app {
        AppKind::Hello => startup::start(config, apps::hello_world()).await?,
        AppKind::Environ => startup::start(config, apps::environ_dump()).await?,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
