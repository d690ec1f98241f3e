//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listening socket and request-cycle settings.
    pub server: ServerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host or IP to bind. An empty string binds all interfaces.
    pub bind_host: String,

    /// TCP port to bind. Port 0 asks the OS for a free port.
    pub bind_port: u16,

    /// Listen queue length.
    pub backlog: u32,

    /// Size of the single read performed per request.
    pub read_buffer_size: usize,

    /// Value exposed as `SERVER_NAME`. Defaults to the bound IP.
    pub server_name: Option<String>,

    /// Token sent in the `Server` response header.
    pub server_software: String,
}

impl ServerConfig {
    /// Host to hand to the resolver; empty means every interface.
    pub fn resolved_host(&self) -> &str {
        if self.bind_host.is_empty() {
            "0.0.0.0"
        } else {
            &self.bind_host
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            bind_port: 8080,
            backlog: 1,
            read_buffer_size: 1024,
            server_name: None,
            server_software: "WSGIServer 0.2".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
