//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (backlog, buffer size)
//! - Reject header tokens that would corrupt the wire format
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::GatewayConfig;

/// Largest accepted single-read buffer.
pub const MAX_READ_BUFFER: usize = 1024 * 1024;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("server.backlog must be greater than 0")]
    ZeroBacklog,

    #[error("server.read_buffer_size must be between 1 and {MAX_READ_BUFFER}, got {0}")]
    ReadBufferSize(usize),

    #[error("server.server_software must be a non-empty single line")]
    ServerSoftware,

    #[error("server.server_name must not be empty when set")]
    EmptyServerName,

    #[error("observability.log_level is not a valid filter: {0}")]
    LogLevel(String),
}

/// Check every semantic constraint, collecting all failures.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let server = &config.server;

    if server.backlog == 0 {
        errors.push(ValidationError::ZeroBacklog);
    }

    if server.read_buffer_size == 0 || server.read_buffer_size > MAX_READ_BUFFER {
        errors.push(ValidationError::ReadBufferSize(server.read_buffer_size));
    }

    let software = &server.server_software;
    if software.trim().is_empty() || software.contains(['\r', '\n']) {
        errors.push(ValidationError::ServerSoftware);
    }

    if server.server_name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        errors.push(ValidationError::EmptyServerName);
    }

    if EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
