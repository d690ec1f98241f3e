//! Minimal gateway-interface HTTP server.
//!
//! Accepts one TCP connection at a time, parses the request line, hands a
//! [`RequestContext`] and a [`StartResponse`] handle to an [`Application`],
//! and writes back the declared status line, headers and body.

pub mod apps;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;

pub use config::GatewayConfig;
pub use http::{
    application_fn, AppError, Application, HttpServer, RequestContext, ResponseBody, StartResponse,
};
pub use lifecycle::Shutdown;
