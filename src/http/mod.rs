//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection
//!     → cycle.rs (read once, drive the state machine)
//!     → request.rs (request line → method, path, version)
//!     → context.rs (RequestContext for the application)
//!     → app.rs (application declares status/headers, returns body)
//!     → response.rs (serialize declared response + body)
//!     → write, close
//! ```

pub mod app;
pub mod context;
pub mod cycle;
pub mod request;
pub mod response;
pub mod server;

pub use app::{application_fn, AppError, Application};
pub use context::{ContextValue, RequestContext};
pub use cycle::{CycleError, CycleReport, CycleSettings, CycleState, RequestCycle};
pub use request::{parse_request_line, ParseWarning, ParsedRequest, RequestLine};
pub use response::{serialize_response, DeclaredResponse, Headers, ResponseBody, StartResponse};
pub use server::HttpServer;
