//! The per-connection request cycle.
//!
//! # State machine
//! ```text
//! Idle → Reading → Parsed → ContextBuilt → AppInvoked → ResponseDeclared → Sent → Closed
//!          │                                   │               │            │
//!          └──────────────── Aborted ◀─────────┴───────────────┴────────────┘
//! ```
//! `Sent` is only reachable from `ResponseDeclared`. Every path ends with the
//! connection closed, and no failure here propagates past the cycle.

use std::panic::{catch_unwind, AssertUnwindSafe};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::http::app::{AppError, Application};
use crate::http::context::RequestContext;
use crate::http::request::{parse_request_line, ParseWarning, ParsedRequest, RequestLine};
use crate::http::response::{serialize_response, ResponseBody, StartResponse};
use crate::net::connection::{Connection, ConnectionId};

/// Where a cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Reading,
    Parsed,
    ContextBuilt,
    AppInvoked,
    ResponseDeclared,
    Sent,
    Closed,
    Aborted,
}

impl CycleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CycleState::Closed | CycleState::Aborted)
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_advance_to(self, next: CycleState) -> bool {
        use CycleState::*;
        match (self, next) {
            (Closed | Aborted, _) => false,
            (_, Aborted) => true,
            (Idle, Reading)
            | (Reading, Parsed)
            | (Parsed, ContextBuilt)
            | (ContextBuilt, AppInvoked)
            | (AppInvoked, ResponseDeclared)
            | (ResponseDeclared, Sent)
            | (Sent, Closed) => true,
            _ => false,
        }
    }
}

/// Ways a single cycle can fail. None of them stop the server.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("client sent no data")]
    EmptyRead,

    #[error("failed to read request: {0}")]
    Read(#[source] std::io::Error),

    #[error("application failed: {0}")]
    Application(#[source] AppError),

    #[error("response finished before start_response was called")]
    Protocol,

    #[error("failed to write response: {0}")]
    Write(#[source] std::io::Error),
}

impl CycleError {
    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            CycleError::EmptyRead => "empty_read",
            CycleError::Read(_) => "read_error",
            CycleError::Application(_) => "application_error",
            CycleError::Protocol => "protocol_error",
            CycleError::Write(_) => "write_error",
        }
    }
}

/// Server-wide values every cycle needs.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub server_name: String,
    pub server_port: u16,
    pub server_software: String,
    pub read_buffer_size: usize,
}

/// Summary of a completed cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub connection_id: ConnectionId,
    pub request: RequestLine,
    pub warning: Option<ParseWarning>,
    pub status_line: String,
    pub status_code: Option<u16>,
    pub bytes_written: usize,
}

/// One request/response exchange over one connection.
pub struct RequestCycle<'a, S> {
    connection: Connection<S>,
    settings: &'a CycleSettings,
    start_response: StartResponse,
    state: CycleState,
}

impl<'a, S> RequestCycle<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(connection: Connection<S>, settings: &'a CycleSettings) -> Self {
        Self {
            connection,
            start_response: StartResponse::new(settings.server_software.clone()),
            settings,
            state: CycleState::Idle,
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn connection(&self) -> &Connection<S> {
        &self.connection
    }

    /// Drive the full cycle against `app`.
    pub async fn run<A>(mut self, app: &A) -> Result<CycleReport, CycleError>
    where
        A: Application + ?Sized,
    {
        let raw = self.read_request().await?;
        let parsed = self.parse(&raw);
        let context = self.build_context(&parsed.line, raw);

        let body = match self.invoke(app, &context) {
            Ok(body) => body,
            Err(e) => {
                self.abort().await;
                return Err(e);
            }
        };

        let (status_line, status_code) = self
            .start_response
            .declared()
            .map(|d| (d.status_line.clone(), d.status_code()))
            .unwrap_or_default();
        let bytes_written = self.finish_response(body).await?;

        Ok(CycleReport {
            connection_id: self.connection.id(),
            request: parsed.line,
            warning: parsed.warning,
            status_line,
            status_code,
            bytes_written,
        })
    }

    /// Perform the single read. An empty read closes the connection.
    pub async fn read_request(&mut self) -> Result<Vec<u8>, CycleError> {
        self.advance(CycleState::Reading);

        let raw = match self.connection.read_once(self.settings.read_buffer_size).await {
            Ok(raw) => raw,
            Err(e) => {
                self.abort().await;
                return Err(CycleError::Read(e));
            }
        };

        if raw.is_empty() {
            self.abort().await;
            return Err(CycleError::EmptyRead);
        }

        for line in String::from_utf8_lossy(&raw).lines() {
            tracing::trace!(connection_id = %self.connection.id(), "< {}", line);
        }
        Ok(raw)
    }

    /// Parse the request line, degrading to empty fields on bad input.
    pub fn parse(&mut self, raw: &[u8]) -> ParsedRequest {
        let parsed = parse_request_line(raw);
        if let Some(warning) = &parsed.warning {
            tracing::warn!(
                connection_id = %self.connection.id(),
                warning = %warning,
                "Malformed request line, continuing with empty fields"
            );
        }
        self.advance(CycleState::Parsed);
        parsed
    }

    /// Build the context the application will see.
    pub fn build_context(&mut self, line: &RequestLine, raw: Vec<u8>) -> RequestContext {
        let context = RequestContext::build(
            line,
            &self.settings.server_name,
            self.settings.server_port,
            raw,
        );
        self.advance(CycleState::ContextBuilt);
        context
    }

    /// Call the application, converting failures and panics into errors.
    pub fn invoke<A>(&mut self, app: &A, context: &RequestContext) -> Result<ResponseBody, CycleError>
    where
        A: Application + ?Sized,
    {
        self.advance(CycleState::AppInvoked);

        let start_response = &mut self.start_response;
        let outcome = catch_unwind(AssertUnwindSafe(|| app.call(context, start_response)));

        let body = match outcome {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => return Err(CycleError::Application(e)),
            Err(panic) => return Err(panicked(panic)),
        };

        if self.start_response.declared().is_some() {
            self.advance(CycleState::ResponseDeclared);
        }
        Ok(body)
    }

    /// Declare the response on the application's behalf.
    pub fn start_response(&mut self) -> &mut StartResponse {
        &mut self.start_response
    }

    /// Serialize and send the declared response, then close the connection.
    ///
    /// Fails with [`CycleError::Protocol`] when nothing was declared. The
    /// connection is closed whether or not the write succeeds.
    pub async fn finish_response(&mut self, body: ResponseBody) -> Result<usize, CycleError> {
        let Some(declared) = self.start_response.take() else {
            self.abort().await;
            return Err(CycleError::Protocol);
        };
        if self.state != CycleState::ResponseDeclared {
            // declared through start_response() rather than invoke()
            self.state = CycleState::ResponseDeclared;
        }

        // body chunks may be produced lazily by application code
        let wire = match catch_unwind(AssertUnwindSafe(|| serialize_response(&declared, body))) {
            Ok(wire) => wire,
            Err(panic) => {
                self.abort().await;
                return Err(panicked(panic));
            }
        };
        for line in String::from_utf8_lossy(&wire).lines() {
            tracing::trace!(connection_id = %self.connection.id(), "> {}", line);
        }

        let result = self.connection.send_all(&wire).await;
        match result {
            Ok(()) => {
                self.advance(CycleState::Sent);
                self.connection.close().await;
                self.advance(CycleState::Closed);
                Ok(wire.len())
            }
            Err(e) => {
                self.abort().await;
                Err(CycleError::Write(e))
            }
        }
    }

    async fn abort(&mut self) {
        self.connection.close().await;
        self.advance(CycleState::Aborted);
    }

    fn advance(&mut self, next: CycleState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal cycle transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::trace!(
            connection_id = %self.connection.id(),
            from = ?self.state,
            to = ?next,
            "Cycle state change"
        );
        self.state = next;
    }
}

fn panicked(panic: Box<dyn std::any::Any + Send>) -> CycleError {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    CycleError::Application(format!("application panicked: {}", message).into())
}
