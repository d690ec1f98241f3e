//! The per-request environment handed to the application.
//!
//! A `RequestContext` is a read-only mapping from the fixed gateway keys
//! (`REQUEST_METHOD`, `wsgi.input`, ...) to values. It is built once from the
//! parsed request line and dropped when the cycle ends.
//!
//! `wsgi.input` exposes the *entire* raw request, request line and headers
//! included, not just the bytes after the blank line.

use std::io::{Cursor, Write};

use crate::http::request::RequestLine;

pub const WSGI_VERSION: &str = "wsgi.version";
pub const WSGI_URL_SCHEME: &str = "wsgi.url_scheme";
pub const WSGI_INPUT: &str = "wsgi.input";
pub const WSGI_ERRORS: &str = "wsgi.errors";
pub const WSGI_MULTITHREAD: &str = "wsgi.multithread";
pub const WSGI_MULTIPROCESS: &str = "wsgi.multiprocess";
pub const WSGI_RUN_ONCE: &str = "wsgi.run_once";
pub const REQUEST_METHOD: &str = "REQUEST_METHOD";
pub const PATH_INFO: &str = "PATH_INFO";
pub const SERVER_NAME: &str = "SERVER_NAME";
pub const SERVER_PORT: &str = "SERVER_PORT";
pub const SERVER_PROTOCOL: &str = "SERVER_PROTOCOL";

/// Every key a context answers to, in a stable order.
pub const CONTEXT_KEYS: [&str; 12] = [
    WSGI_VERSION,
    WSGI_URL_SCHEME,
    WSGI_INPUT,
    WSGI_ERRORS,
    WSGI_MULTITHREAD,
    WSGI_MULTIPROCESS,
    WSGI_RUN_ONCE,
    REQUEST_METHOD,
    PATH_INFO,
    SERVER_NAME,
    SERVER_PORT,
    SERVER_PROTOCOL,
];

/// A value looked up by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextValue<'a> {
    Str(&'a str),
    Bool(bool),
    Version(u8, u8),
    /// Raw request bytes behind `wsgi.input`.
    Input(&'a [u8]),
    /// Marker for `wsgi.errors`; use [`RequestContext::errors`] to write.
    Errors,
}

/// Environment for a single request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_method: String,
    path_info: String,
    server_protocol: String,
    server_name: String,
    server_port: String,
    input: Vec<u8>,
}

impl RequestContext {
    /// Populate every entry from the parsed line and the raw request.
    pub fn build(line: &RequestLine, server_name: &str, server_port: u16, raw: Vec<u8>) -> Self {
        Self {
            request_method: line.method.clone(),
            path_info: line.path.clone(),
            server_protocol: line.version.clone(),
            server_name: server_name.to_string(),
            server_port: server_port.to_string(),
            input: raw,
        }
    }

    /// Look up an entry by its gateway key.
    pub fn get(&self, key: &str) -> Option<ContextValue<'_>> {
        let value = match key {
            WSGI_VERSION => ContextValue::Version(1, 0),
            WSGI_URL_SCHEME => ContextValue::Str(self.url_scheme()),
            WSGI_INPUT => ContextValue::Input(&self.input),
            WSGI_ERRORS => ContextValue::Errors,
            WSGI_MULTITHREAD => ContextValue::Bool(self.multithread()),
            WSGI_MULTIPROCESS => ContextValue::Bool(self.multiprocess()),
            WSGI_RUN_ONCE => ContextValue::Bool(self.run_once()),
            REQUEST_METHOD => ContextValue::Str(&self.request_method),
            PATH_INFO => ContextValue::Str(&self.path_info),
            SERVER_NAME => ContextValue::Str(&self.server_name),
            SERVER_PORT => ContextValue::Str(&self.server_port),
            SERVER_PROTOCOL => ContextValue::Str(&self.server_protocol),
            _ => return None,
        };
        Some(value)
    }

    /// Iterate over all entries in [`CONTEXT_KEYS`] order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, ContextValue<'_>)> + '_ {
        CONTEXT_KEYS
            .into_iter()
            .filter_map(move |key| self.get(key).map(|value| (key, value)))
    }

    pub fn version(&self) -> (u8, u8) {
        (1, 0)
    }

    pub fn url_scheme(&self) -> &str {
        "http"
    }

    pub fn multithread(&self) -> bool {
        false
    }

    pub fn multiprocess(&self) -> bool {
        false
    }

    pub fn run_once(&self) -> bool {
        false
    }

    pub fn request_method(&self) -> &str {
        &self.request_method
    }

    pub fn path_info(&self) -> &str {
        &self.path_info
    }

    pub fn server_protocol(&self) -> &str {
        &self.server_protocol
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn server_port(&self) -> &str {
        &self.server_port
    }

    /// A fresh reader over the raw request bytes.
    pub fn input(&self) -> Cursor<&[u8]> {
        Cursor::new(self.input.as_slice())
    }

    /// A writer whose lines are forwarded to the log.
    pub fn errors(&self) -> ErrorStream {
        ErrorStream::default()
    }
}

/// `wsgi.errors`: line-buffered writer that logs each line at `warn`.
#[derive(Debug, Default)]
pub struct ErrorStream {
    pending: Vec<u8>,
}

impl ErrorStream {
    fn emit(line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches('\r');
        tracing::warn!(target: "gateway_server::app", "{}", line);
    }
}

impl Write for ErrorStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            Self::emit(&line[..line.len() - 1]);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            Self::emit(&line);
        }
        Ok(())
    }
}

impl Drop for ErrorStream {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
