//! Response declaration and serialization.
//!
//! # Responsibilities
//! - Record the status line and headers declared by the application
//! - Append the server-identifying `Date` and `Server` headers
//! - Serialize status line, headers and body chunks into wire bytes
//!
//! # Design Decisions
//! - Headers are an ordered list of pairs; order is part of the wire format
//!   and duplicate names are legal
//! - No `Content-Length` is added; the client reads until the connection closes
//! - A repeated declaration replaces the previous one

use chrono::{DateTime, Utc};

/// Ordered `(name, value)` header pairs.
pub type Headers = Vec<(String, String)>;

/// Protocol prefix of every status line.
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// Status line and headers the application committed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredResponse {
    pub status_line: String,
    pub headers: Headers,
}

impl DeclaredResponse {
    /// Numeric code at the start of the status line, if any.
    pub fn status_code(&self) -> Option<u16> {
        self.status_line
            .split_whitespace()
            .next()
            .and_then(|code| code.parse().ok())
    }

    /// First value of the named header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Format a timestamp as an RFC 1123 date in GMT.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// The registration handle passed to the application.
///
/// The application calls [`StartResponse::start`] once with its status and
/// headers before returning the body.
#[derive(Debug)]
pub struct StartResponse {
    server_software: String,
    declared: Option<DeclaredResponse>,
    calls: u32,
}

impl StartResponse {
    pub fn new(server_software: impl Into<String>) -> Self {
        Self {
            server_software: server_software.into(),
            declared: None,
            calls: 0,
        }
    }

    /// Declare the response status and headers.
    ///
    /// `Date` and `Server` are appended after the given headers. Calling this
    /// again overwrites the earlier declaration.
    pub fn start<I, K, V>(&mut self, status_line: impl Into<String>, headers: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.start_at(status_line, headers, Utc::now());
    }

    /// [`start`](Self::start) with an explicit `Date` value.
    pub fn start_at<I, K, V>(&mut self, status_line: impl Into<String>, headers: I, now: DateTime<Utc>)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut headers: Headers = headers
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        headers.push(("Date".to_string(), http_date(now)));
        headers.push(("Server".to_string(), self.server_software.clone()));

        let status_line = status_line.into();
        self.calls += 1;
        if let Some(previous) = &self.declared {
            tracing::debug!(
                previous = %previous.status_line,
                status = %status_line,
                "start_response called again, replacing previous declaration"
            );
        }

        self.declared = Some(DeclaredResponse {
            status_line,
            headers,
        });
    }

    /// The current declaration, if any.
    pub fn declared(&self) -> Option<&DeclaredResponse> {
        self.declared.as_ref()
    }

    /// Number of times `start` has been called.
    pub fn call_count(&self) -> u32 {
        self.calls
    }

    /// Remove the declaration, leaving the handle empty.
    pub fn take(&mut self) -> Option<DeclaredResponse> {
        self.declared.take()
    }
}

/// Body chunks returned by the application, consumed once in order.
pub struct ResponseBody {
    chunks: Box<dyn Iterator<Item = Vec<u8>> + Send>,
}

impl ResponseBody {
    /// Wrap any (possibly lazy) chunk iterator.
    pub fn new<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            chunks: Box::new(chunks.into_iter()),
        }
    }

    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// A body made of one chunk.
    pub fn once(chunk: impl Into<Vec<u8>>) -> Self {
        Self::new(std::iter::once(chunk.into()))
    }

    /// Build from anything convertible to byte chunks, in order.
    pub fn from_chunks<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        Self::new(chunks.into_iter().map(Into::into).collect::<Vec<_>>())
    }
}

impl Iterator for ResponseBody {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        self.chunks.next()
    }
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseBody").finish_non_exhaustive()
    }
}

impl From<Vec<Vec<u8>>> for ResponseBody {
    fn from(chunks: Vec<Vec<u8>>) -> Self {
        Self::new(chunks)
    }
}

impl From<&'static [u8]> for ResponseBody {
    fn from(chunk: &'static [u8]) -> Self {
        Self::once(chunk)
    }
}

impl From<&'static str> for ResponseBody {
    fn from(chunk: &'static str) -> Self {
        Self::once(chunk)
    }
}

impl From<String> for ResponseBody {
    fn from(chunk: String) -> Self {
        Self::once(chunk)
    }
}

/// Build the full wire response.
///
/// `HTTP/1.1 <status>\r\n`, one `Name: Value\r\n` per header, `\r\n`, then
/// every body chunk in arrival order.
pub fn serialize_response(declared: &DeclaredResponse, body: ResponseBody) -> Vec<u8> {
    let mut out = Vec::with_capacity(128);
    out.extend_from_slice(format!("{} {}\r\n", HTTP_VERSION, declared.status_line).as_bytes());
    for (name, value) in &declared.headers {
        out.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
    }
    out.extend_from_slice(b"\r\n");
    for chunk in body {
        out.extend_from_slice(&chunk);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap()
    }

    #[test]
    fn http_date_is_rfc1123_gmt() {
        assert_eq!(http_date(fixed_time()), "Wed, 21 Oct 2015 07:28:00 GMT");
    }

    #[test]
    fn start_appends_server_headers_after_application_headers() {
        let mut start = StartResponse::new("WSGIServer 0.2");
        start.start_at(
            "200 OK",
            [("Content-Type", "text/plain"), ("X-Trace", "abc")],
            fixed_time(),
        );

        let declared = start.declared().unwrap();
        assert_eq!(declared.status_line, "200 OK");
        assert_eq!(
            declared.headers,
            vec![
                ("Content-Type".to_string(), "text/plain".to_string()),
                ("X-Trace".to_string(), "abc".to_string()),
                ("Date".to_string(), "Wed, 21 Oct 2015 07:28:00 GMT".to_string()),
                ("Server".to_string(), "WSGIServer 0.2".to_string()),
            ]
        );
    }

    #[test]
    fn second_start_replaces_first() {
        let mut start = StartResponse::new("test");
        start.start("500 Internal Server Error", [("X-First", "1")]);
        start.start("404 Not Found", [("X-Second", "2")]);

        let declared = start.declared().unwrap();
        assert_eq!(start.call_count(), 2);
        assert_eq!(declared.status_line, "404 Not Found");
        assert_eq!(declared.header("x-second"), Some("2"));
        assert_eq!(declared.header("X-First"), None);
        assert_eq!(declared.headers.len(), 3);
    }

    #[test]
    fn duplicate_header_names_are_kept_in_order() {
        let mut start = StartResponse::new("test");
        start.start("200 OK", [("Set-Cookie", "a=1"), ("Set-Cookie", "b=2")]);

        let cookies: Vec<_> = start
            .declared()
            .unwrap()
            .headers
            .iter()
            .filter(|(n, _)| n == "Set-Cookie")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
    }

    #[test]
    fn status_code_parses_leading_number() {
        let declared = DeclaredResponse {
            status_line: "418 I'm a teapot".into(),
            headers: Vec::new(),
        };
        assert_eq!(declared.status_code(), Some(418));

        let odd = DeclaredResponse {
            status_line: "OK".into(),
            headers: Vec::new(),
        };
        assert_eq!(odd.status_code(), None);
    }

    #[test]
    fn serializes_status_headers_blank_line_and_chunks() {
        let declared = DeclaredResponse {
            status_line: "200 OK".into(),
            headers: vec![
                ("Content-Type".into(), "text/plain".into()),
                ("Server".into(), "test".into()),
            ],
        };
        let body = ResponseBody::from_chunks(["Hello, ", "World", "!"]);

        let wire = serialize_response(&declared, body);
        assert_eq!(
            wire,
            b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nServer: test\r\n\r\nHello, World!".to_vec()
        );
    }

    #[test]
    fn empty_body_ends_at_blank_line() {
        let declared = DeclaredResponse {
            status_line: "204 No Content".into(),
            headers: Vec::new(),
        };

        let wire = serialize_response(&declared, ResponseBody::empty());
        assert_eq!(wire, b"HTTP/1.1 204 No Content\r\n\r\n".to_vec());
    }

    #[test]
    fn lazy_body_is_consumed_in_order() {
        let body = ResponseBody::new((0..3u8).map(|i| vec![b'a' + i]));
        let collected: Vec<u8> = body.flatten().collect();
        assert_eq!(collected, b"abc");
    }
}
