//! Request-line parsing.
//!
//! Only the first line of the raw request is interpreted; headers and body
//! stay raw and reach the application through `wsgi.input`.

use std::fmt;

/// The three tokens of an HTTP request line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub path: String,
    pub version: String,
}

impl RequestLine {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for RequestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.method, self.path, self.version)
    }
}

/// Why a request line was replaced by empty fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// The request contained no line at all.
    MissingRequestLine,
    /// The first line did not split into exactly three tokens.
    MalformedRequestLine { line: String, tokens: usize },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::MissingRequestLine => write!(f, "request has no request line"),
            ParseWarning::MalformedRequestLine { line, tokens } => {
                write!(f, "request line {:?} has {} tokens, expected 3", line, tokens)
            }
        }
    }
}

/// Result of parsing: always a request line, plus a warning when it degraded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub line: RequestLine,
    pub warning: Option<ParseWarning>,
}

/// Extract `(method, path, version)` from the first line of `raw`.
///
/// Malformed or absent lines degrade to empty strings with a warning.
pub fn parse_request_line(raw: &[u8]) -> ParsedRequest {
    let text = String::from_utf8_lossy(raw);

    let Some(first) = text.lines().next() else {
        return degraded(ParseWarning::MissingRequestLine);
    };
    let first = first.trim_end_matches(['\r', '\n']);

    let tokens: Vec<&str> = first.split_whitespace().collect();
    match tokens.as_slice() {
        [method, path, version] => ParsedRequest {
            line: RequestLine::new(*method, *path, *version),
            warning: None,
        },
        _ => degraded(ParseWarning::MalformedRequestLine {
            line: first.to_string(),
            tokens: tokens.len(),
        }),
    }
}

fn degraded(warning: ParseWarning) -> ParsedRequest {
    ParsedRequest {
        line: RequestLine::default(),
        warning: Some(warning),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_three_tokens() {
        let parsed = parse_request_line(b"GET /index.html HTTP/1.1\r\nHost: example\r\n\r\n");
        assert_eq!(parsed.line, RequestLine::new("GET", "/index.html", "HTTP/1.1"));
        assert!(parsed.warning.is_none());
    }

    #[test]
    fn accepts_bare_newline_terminator() {
        let parsed = parse_request_line(b"POST /submit HTTP/1.0\nContent-Length: 0\n\n");
        assert_eq!(parsed.line, RequestLine::new("POST", "/submit", "HTTP/1.0"));
    }

    #[test]
    fn accepts_line_without_terminator() {
        let parsed = parse_request_line(b"DELETE /item/7 HTTP/1.1");
        assert_eq!(parsed.line.method, "DELETE");
        assert_eq!(parsed.line.path, "/item/7");
        assert_eq!(parsed.line.version, "HTTP/1.1");
    }

    #[test]
    fn tolerates_repeated_whitespace() {
        let parsed = parse_request_line(b"GET   /a\tHTTP/1.1\r\n");
        assert_eq!(parsed.line, RequestLine::new("GET", "/a", "HTTP/1.1"));
    }

    #[test]
    fn empty_input_degrades() {
        let parsed = parse_request_line(b"");
        assert_eq!(parsed.line, RequestLine::default());
        assert_eq!(parsed.warning, Some(ParseWarning::MissingRequestLine));
    }

    #[test]
    fn blank_first_line_degrades() {
        let parsed = parse_request_line(b"\r\nGET / HTTP/1.1\r\n");
        assert_eq!(parsed.line, RequestLine::default());
        assert_eq!(
            parsed.warning,
            Some(ParseWarning::MalformedRequestLine {
                line: String::new(),
                tokens: 0
            })
        );
    }

    #[test]
    fn wrong_token_count_degrades() {
        let two = parse_request_line(b"GET /\r\n\r\n");
        assert_eq!(two.line, RequestLine::default());
        assert!(matches!(
            two.warning,
            Some(ParseWarning::MalformedRequestLine { tokens: 2, .. })
        ));

        let four = parse_request_line(b"GET / HTTP/1.1 extra\r\n");
        assert!(matches!(
            four.warning,
            Some(ParseWarning::MalformedRequestLine { tokens: 4, .. })
        ));
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let parsed = parse_request_line(b"GET /caf\xe9 HTTP/1.1\r\n");
        assert_eq!(parsed.line.method, "GET");
        assert_eq!(parsed.line.path, "/caf\u{fffd}");
    }

    #[test]
    fn display_round_trips_line() {
        let line = RequestLine::new("GET", "/", "HTTP/1.1");
        assert_eq!(line.to_string(), "GET / HTTP/1.1");
    }
}
