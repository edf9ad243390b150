//! Incremental HTTP/1.1 request parsing.
//!
//! [`RequestParser::try_parse`] consumes bytes from a [`ConnectionBuffer`]
//! and produces fully-assembled [`Request`] values. It is built for live
//! connections:
//!
//! - **Partial reads**: until the buffer holds a complete request, the
//!   parser returns [`ParseStatus::Incomplete`] without touching the
//!   buffer, so a later call sees the same data plus whatever arrived
//!   since. Incomplete is an expected outcome, not an error.
//! - **Pipelining**: exactly `header length + Content-Length` bytes are
//!   discarded per request, leaving any follow-up request at offset 0.
//! - **Terminal errors**: a malformed head or an unrecognized method is
//!   reported as an error without consuming anything; the connection
//!   layer owns the discard policy for a poisoned stream.
//!
//! Parsing is synchronous and performs no I/O; all data must already be
//! in the buffer when `try_parse` is invoked.

use std::fmt;

use memchr::memmem;
use rivet_core::{Headers, Method, Params, Request};
use tracing::{debug, trace, warn};

use crate::body;
use crate::buffer::ConnectionBuffer;
use crate::context::ConnContext;

/// Length of the `\r\n\r\n` header-block terminator.
const HEADER_TERMINATOR_LEN: usize = 4;

/// Find the end of the header block: the offset immediately after the
/// first `\r\n\r\n`.
///
/// Returns `None` while the terminator has not been buffered yet. Pure and
/// idempotent; safe to call repeatedly as bytes arrive.
#[must_use]
pub fn find_header_end(buffer: &[u8]) -> Option<usize> {
    memmem::find(buffer, b"\r\n\r\n").map(|pos| pos + HEADER_TERMINATOR_LEN)
}

/// Parsing limits.
#[derive(Debug, Clone)]
pub struct ParseLimits {
    /// Maximum header-block size in bytes (including the terminator).
    max_header_size: usize,
    /// Maximum declared body size in bytes.
    max_body_size: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_header_size: 64 * 1024,       // 64KB
            max_body_size: 10 * 1024 * 1024,  // 10MB
        }
    }
}

impl ParseLimits {
    /// Create limits with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum header-block size.
    #[must_use]
    pub fn with_max_header_size(mut self, size: usize) -> Self {
        self.max_header_size = size;
        self
    }

    /// Set the maximum declared body size.
    #[must_use]
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Returns the maximum header-block size.
    #[must_use]
    pub fn max_header_size(&self) -> usize {
        self.max_header_size
    }

    /// Returns the maximum declared body size.
    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }
}

/// Terminal request parsing error.
///
/// These are protocol violations, distinct from the expected
/// [`ParseStatus::Incomplete`] outcome: by the time either can be raised
/// the header terminator has been seen, so the rejected bytes are final.
/// The parser consumes nothing on error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Header bytes do not match the request-line/header grammar
    /// (HTTP 400 class).
    MalformedHeader,
    /// Method token outside the recognized set, carrying the raw token
    /// (HTTP 501 class).
    UnsupportedMethod {
        /// The offending method token as sent.
        token: String,
    },
    /// A configured limit was exceeded.
    TooLarge {
        /// The observed or declared size.
        size: usize,
        /// The configured maximum.
        max: usize,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedHeader => write!(f, "malformed request header"),
            Self::UnsupportedMethod { token } => write!(f, "unsupported method: {token}"),
            Self::TooLarge { size, max } => {
                write!(f, "request too large: {size} bytes exceeds limit of {max}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Result of an incremental parse attempt.
#[derive(Debug)]
pub enum ParseStatus {
    /// A complete request was assembled and its bytes consumed.
    Complete {
        /// The assembled request.
        request: Request,
        /// Bytes discarded from the front of the buffer.
        consumed: usize,
    },
    /// Not enough data yet; the buffer was left untouched. Re-invoke after
    /// more bytes arrive.
    Incomplete,
}

/// A parsed header block, before body handling.
#[derive(Debug)]
struct Head {
    method: Method,
    path: String,
    target: String,
    query_raw: Option<String>,
    headers: Headers,
}

/// Match the header block against the wire grammar:
/// `METHOD SP PATH SP "HTTP/1.1" CRLF (NAME ":" SP VALUE CRLF)* CRLF`.
///
/// Method and path tokens are non-empty and contain no spaces; header
/// names are non-empty and exclude `:`; values are everything after the
/// single mandatory space following the colon, untrimmed beyond it.
///
/// The method token is resolved only after the whole block has matched,
/// so an unknown method on a well-formed head reports
/// [`ParseError::UnsupportedMethod`] rather than a grammar failure.
fn parse_head(text: &str) -> Result<Head, ParseError> {
    let head = text
        .strip_suffix("\r\n\r\n")
        .ok_or(ParseError::MalformedHeader)?;
    let mut lines = head.split("\r\n");

    let request_line = lines.next().ok_or(ParseError::MalformedHeader)?;
    let mut tokens = request_line.split(' ');
    let (method_token, target, version) =
        match (tokens.next(), tokens.next(), tokens.next(), tokens.next()) {
            (Some(method), Some(target), Some(version), None)
                if !method.is_empty() && !target.is_empty() =>
            {
                (method, target, version)
            }
            _ => return Err(ParseError::MalformedHeader),
        };
    if version != "HTTP/1.1" {
        return Err(ParseError::MalformedHeader);
    }

    let mut headers = Headers::new();
    for line in lines {
        let (name, rest) = line.split_once(':').ok_or(ParseError::MalformedHeader)?;
        if name.is_empty() {
            return Err(ParseError::MalformedHeader);
        }
        let value = rest.strip_prefix(' ').ok_or(ParseError::MalformedHeader)?;
        headers.insert(name, value);
    }

    let method = Method::from_token(method_token).ok_or_else(|| ParseError::UnsupportedMethod {
        token: method_token.to_string(),
    })?;

    let (path, query_raw) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (target.to_string(), None),
    };

    Ok(Head {
        method,
        path,
        target: target.to_string(),
        query_raw,
        headers,
    })
}

/// The request assembler: the one entry point the connection layer calls.
#[derive(Debug, Default)]
pub struct RequestParser {
    limits: ParseLimits,
}

impl RequestParser {
    /// Create a parser with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            limits: ParseLimits::default(),
        }
    }

    /// Create a parser with the given limits.
    #[must_use]
    pub fn with_limits(limits: ParseLimits) -> Self {
        Self { limits }
    }

    /// Attempt to parse one request from the front of the buffer.
    ///
    /// Returns [`ParseStatus::Incomplete`] (buffer untouched) until the
    /// buffer holds the complete head and body, then consumes exactly
    /// `header length + Content-Length` bytes and returns the assembled
    /// request. GET requests carry no body on this wire: only the head is
    /// consumed and form/file collections stay empty whatever the headers
    /// claim.
    ///
    /// # Errors
    ///
    /// [`ParseError::MalformedHeader`] on a grammar violation,
    /// [`ParseError::UnsupportedMethod`] for an unrecognized method token,
    /// [`ParseError::TooLarge`] when a configured limit is exceeded. No
    /// bytes are consumed on error.
    pub fn try_parse(
        &self,
        buffer: &mut ConnectionBuffer,
        ctx: &ConnContext,
    ) -> Result<ParseStatus, ParseError> {
        let data = buffer.as_slice();

        let Some(header_len) = find_header_end(data) else {
            if data.len() > self.limits.max_header_size {
                return Err(ParseError::TooLarge {
                    size: data.len(),
                    max: self.limits.max_header_size,
                });
            }
            trace!(buffered = data.len(), "header terminator not yet buffered");
            return Ok(ParseStatus::Incomplete);
        };

        if header_len > self.limits.max_header_size {
            return Err(ParseError::TooLarge {
                size: header_len,
                max: self.limits.max_header_size,
            });
        }

        // The head must be US-ASCII text; the terminator was found, so
        // these bytes are final and anything else is a hard failure.
        let head_text = match std::str::from_utf8(&data[..header_len]) {
            Ok(text) if text.is_ascii() => text,
            _ => {
                warn!("non-ASCII bytes in request head");
                return Err(ParseError::MalformedHeader);
            }
        };

        let head = match parse_head(head_text) {
            Ok(head) => head,
            Err(err) => {
                warn!(error = %err, "rejected request head");
                return Err(err);
            }
        };

        let content_length = head.headers.get_int("content-length").unwrap_or(0);
        if content_length > self.limits.max_body_size {
            return Err(ParseError::TooLarge {
                size: content_length,
                max: self.limits.max_body_size,
            });
        }

        let total = if head.method == Method::Get {
            header_len
        } else {
            header_len + content_length
        };
        if data.len() < total {
            trace!(
                buffered = data.len(),
                required = total,
                "request body not yet buffered"
            );
            return Ok(ParseStatus::Incomplete);
        }

        let body_bytes = if head.method == Method::Get {
            Vec::new()
        } else {
            data[header_len..total].to_vec()
        };

        let query = head
            .query_raw
            .as_deref()
            .map(Params::parse_urlencoded)
            .unwrap_or_default();

        let (form, files) = if head.method == Method::Get {
            (Params::new(), Vec::new())
        } else {
            let kind = body::classify(head.headers.get("content-type"));
            body::decode(&body_bytes, &kind)
        };

        let host = head
            .headers
            .get("host")
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .map_or_else(|| ctx.local_addr().to_string(), ToString::to_string);
        let url = format!("{}://{}{}", ctx.scheme(), host, head.target);

        let mut request = Request::new(head.method, head.path);
        request.set_url(url);
        request.set_headers(head.headers);
        request.set_query(query);
        request.set_form(form);
        request.set_files(files);
        request.set_body(body_bytes);
        request.set_endpoints(*ctx.local_addr(), *ctx.remote_addr());

        buffer.discard_consumed(total);
        debug!(
            method = %request.method(),
            path = request.path(),
            consumed = total,
            "request parsed"
        );

        Ok(ParseStatus::Complete {
            request,
            consumed: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_from(bytes: &[u8]) -> ConnectionBuffer {
        let mut buffer = ConnectionBuffer::new();
        buffer.append(bytes);
        buffer
    }

    fn parse(bytes: &[u8]) -> Result<ParseStatus, ParseError> {
        RequestParser::new().try_parse(&mut buffer_from(bytes), &ConnContext::default())
    }

    fn parse_err(bytes: &[u8]) -> ParseError {
        parse(bytes).expect_err("parse should fail")
    }

    fn expect_request(status: Result<ParseStatus, ParseError>) -> (Request, usize) {
        match status.expect("parse should succeed") {
            ParseStatus::Complete { request, consumed } => (request, consumed),
            ParseStatus::Incomplete => panic!("expected a complete request"),
        }
    }

    #[test]
    fn find_header_end_reports_offset_after_terminator() {
        assert_eq!(find_header_end(b"GET / HTTP/1.1\r\n\r\n"), Some(18));
        assert_eq!(find_header_end(b"GET / HTTP/1.1\r\n"), None);
        assert_eq!(find_header_end(b""), None);
    }

    #[test]
    fn find_header_end_is_idempotent() {
        let data = b"GET / HTTP/1.1\r\n\r\ntrailing";
        assert_eq!(find_header_end(data), find_header_end(data));
    }

    #[test]
    fn parses_minimal_get() {
        let (request, consumed) = expect_request(parse(b"GET / HTTP/1.1\r\n\r\n"));
        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.path(), "/");
        assert_eq!(consumed, 18);
        assert!(request.body().is_empty());
    }

    #[test]
    fn parses_headers_and_query() {
        let (request, _) = expect_request(parse(
            b"GET /search?q=hello%20world&page=2 HTTP/1.1\r\nHost: example.com\r\nAccept: */*\r\n\r\n",
        ));
        assert_eq!(request.path(), "/search");
        assert_eq!(request.query().get("q"), Some("hello world"));
        assert_eq!(request.query().get("page"), Some("2"));
        assert_eq!(request.headers().get("host"), Some("example.com"));
        assert_eq!(request.url(), "http://example.com/search?q=hello%20world&page=2");
    }

    #[test]
    fn url_falls_back_to_local_endpoint_without_host() {
        let (request, _) = expect_request(parse(b"GET /x HTTP/1.1\r\n\r\n"));
        assert_eq!(request.url(), "http://127.0.0.1:0/x");
    }

    #[test]
    fn url_scheme_follows_encryption() {
        let ctx = ConnContext::new(
            "127.0.0.1:443".parse().expect("valid addr"),
            "10.0.0.9:40000".parse().expect("valid addr"),
            true,
        );
        let mut buffer = buffer_from(b"GET /secure HTTP/1.1\r\nHost: example.com\r\n\r\n");
        let status = RequestParser::new().try_parse(&mut buffer, &ctx);
        let (request, _) = expect_request(status);
        assert_eq!(request.url(), "https://example.com/secure");
        assert_eq!(request.local_addr().port(), 443);
    }

    #[test]
    fn header_value_not_trimmed_beyond_single_space() {
        let (request, _) =
            expect_request(parse(b"GET / HTTP/1.1\r\nX-Pad:   spaced  \r\n\r\n"));
        assert_eq!(request.headers().get("x-pad"), Some("  spaced  "));
    }

    #[test]
    fn missing_space_after_colon_is_malformed() {
        assert_eq!(
            parse_err(b"GET / HTTP/1.1\r\nName:value\r\n\r\n"),
            ParseError::MalformedHeader
        );
    }

    #[test]
    fn empty_header_name_is_malformed() {
        assert_eq!(
            parse_err(b"GET / HTTP/1.1\r\n: value\r\n\r\n"),
            ParseError::MalformedHeader
        );
    }

    #[test]
    fn header_without_colon_is_malformed() {
        assert_eq!(
            parse_err(b"GET / HTTP/1.1\r\nNoColonHere\r\n\r\n"),
            ParseError::MalformedHeader
        );
    }

    #[test]
    fn wrong_version_is_malformed() {
        assert_eq!(
            parse_err(b"GET / HTTP/1.0\r\n\r\n"),
            ParseError::MalformedHeader
        );
        assert_eq!(parse_err(b"GET / HTTP/2\r\n\r\n"), ParseError::MalformedHeader);
    }

    #[test]
    fn missing_tokens_are_malformed() {
        assert_eq!(parse_err(b"GET /\r\n\r\n"), ParseError::MalformedHeader);
        assert_eq!(parse_err(b"GET  HTTP/1.1\r\n\r\n"), ParseError::MalformedHeader);
        assert_eq!(
            parse_err(b"GET / HTTP/1.1 extra\r\n\r\n"),
            ParseError::MalformedHeader
        );
    }

    #[test]
    fn unknown_method_carries_token() {
        assert_eq!(
            parse_err(b"FOO /x HTTP/1.1\r\n\r\n"),
            ParseError::UnsupportedMethod {
                token: "FOO".to_string()
            }
        );
    }

    #[test]
    fn method_token_is_case_insensitive() {
        let (request, _) = expect_request(parse(b"get / HTTP/1.1\r\n\r\n"));
        assert_eq!(request.method(), Method::Get);
    }

    #[test]
    fn malformed_head_wins_over_unknown_method() {
        // Grammar is checked before method resolution.
        assert_eq!(
            parse_err(b"FOO /x HTTP/1.1\r\nbroken header\r\n\r\n"),
            ParseError::MalformedHeader
        );
    }

    #[test]
    fn non_ascii_head_is_malformed() {
        assert_eq!(
            parse_err("GET /caf\u{e9} HTTP/1.1\r\n\r\n".as_bytes()),
            ParseError::MalformedHeader
        );
    }

    #[test]
    fn error_leaves_buffer_untouched() {
        let mut buffer = buffer_from(b"FOO /x HTTP/1.1\r\n\r\n");
        let before = buffer.as_slice().to_vec();
        let result = RequestParser::new().try_parse(&mut buffer, &ConnContext::default());
        assert!(result.is_err());
        assert_eq!(buffer.as_slice(), &before[..]);
    }

    #[test]
    fn get_ignores_content_length() {
        // Stray headers on a GET never pull body bytes off the wire.
        let mut buffer = buffer_from(b"GET / HTTP/1.1\r\nContent-Length: 5\r\n\r\nnext!");
        let status = RequestParser::new().try_parse(&mut buffer, &ConnContext::default());
        let (request, consumed) = expect_request(status);
        assert!(request.body().is_empty());
        assert!(request.form().is_empty());
        assert!(request.files().is_empty());
        assert_eq!(consumed, 37);
        assert_eq!(buffer.as_slice(), b"next!");
    }

    #[test]
    fn unparsable_content_length_defaults_to_zero() {
        let (request, consumed) =
            expect_request(parse(b"POST /x HTTP/1.1\r\nContent-Length: nope\r\n\r\n"));
        assert!(request.body().is_empty());
        assert_eq!(consumed, 42);
    }

    #[test]
    fn post_reads_exact_body() {
        let (request, _) = expect_request(parse(
            b"POST /echo HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello",
        ));
        assert_eq!(request.body(), b"hello");
    }

    #[test]
    fn oversized_declared_body_is_too_large() {
        let parser = RequestParser::with_limits(ParseLimits::new().with_max_body_size(16));
        let mut buffer = buffer_from(b"POST / HTTP/1.1\r\nContent-Length: 1000\r\n\r\n");
        let err = parser
            .try_parse(&mut buffer, &ConnContext::default())
            .expect_err("declared body exceeds the limit");
        assert_eq!(err, ParseError::TooLarge { size: 1000, max: 16 });
    }

    #[test]
    fn unbounded_head_without_terminator_is_too_large() {
        let parser = RequestParser::with_limits(ParseLimits::new().with_max_header_size(32));
        let mut buffer = buffer_from(&[b'a'; 64]);
        assert!(matches!(
            parser.try_parse(&mut buffer, &ConnContext::default()),
            Err(ParseError::TooLarge { .. })
        ));
    }

    #[test]
    fn parse_error_display() {
        assert_eq!(
            ParseError::UnsupportedMethod {
                token: "BREW".to_string()
            }
            .to_string(),
            "unsupported method: BREW"
        );
        assert_eq!(
            ParseError::MalformedHeader.to_string(),
            "malformed request header"
        );
    }
}
