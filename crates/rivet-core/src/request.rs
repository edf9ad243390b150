//! HTTP request types.
//!
//! [`Request`] is assembled once by the wire-level parser and treated as
//! read-only afterwards: the routing layer that receives it only ever
//! inspects it. The derived classification predicates
//! ([`is_websocket_upgrade`][Request::is_websocket_upgrade],
//! [`is_ajax`][Request::is_ajax], [`is_event_stream`][Request::is_event_stream])
//! are pure functions of the method and headers.

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::multipart::UploadFile;
use crate::params::Params;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET method.
    Get,
    /// POST method.
    Post,
    /// PUT method.
    Put,
    /// DELETE method.
    Delete,
    /// PATCH method.
    Patch,
    /// OPTIONS method.
    Options,
    /// HEAD method.
    Head,
    /// TRACE method.
    Trace,
}

impl Method {
    /// Map a request-line method token onto the closed method set.
    ///
    /// The comparison is case-insensitive. Returns `None` for any token
    /// outside the set; the caller decides how to surface that.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "PATCH" => Some(Self::Patch),
            "OPTIONS" => Some(Self::Options),
            "HEAD" => Some(Self::Head),
            "TRACE" => Some(Self::Trace),
            _ => None,
        }
    }

    /// Return the canonical uppercase method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
            Self::Trace => "TRACE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP headers collection.
///
/// Lookup is case-insensitive (names are lowercased on insert). A duplicate
/// header name replaces the previously stored pair. Typed lookups treat a
/// missing or unparsable value as absent; they never fail.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    inner: HashMap<String, String>,
}

impl Headers {
    /// Create empty headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header. The name is lowercased for case-insensitive lookup.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner
            .insert(name.into().to_ascii_lowercase(), value.into());
    }

    /// Get a header value by name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Get a header value parsed as an unsigned integer.
    ///
    /// Returns `None` when the header is absent or its value does not parse.
    #[must_use]
    pub fn get_int(&self, name: &str) -> Option<usize> {
        self.get(name)?.trim().parse().ok()
    }

    /// Iterate over all headers as (name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns the number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

const UNKNOWN_PEER: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);
const DEFAULT_LOCAL: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);

/// A fully-parsed HTTP request.
///
/// Constructed by the parser via the `set_*` methods, then handed to the
/// caller as an effectively immutable value. Query and form parameters and
/// the file list are always present, defaulting to empty collections.
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    url: String,
    headers: Headers,
    query: Params,
    form: Params,
    files: Vec<UploadFile>,
    body: Vec<u8>,
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
}

impl Request {
    /// Create a new request with empty headers, parameters, and body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            method,
            url: path.clone(),
            path,
            headers: Headers::new(),
            query: Params::new(),
            form: Params::new(),
            files: Vec::new(),
            body: Vec::new(),
            local_addr: DEFAULT_LOCAL,
            remote_addr: UNKNOWN_PEER,
        }
    }

    /// Get the HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Get the request path (without query string).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the full URL: scheme, host, path, and query.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get mutable headers (used while assembling the request).
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Get the query parameters.
    #[must_use]
    pub fn query(&self) -> &Params {
        &self.query
    }

    /// Get the form parameters (urlencoded or multipart fields).
    #[must_use]
    pub fn form(&self) -> &Params {
        &self.form
    }

    /// Get the uploaded files.
    #[must_use]
    pub fn files(&self) -> &[UploadFile] {
        &self.files
    }

    /// Get the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Deserialize the raw body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// Get the local (server-side) endpoint of the connection.
    #[must_use]
    pub fn local_addr(&self) -> &SocketAddr {
        &self.local_addr
    }

    /// Get the remote (client-side) endpoint of the connection.
    #[must_use]
    pub fn remote_addr(&self) -> &SocketAddr {
        &self.remote_addr
    }

    /// Combined parameter lookup: query parameters first, then form.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query.get(key).or_else(|| self.form.get(key))
    }

    /// Set the full URL.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// Replace the header block wholesale.
    pub fn set_headers(&mut self, headers: Headers) {
        self.headers = headers;
    }

    /// Set the query parameters.
    pub fn set_query(&mut self, query: Params) {
        self.query = query;
    }

    /// Set the form parameters.
    pub fn set_form(&mut self, form: Params) {
        self.form = form;
    }

    /// Set the uploaded files.
    pub fn set_files(&mut self, files: Vec<UploadFile>) {
        self.files = files;
    }

    /// Set the raw body.
    pub fn set_body(&mut self, body: Vec<u8>) {
        self.body = body;
    }

    /// Set the connection endpoints.
    pub fn set_endpoints(&mut self, local: SocketAddr, remote: SocketAddr) {
        self.local_addr = local;
        self.remote_addr = remote;
    }
}

// Classification predicates
impl Request {
    /// Returns true if this request asks for a WebSocket upgrade
    /// (RFC 6455 §4.2.1 opening handshake).
    ///
    /// Requires: method GET, `Connection: Upgrade`, an `Upgrade` header,
    /// `Sec-WebSocket-Version: 13`, and a `Sec-WebSocket-Key` header.
    /// Value comparisons are case-insensitive.
    #[must_use]
    pub fn is_websocket_upgrade(&self) -> bool {
        self.method == Method::Get
            && self
                .headers
                .get("connection")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("upgrade"))
            && self.headers.get("upgrade").is_some()
            && self
                .headers
                .get("sec-websocket-version")
                .is_some_and(|v| v.trim() == "13")
            && self.headers.get("sec-websocket-key").is_some()
    }

    /// Returns true if this request was issued via `XMLHttpRequest`.
    ///
    /// Checks the combined query/form accessor and the raw header for the
    /// same key. A parameter literally named `X-Requested-With` therefore
    /// also triggers this.
    #[must_use]
    pub fn is_ajax(&self) -> bool {
        let is_xhr = |v: &str| v.trim().eq_ignore_ascii_case("XMLHttpRequest");
        self.param("X-Requested-With").is_some_and(is_xhr)
            || self.headers.get("x-requested-with").is_some_and(is_xhr)
    }

    /// Returns true if the client accepts a server-sent event stream.
    #[must_use]
    pub fn is_event_stream(&self) -> bool {
        self.headers
            .get("accept")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("text/event-stream"))
    }

    /// Returns true unless the client sent `Connection: close`.
    ///
    /// HTTP/1.1 defaults to persistent connections.
    #[must_use]
    pub fn is_keep_alive(&self) -> bool {
        !self
            .headers
            .get("connection")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("close"))
    }
}
