//! Incremental HTTP/1.1 request parser.
//!
//! This crate turns the raw bytes of a live connection into
//! [`rivet_core::Request`] values. It is designed around a reusable
//! per-connection buffer:
//!
//! - Partial TCP reads surface as [`ParseStatus::Incomplete`] with the
//!   buffer left untouched — never as errors
//! - Pipelined requests share one buffer; each parse consumes exactly its
//!   own bytes and leaves the next request at offset 0
//! - Request bodies are classified by `Content-Type` into opaque,
//!   urlencoded-form, or multipart-form handling
//!
//! # Example
//!
//! ```
//! use rivet_http::{ConnContext, ConnectionBuffer, ParseStatus, RequestParser};
//!
//! let mut buffer = ConnectionBuffer::new();
//! buffer.append(b"GET /items?page=2 HTTP/1.1\r\nHost: example.com\r\n\r\n");
//!
//! let parser = RequestParser::new();
//! match parser.try_parse(&mut buffer, &ConnContext::default()) {
//!     Ok(ParseStatus::Complete { request, .. }) => {
//!         assert_eq!(request.path(), "/items");
//!         assert_eq!(request.query().get("page"), Some("2"));
//!     }
//!     Ok(ParseStatus::Incomplete) => { /* wait for more bytes */ }
//!     Err(_) => { /* protocol violation */ }
//! }
//! ```

#![forbid(unsafe_code)]

pub mod body;
mod buffer;
mod context;
mod parser;

pub use body::{BodyKind, classify, decode};
pub use buffer::ConnectionBuffer;
pub use context::ConnContext;
pub use parser::{ParseError, ParseLimits, ParseStatus, RequestParser, find_header_end};
