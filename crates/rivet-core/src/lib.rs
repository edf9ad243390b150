//! Core request types for the rivet web toolkit.
//!
//! This crate provides the value types the wire-level parser assembles and
//! the routing layer consumes:
//! - [`Request`], [`Method`], and [`Headers`]
//! - [`Params`] for query and form parameters
//! - Multipart form scanning ([`scan_parts`], [`Part`], [`UploadFile`])
//!
//! # Design Principles
//!
//! - Requests are assembled once and read-only afterwards
//! - Lookups never fail: absent or unparsable values are simply absent
//! - Malformed trailing multipart data is truncated, not rejected

#![forbid(unsafe_code)]

pub mod multipart;
mod params;
mod request;

pub use multipart::{Part, UploadFile, parse_boundary, scan_parts};
pub use params::{Params, percent_decode};
pub use request::{Headers, Method, Request};
