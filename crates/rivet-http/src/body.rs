//! Request body classification and decoding.
//!
//! The `Content-Type` header selects one of three body treatments: opaque
//! (the default), urlencoded form, or multipart form. Decoding always
//! yields both a form collection and a file list; branches that do not
//! apply leave them empty. The raw body bytes are retained verbatim either
//! way.

use rivet_core::{Params, UploadFile, parse_boundary, percent_decode, scan_parts};

/// How a request body should be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyKind {
    /// No form decoding; the body is kept as opaque bytes.
    Opaque,
    /// `application/x-www-form-urlencoded`.
    UrlEncoded,
    /// `multipart/form-data` with the extracted boundary token.
    Multipart(String),
}

/// Classify a body by its `Content-Type` header value.
///
/// The media type (the segment before any `;`) is compared
/// case-insensitively. A `multipart/form-data` value without a usable
/// boundary parameter is treated as opaque rather than rejected.
#[must_use]
pub fn classify(content_type: Option<&str>) -> BodyKind {
    let Some(content_type) = content_type else {
        return BodyKind::Opaque;
    };

    let media_type = content_type.split(';').next().unwrap_or("").trim();
    if media_type.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
        return BodyKind::UrlEncoded;
    }

    match parse_boundary(content_type) {
        Some(boundary) => BodyKind::Multipart(boundary),
        None => BodyKind::Opaque,
    }
}

/// Decode a body into form parameters and uploaded files.
///
/// A multipart body shorter than its boundary string cannot contain a
/// single delimiter and decodes to empty collections, not an error.
#[must_use]
pub fn decode(body: &[u8], kind: &BodyKind) -> (Params, Vec<UploadFile>) {
    let mut form = Params::new();
    let mut files = Vec::new();

    match kind {
        BodyKind::Opaque => {}
        BodyKind::UrlEncoded => {
            form = Params::parse_urlencoded(&String::from_utf8_lossy(body));
        }
        BodyKind::Multipart(boundary) => {
            if body.len() >= boundary.len() {
                for part in scan_parts(body, boundary) {
                    if part.is_file() {
                        if let Some(file) = UploadFile::from_part(part) {
                            files.push(file);
                        }
                    } else {
                        let text = String::from_utf8_lossy(&part.data).into_owned();
                        let value = percent_decode(&text).into_owned();
                        form.push(part.name, value);
                    }
                }
            }
        }
    }

    (form, files)
}
