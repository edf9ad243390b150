//! Multipart form data scanning.
//!
//! Splits a `multipart/form-data` body into its parts by scanning for the
//! `\r\n--<boundary>` delimiter, classifying each part as a plain form
//! field or a file upload from its `Content-Disposition` header.
//!
//! The scanner is deliberately tolerant: a body that ends mid-part is
//! truncated at the last complete part rather than rejected, and a part
//! without a `name` parameter is skipped. Scanning never backtracks, so a
//! pass is bounded by the body length.

use std::fmt;

use memchr::memmem;

/// Length of the `--\r\n` suffix that closes the final boundary.
const CLOSING_SUFFIX_LEN: usize = 4;

/// Extract the boundary token from a `multipart/form-data` Content-Type.
///
/// Content-Type format: `multipart/form-data; boundary=----WebKitFormBoundary...`
/// The media type comparison is case-insensitive and the boundary value may
/// be quoted. Returns `None` for other media types or a missing/empty
/// boundary parameter.
#[must_use]
pub fn parse_boundary(content_type: &str) -> Option<String> {
    let content_type = content_type.trim();
    let main = content_type.split(';').next().unwrap_or("").trim();
    if !main.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }

    for param in content_type.split(';').skip(1) {
        let Some((key, value)) = param.trim().split_once('=') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("boundary") {
            let boundary = value.trim().trim_matches('"').trim_matches('\'');
            if boundary.is_empty() {
                return None;
            }
            return Some(boundary.to_string());
        }
    }

    None
}

/// A single scanned multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Field name from Content-Disposition.
    pub name: String,
    /// Filename from Content-Disposition (if present).
    pub filename: Option<String>,
    /// Content-Type of the part (if present).
    pub content_type: Option<String>,
    /// The part's raw content.
    pub data: Vec<u8>,
}

impl Part {
    /// Returns true if this part is a file upload.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// Returns true if this part is a regular form field.
    #[must_use]
    pub fn is_field(&self) -> bool {
        self.filename.is_none()
    }

    /// Get the content as a UTF-8 string (for form fields).
    ///
    /// Returns `None` if the content is not valid UTF-8.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

/// An uploaded file extracted from a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// The form field name.
    pub name: String,
    /// The original filename.
    pub filename: String,
    /// Content-Type of the file.
    pub content_type: String,
    /// The raw file payload.
    pub data: Vec<u8>,
}

impl UploadFile {
    /// Create an upload from a part.
    ///
    /// Returns `None` if the part is not a file. A part without a
    /// Content-Type falls back to `application/octet-stream`.
    #[must_use]
    pub fn from_part(part: Part) -> Option<Self> {
        let Part {
            name,
            filename,
            content_type,
            data,
        } = part;
        let filename = filename?;
        Some(Self {
            name,
            filename,
            content_type: content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
            data,
        })
    }

    /// Get the file size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Get the file extension from the filename.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.filename
            .rsplit('.')
            .next()
            .filter(|ext| !ext.is_empty() && *ext != self.filename)
    }
}

impl fmt::Display for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {} bytes)",
            self.filename,
            self.content_type,
            self.data.len()
        )
    }
}

/// Scan a multipart body into its parts.
///
/// The delimiter used while scanning is `\r\n--<boundary>`. The body opens
/// with the first delimiter line (which has no preceding CRLF), so the scan
/// position starts immediately after that opening `--<boundary>`; what
/// follows is the first part's header block.
///
/// Trailing garbage after the last complete part is dropped, not rejected:
/// a missing part-header terminator or missing next delimiter simply ends
/// the scan with the parts collected so far.
#[must_use]
pub fn scan_parts(body: &[u8], boundary: &str) -> Vec<Part> {
    let mut marker = Vec::with_capacity(boundary.len() + 4);
    marker.extend_from_slice(b"\r\n--");
    marker.extend_from_slice(boundary.as_bytes());

    // The opening delimiter line carries no leading CRLF.
    let delimiter = &marker[2..];
    let Some(first) = memmem::find(body, delimiter) else {
        return Vec::new();
    };

    let mut parts = Vec::new();
    let mut pos = first + delimiter.len();

    // Anything at or past the closing `--\r\n` suffix is the terminator.
    while pos < body.len().saturating_sub(CLOSING_SUFFIX_LEN) {
        let Some(header_len) = memmem::find(&body[pos..], b"\r\n\r\n") else {
            break;
        };
        let header_block = &body[pos..pos + header_len];
        let data_start = pos + header_len + 4;

        let Some(data_len) = memmem::find(&body[data_start..], &marker) else {
            break;
        };
        let data = &body[data_start..data_start + data_len];

        if let Some((name, filename, content_type)) = parse_part_headers(header_block) {
            parts.push(Part {
                name,
                filename,
                content_type,
                data: data.to_vec(),
            });
        }

        pos = data_start + data_len + marker.len();
    }

    parts
}

/// Parse a part's header block into (name, filename, content-type).
///
/// Returns `None` when the block has no usable `Content-Disposition`.
fn parse_part_headers(block: &[u8]) -> Option<(String, Option<String>, Option<String>)> {
    let text = String::from_utf8_lossy(block);
    let mut disposition = None;
    let mut content_type = None;

    for line in text.split("\r\n").filter(|l| !l.is_empty()) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();
        if name == "content-disposition" {
            disposition = Some(value.to_string());
        } else if name == "content-type" {
            content_type = Some(value.to_string());
        }
    }

    let (name, filename) = parse_content_disposition(&disposition?)?;
    Some((name, filename, content_type))
}

/// Parse a Content-Disposition header value.
///
/// Format: `form-data; name="field"; filename="file.txt"`. The `filename`
/// parameter is optional; its presence marks the part as a file. Returns
/// `None` when the `name` parameter is missing.
fn parse_content_disposition(value: &str) -> Option<(String, Option<String>)> {
    let mut name = None;
    let mut filename = None;

    for param in value.split(';') {
        let param = param.trim();
        if param.eq_ignore_ascii_case("form-data") {
            continue;
        }

        if let Some((key, raw_value)) = param.split_once('=') {
            let key = key.trim();
            let value = raw_value.trim();
            if key.eq_ignore_ascii_case("name") {
                name = Some(unquote(value));
            } else if key.eq_ignore_ascii_case("filename") {
                filename = Some(unquote(value));
            }
        }
    }

    Some((name?, filename))
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}
