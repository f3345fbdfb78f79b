//! Byte-level `multipart/form-data` scanner.
//!
//! Only one named file field is ever extracted from a body. The payload is
//! returned exactly as it appears on the wire: no transfer decoding is done.

use thiserror::Error;

const DISPOSITION_MARKER: &[u8] = b"Content-Disposition: form-data";
const HEADER_SEPARATOR: &[u8] = b"\r\n\r\n";
const CRLF: &[u8] = b"\r\n";
const FILENAME_MARKER: &str = "filename=";

/// A single file field extracted from a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub field_name: String,
    pub original_filename: String,
    pub raw_bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Content-Type debe ser multipart/form-data")]
    NotMultipart,

    #[error("Falta boundary en Content-Type")]
    MissingBoundary,

    #[error("No se encontró el archivo \"{0}\" en la petición")]
    FieldNotFound(String),

    #[error("Parte multipart mal formada en el campo \"{0}\"")]
    MalformedPart(String),
}

/// Extracts the boundary token from a `Content-Type` header value.
pub fn extract_boundary(content_type: &str) -> Result<String, ParseError> {
    let mut params = content_type.split(';').map(str::trim);

    let essence = params.next().unwrap_or_default();
    if !essence.eq_ignore_ascii_case("multipart/form-data") {
        return Err(ParseError::NotMultipart);
    }

    let boundary = params
        .find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("boundary")
                .then(|| value.trim().trim_matches('"'))
        })
        .unwrap_or_default();

    if boundary.is_empty() {
        return Err(ParseError::MissingBoundary);
    }

    Ok(boundary.to_string())
}

/// Returns the first part named `field_name` that carries a filename.
///
/// Parts are the chunks between occurrences of `--<boundary>`. The payload
/// starts right after the first `\r\n\r\n` of the part and ends at its last
/// `\r\n`. Later parts with the same field name are ignored, unless the
/// earlier ones have no payload window.
pub fn parse(body: &[u8], boundary: &str, field_name: &str) -> Result<UploadedFile, ParseError> {
    if boundary.is_empty() {
        return Err(ParseError::MissingBoundary);
    }

    let delimiter = [b"--".as_slice(), boundary.as_bytes()].concat();
    let name_marker = format!("name=\"{}\"", field_name);
    let mut malformed = false;

    for part in split_on(body, &delimiter) {
        let separator = find(part, HEADER_SEPARATOR);
        let headers = separator.map_or(part, |idx| &part[..idx]);

        if find(headers, DISPOSITION_MARKER).is_none()
            || !has_name_param(headers, name_marker.as_bytes())
        {
            continue;
        }

        // A matching part without a filename is a plain form field.
        let Some(original_filename) = filename_in(headers) else {
            continue;
        };

        // A candidate without a payload window gives way to later ones.
        let Some(separator) = separator else {
            malformed = true;
            continue;
        };

        let start = separator + HEADER_SEPARATOR.len();
        let end = rfind(part, CRLF).unwrap_or(0);
        if end < start {
            malformed = true;
            continue;
        }

        return Ok(UploadedFile {
            field_name: field_name.to_string(),
            original_filename,
            raw_bytes: part[start..end].to_vec(),
        });
    }

    if malformed {
        return Err(ParseError::MalformedPart(field_name.to_string()));
    }
    Err(ParseError::FieldNotFound(field_name.to_string()))
}

/// `name="x"` must stand as its own parameter, not as the tail of
/// `filename="x"`.
fn has_name_param(headers: &[u8], marker: &[u8]) -> bool {
    let mut offset = 0;
    while let Some(idx) = find(&headers[offset..], marker) {
        let absolute = offset + idx;
        let standalone = absolute == 0 || {
            let prev = headers[absolute - 1];
            !(prev.is_ascii_alphanumeric() || prev == b'_' || prev == b'*')
        };
        if standalone {
            return true;
        }
        offset = absolute + 1;
    }
    false
}

fn filename_in(headers: &[u8]) -> Option<String> {
    let line = split_on(headers, CRLF)
        .map(String::from_utf8_lossy)
        .find(|line| line.contains(FILENAME_MARKER))?;

    let (_, raw) = line.split_once(FILENAME_MARKER)?;
    let raw = raw.trim_start();

    let value = match raw.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let inner = &raw[1..];
            inner.find(quote).map_or(inner, |end| &inner[..end])
        }
        _ => raw.split(';').next().unwrap_or_default().trim(),
    };

    let value = value.trim_matches(|c| c == '"' || c == '\'');
    (!value.is_empty()).then(|| value.to_string())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}

fn split_on<'a>(haystack: &'a [u8], delimiter: &'a [u8]) -> impl Iterator<Item = &'a [u8]> + 'a {
    let mut rest = Some(haystack);
    std::iter::from_fn(move || {
        let current = rest?;
        match find(current, delimiter) {
            Some(idx) => {
                rest = Some(&current[idx + delimiter.len()..]);
                Some(&current[..idx])
            }
            None => {
                rest = None;
                Some(current)
            }
        }
    })
}
