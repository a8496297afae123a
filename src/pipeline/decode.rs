//! Transfer decoding of a single MIME part body.
//!
//! Only the two encodings browsers emit when saving MHTML are handled:
//! `quoted-printable` for text parts and `base64` for everything else.
//! Any other declared encoding (`7bit`, `8bit`, `binary`, or none at all)
//! means the body is already plain text.

use crate::error::SignError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Declared `Content-Transfer-Encoding` of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    QuotedPrintable,
    Base64,
    /// Absent, `7bit`, `8bit`, `binary` or anything unrecognised.
    Identity,
}

impl TransferEncoding {
    /// Classify a raw header value (case-insensitive, surrounding whitespace ignored).
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("quoted-printable") => TransferEncoding::QuotedPrintable,
            Some("base64") => TransferEncoding::Base64,
            _ => TransferEncoding::Identity,
        }
    }
}

/// Decode `body` according to `encoding`.
pub fn decode_body(body: &str, encoding: TransferEncoding) -> Result<String, SignError> {
    match encoding {
        TransferEncoding::QuotedPrintable => decode_quoted_printable(body),
        TransferEncoding::Base64 => decode_base64(body),
        TransferEncoding::Identity => Ok(body.to_string()),
    }
}

/// Decode a quoted-printable body.
///
/// Soft line breaks (`=` directly before CRLF or LF) are removed, and each
/// `=XX` escape becomes the byte `0xXX`. The collected bytes are read back as
/// UTF-8, so multi-byte characters escaped byte-by-byte come out whole.
/// A trailing `=` at the very end of the body is treated as a soft break.
pub fn decode_quoted_printable(body: &str) -> Result<String, SignError> {
    let bytes = body.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b != b'=' {
            out.push(b);
            i += 1;
            continue;
        }

        match &bytes[i + 1..] {
            [] => i += 1,
            [b'\r', b'\n', ..] => i += 3,
            [b'\n', ..] => i += 2,
            [hi, lo, ..] if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                out.push(hex_value(*hi) << 4 | hex_value(*lo));
                i += 3;
            }
            rest => {
                let shown: String = String::from_utf8_lossy(&rest[..rest.len().min(2)]).into();
                return Err(SignError::Decode {
                    encoding: "quoted-printable",
                    detail: format!("invalid escape '={shown}' at byte {i}"),
                });
            }
        }
    }

    debug!("Decoded quoted-printable: {} → {} bytes", bytes.len(), out.len());
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Decode a base64 body.
///
/// MHTML wraps base64 at 76 columns, so all ASCII whitespace is removed
/// before decoding, not only the leading and trailing run.
pub fn decode_base64(body: &str) -> Result<String, SignError> {
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| SignError::Decode {
            encoding: "base64",
            detail: e.to_string(),
        })?;

    debug!("Decoded base64: {} → {} bytes", compact.len(), bytes.len());
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn hex_value(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}
