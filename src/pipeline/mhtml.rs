//! MHTML splitting: recover the page HTML and its stylesheets from an archive.
//!
//! A browser-saved `.mhtml` file is a `multipart/related` MIME message. The
//! top-level header declares a boundary token; every part after it carries a
//! small header block (`Content-Type`, `Content-Transfer-Encoding`,
//! `Content-Location`, …), a blank line, and an encoded body.
//!
//! Only two content types matter for re-rendering the DTR form:
//!
//! - `text/html` — the page itself. If a frame or iframe is also captured the
//!   archive holds several HTML parts; the last one wins.
//! - `text/css` — stylesheets, concatenated in archive order.
//!
//! Images and fonts are dropped: the renderer runs fully offline, so there is
//! nothing to resolve them against.

use crate::error::SignError;
use crate::pipeline::decode::{decode_body, TransferEncoding};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

static BOUNDARY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)boundary="?([^"\s]+)"?"#).expect("valid regex"));

static CONTENT_TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Content-Type:\s*([^\r\n;]+)").expect("valid regex"));

static TRANSFER_ENCODING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Content-Transfer-Encoding:\s*([^\r\n;]+)").expect("valid regex")
});

/// HTML and CSS recovered from an archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconstructedDocument {
    /// Decoded body of the last `text/html` part.
    pub html: String,
    /// Decoded `text/css` bodies in archive order, each followed by `\n`.
    pub css: String,
    /// `true` when no boundary was declared and `html` is the raw input.
    pub degraded: bool,
    pub html_parts: usize,
    pub css_parts: usize,
    /// Parts with another content type (images, fonts, …).
    pub ignored_parts: usize,
    /// Segments without a header/body separator.
    pub skipped_parts: usize,
}

impl ReconstructedDocument {
    fn degraded(raw: &str) -> Self {
        Self {
            html: raw.to_string(),
            degraded: true,
            ..Self::default()
        }
    }
}

/// A MIME part as seen by the splitter: borrowed header fields and body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Part<'a> {
    content_type: &'a str,
    encoding: Option<&'a str>,
    body: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartKind {
    Html,
    Css,
    Other,
}

impl Part<'_> {
    fn kind(&self) -> PartKind {
        let ct = self.content_type.to_ascii_lowercase();
        if ct.contains("text/html") {
            PartKind::Html
        } else if ct.contains("text/css") {
            PartKind::Css
        } else {
            PartKind::Other
        }
    }
}

/// Extract the boundary token declared in the archive header.
pub fn find_boundary(raw: &str) -> Option<&str> {
    BOUNDARY_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Transfer encoding of the part that contains byte `offset` of `raw`.
///
/// Looks back to the nearest boundary delimiter before `offset` and reads
/// that part's header block. Offsets in the top-level header, in a body-less
/// segment, or in an archive without a boundary report
/// [`TransferEncoding::Identity`].
pub fn transfer_encoding_at(raw: &str, offset: usize) -> TransferEncoding {
    let Some(boundary) = find_boundary(raw) else {
        return TransferEncoding::Identity;
    };
    let delimiter = format!("--{boundary}");
    let Some(part_start) = raw[..offset].rfind(delimiter.as_str()) else {
        return TransferEncoding::Identity;
    };
    match parse_part(&raw[part_start + delimiter.len()..offset]) {
        Some(part) => TransferEncoding::from_header(part.encoding),
        None => TransferEncoding::Identity,
    }
}

/// Split `raw` into its parts and rebuild the HTML document and stylesheet.
///
/// Structurally odd input never fails: segments without a header block are
/// skipped, unknown content types are ignored, and a missing boundary yields
/// the whole input as HTML. Only a kept part whose body cannot be decoded
/// aborts with [`SignError::Decode`].
pub fn split_archive(raw: &str) -> Result<ReconstructedDocument, SignError> {
    let Some(boundary) = find_boundary(raw) else {
        warn!("No MIME boundary declared; treating the whole input as HTML");
        return Ok(ReconstructedDocument::degraded(raw));
    };
    debug!("MIME boundary: {}", boundary);

    let delimiter = format!("--{boundary}");
    let mut doc = ReconstructedDocument::default();

    for segment in raw.split(delimiter.as_str()) {
        let trimmed = segment.trim();
        if trimmed.is_empty() || trimmed == "--" {
            continue;
        }

        let Some(part) = parse_part(segment) else {
            doc.skipped_parts += 1;
            continue;
        };

        match part.kind() {
            PartKind::Html => {
                doc.html = decode_body(part.body, TransferEncoding::from_header(part.encoding))?;
                doc.html_parts += 1;
            }
            PartKind::Css => {
                let css = decode_body(part.body, TransferEncoding::from_header(part.encoding))?;
                doc.css.push_str(&css);
                doc.css.push('\n');
                doc.css_parts += 1;
            }
            PartKind::Other => doc.ignored_parts += 1,
        }
    }

    info!(
        "Archive split: {} HTML, {} CSS, {} ignored, {} skipped parts",
        doc.html_parts, doc.css_parts, doc.ignored_parts, doc.skipped_parts
    );
    if doc.html_parts == 0 {
        warn!("Archive contains no text/html part; rendering an empty document");
    }

    Ok(doc)
}

/// Separate a segment into header fields and body.
///
/// The header block ends at the first CRLF CRLF; archives re-saved with Unix
/// line endings fall back to LF LF. Returns `None` when neither is present.
fn parse_part(segment: &str) -> Option<Part<'_>> {
    let (headers, body) = match segment.find("\r\n\r\n") {
        Some(idx) => (&segment[..idx], &segment[idx + 4..]),
        None => {
            let idx = segment.find("\n\n")?;
            (&segment[..idx], &segment[idx + 2..])
        }
    };

    Some(Part {
        content_type: header_value(&CONTENT_TYPE_RE, headers).unwrap_or(""),
        encoding: header_value(&TRANSFER_ENCODING_RE, headers),
        body,
    })
}

fn header_value<'a>(re: &Regex, headers: &'a str) -> Option<&'a str> {
    re.captures(headers)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive(parts: &[(&str, &str, &str)]) -> String {
        let mut s = String::from(
            "From: <Saved by Blink>\r\n\
             Subject: DTR\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/related;\r\n\
             \ttype=\"text/html\";\r\n\
             \tboundary=\"----MultipartBoundary--XYZ----\"\r\n\r\n",
        );
        for (ct, enc, body) in parts {
            s.push_str("------MultipartBoundary--XYZ----\r\n");
            s.push_str(&format!("Content-Type: {ct}\r\n"));
            if !enc.is_empty() {
                s.push_str(&format!("Content-Transfer-Encoding: {enc}\r\n"));
            }
            s.push_str("Content-Location: https://hris.example/dtr\r\n\r\n");
            s.push_str(body);
            s.push_str("\r\n");
        }
        s.push_str("------MultipartBoundary--XYZ------\r\n");
        s
    }

    #[test]
    fn boundary_with_and_without_quotes() {
        assert_eq!(find_boundary("boundary=\"abc\""), Some("abc"));
        assert_eq!(find_boundary("BOUNDARY=abc;"), Some("abc;"));
        assert_eq!(find_boundary("Boundary=abc\r\n"), Some("abc"));
        assert_eq!(find_boundary("<html></html>"), None);
    }

    #[test]
    fn no_boundary_falls_back_to_whole_input() {
        let raw = "<html><body>plain</body></html>";
        let doc = split_archive(raw).unwrap();
        assert_eq!(doc.html, raw);
        assert_eq!(doc.css, "");
        assert!(doc.degraded);
    }

    #[test]
    fn last_html_part_wins() {
        let raw = archive(&[
            ("text/html; charset=\"utf-8\"", "quoted-printable", "<p>first</p>"),
            ("text/html", "", "<p>second</p>"),
            ("image/png", "base64", "iVBORw0KGgo="),
        ]);
        let doc = split_archive(&raw).unwrap();
        assert_eq!(doc.html, "<p>second</p>\r\n");
        assert_eq!(doc.html_parts, 2);
        // The top-level multipart header counts as an ignored part too.
        assert_eq!(doc.ignored_parts, 2);
        assert!(!doc.degraded);
    }

    #[test]
    fn css_parts_concatenated_in_order() {
        let raw = archive(&[
            ("text/css", "", ".a{}"),
            ("text/html", "", "<p/>"),
            ("text/css", "base64", "LmJ7fQ=="),
        ]);
        let doc = split_archive(&raw).unwrap();
        assert_eq!(doc.css, ".a{}\r\n\n.b{}\n");
        assert_eq!(doc.css_parts, 2);
    }

    #[test]
    fn quoted_printable_html_is_decoded() {
        let raw = archive(&[(
            "text/html",
            "quoted-printable",
            "<td class=3D\"dtrtd1\">Signature of the=\r\n Head Officer</td>",
        )]);
        let doc = split_archive(&raw).unwrap();
        assert!(doc.html.contains("<td class=\"dtrtd1\">Signature of the Head Officer</td>"));
    }

    #[test]
    fn content_type_match_is_case_insensitive() {
        let raw = archive(&[("TEXT/HTML", "", "<p>upper</p>")]);
        assert_eq!(split_archive(&raw).unwrap().html, "<p>upper</p>\r\n");
    }

    #[test]
    fn segments_without_headers_are_skipped() {
        let raw = "Content-Type: multipart/related; boundary=B\r\n\r\n--B\r\nno header break here--B\r\nContent-Type: text/html\r\n\r\n<p>ok</p>\r\n--B--";
        let doc = split_archive(raw).unwrap();
        assert_eq!(doc.html, "<p>ok</p>\r\n");
        assert_eq!(doc.skipped_parts, 1);
    }

    #[test]
    fn unix_line_endings_are_accepted() {
        let raw = "Content-Type: multipart/related; boundary=\"B\"\n\n--B\nContent-Type: text/html\n\n<p>lf</p>\n--B--\n";
        assert_eq!(split_archive(raw).unwrap().html, "<p>lf</p>\n");
    }

    #[test]
    fn boundary_with_regex_metacharacters_splits_literally() {
        let raw = "Content-Type: multipart/related; boundary=\"a.b+c\"\r\n\r\n--a.b+c\r\nContent-Type: text/html\r\n\r\n<p>x</p>\r\n--a.b+c--";
        assert_eq!(split_archive(raw).unwrap().html, "<p>x</p>\r\n");
    }

    #[test]
    fn undecodable_html_fails() {
        let raw = archive(&[("text/html", "base64", "!!!not base64!!!")]);
        assert!(matches!(split_archive(&raw), Err(SignError::Decode { .. })));
    }

    #[test]
    fn archive_without_html_yields_empty_document() {
        let raw = archive(&[("image/png", "base64", "iVBORw0KGgo=")]);
        let doc = split_archive(&raw).unwrap();
        assert_eq!(doc.html, "");
        assert_eq!(doc.css, "");
        assert!(!doc.degraded);
    }

    #[test]
    fn encoding_lookup_follows_enclosing_part() {
        let raw = archive(&[
            ("text/css", "", ".a {}"),
            ("text/html", "quoted-printable", "<p>body</p>"),
        ]);
        let css_at = raw.find(".a {}").unwrap();
        let html_at = raw.find("<p>body").unwrap();
        assert_eq!(transfer_encoding_at(&raw, css_at), TransferEncoding::Identity);
        assert_eq!(
            transfer_encoding_at(&raw, html_at),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(transfer_encoding_at(&raw, 0), TransferEncoding::Identity);
        assert_eq!(
            transfer_encoding_at("<p>no archive</p>", 3),
            TransferEncoding::Identity
        );
    }
}
