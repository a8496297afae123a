//! Result types of a signing run.

use serde::{Deserialize, Serialize};

/// A rendered, signed PDF plus what it took to produce it.
#[derive(Debug, Clone)]
pub struct SignedPdf {
    /// Complete PDF file, starting with `%PDF`.
    pub pdf: Vec<u8>,
    pub stats: SignStats,
}

impl SignedPdf {
    pub fn into_bytes(self) -> Vec<u8> {
        self.pdf
    }
}

/// Per-run statistics, logged by the service and printed by `dtr-sign --json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignStats {
    /// Signatory actually injected (after trimming / default fallback).
    pub signatory: String,
    /// Placeholders rewritten; 0 means the PDF carries no name.
    pub replacements: usize,
    /// The archive had no boundary and was rendered as raw HTML.
    pub degraded: bool,
    pub html_parts: usize,
    pub css_parts: usize,
    pub ignored_parts: usize,
    pub skipped_parts: usize,
    pub archive_bytes: usize,
    pub html_bytes: usize,
    pub css_bytes: usize,
    pub pdf_bytes: usize,
    pub parse_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}
