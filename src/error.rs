//! Error types for the dtr-signatory library.
//!
//! Every failure that aborts a signing run is a [`SignError`]. The pipeline
//! never recovers locally: the orchestrator returns the first stage error
//! untouched and the HTTP layer maps it to a `500` with its `Display` text.
//!
//! A missing archive boundary is not an error: the splitter degrades to
//! "whole input is HTML" and flags the result instead
//! (see [`crate::pipeline::mhtml::ReconstructedDocument::degraded`]).

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the dtr-signatory library.
#[derive(Debug, Error)]
pub enum SignError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Archive file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The archive is larger than the configured upload cap.
    #[error("Archive '{path}' is {size} bytes, above the {limit}-byte limit")]
    ArchiveTooLarge {
        path: PathBuf,
        size: u64,
        limit: usize,
    },

    // ── Decoding errors ───────────────────────────────────────────────────
    /// A kept MIME part body could not be decoded with its declared
    /// transfer encoding.
    #[error("Failed to decode {encoding} part: {detail}")]
    Decode {
        encoding: &'static str,
        detail: String,
    },

    // ── Rendering errors ──────────────────────────────────────────────────
    /// No browser executable could be found to render with.
    #[error(
        "No headless browser available: {0}\n\n\
Install Chromium or Google Chrome, or point CHROME_PATH (or\n\
PUPPETEER_EXECUTABLE_PATH) at an existing browser executable.\n"
    )]
    BrowserNotFound(String),

    /// The browser process could not be started or connected to.
    #[error("Failed to launch headless browser '{executable}': {detail}")]
    BrowserLaunch { executable: PathBuf, detail: String },

    /// A rendering stage exceeded the configured bound.
    #[error("Rendering timed out after {secs}s while {stage}")]
    RenderTimeout { stage: &'static str, secs: u64 },

    /// The browser reported a fault while loading or printing the page.
    #[error("Rendering failed: {0}")]
    RenderFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SignError {
    /// `true` for errors caused by the rendering engine rather than the
    /// uploaded archive.
    pub fn is_render_error(&self) -> bool {
        matches!(
            self,
            SignError::BrowserNotFound(_)
                | SignError::BrowserLaunch { .. }
                | SignError::RenderTimeout { .. }
                | SignError::RenderFailed(_)
        )
    }
}

impl From<chrome_auto::LocateError> for SignError {
    fn from(e: chrome_auto::LocateError) -> Self {
        SignError::BrowserNotFound(e.to_string())
    }
}
