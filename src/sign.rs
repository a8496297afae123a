//! Signing entry points: inject → split → render.
//!
//! [`sign_archive`] is the whole pipeline over in-memory text and is what
//! the HTTP service calls. [`sign_file`] adds disk I/O around it for the CLI.
//! Stages run strictly in sequence with no retries; the first error is
//! returned as-is.

use crate::config::SignConfig;
use crate::error::SignError;
use crate::output::{SignStats, SignedPdf};
use crate::pipeline::inject::SignatoryInjector;
use crate::pipeline::{input, mhtml, render};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

static ARCHIVE_EXTENSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.mhtml?$").expect("valid regex"));

/// Sign an archive held in memory and render it to PDF.
///
/// `signatory` is inserted verbatim; callers holding optional user input
/// should pass it through [`SignConfig::signatory_or_default`] first.
///
/// # Errors
/// - [`SignError::Decode`] when a kept part has a corrupt body
/// - rendering errors ([`SignError::is_render_error`]) from the engine
pub async fn sign_archive(
    raw: &str,
    signatory: &str,
    config: &SignConfig,
) -> Result<SignedPdf, SignError> {
    let total_start = Instant::now();
    info!(
        "Signing archive ({} bytes) for signatory '{}'",
        raw.len(),
        signatory
    );

    // ── Step 1: Inject signatory into the raw archive ───────────────────
    let parse_start = Instant::now();
    let injector = if config.placeholder_window == SignatoryInjector::default_window().window() {
        SignatoryInjector::default_window().clone()
    } else {
        SignatoryInjector::with_window(config.placeholder_window)
    };
    let injection = injector.inject(raw, signatory);

    // ── Step 2: Recover HTML and CSS ────────────────────────────────────
    let doc = mhtml::split_archive(&injection.text)?;
    let parse_duration_ms = parse_start.elapsed().as_millis() as u64;
    debug!(
        "Reconstructed document: {} bytes HTML, {} bytes CSS",
        doc.html.len(),
        doc.css.len()
    );

    // ── Step 3: Render ──────────────────────────────────────────────────
    let render_start = Instant::now();
    let pdf = render::render_pdf(&doc.html, &doc.css, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    let stats = SignStats {
        signatory: signatory.to_string(),
        replacements: injection.replacements,
        degraded: doc.degraded,
        html_parts: doc.html_parts,
        css_parts: doc.css_parts,
        ignored_parts: doc.ignored_parts,
        skipped_parts: doc.skipped_parts,
        archive_bytes: raw.len(),
        html_bytes: doc.html.len(),
        css_bytes: doc.css.len(),
        pdf_bytes: pdf.len(),
        parse_duration_ms,
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Signing complete: {} placeholder(s), {} byte PDF, {}ms total",
        stats.replacements, stats.pdf_bytes, stats.total_duration_ms
    );

    Ok(SignedPdf { pdf, stats })
}

/// Sign the archive at `input_path` and write the PDF next to it, or to
/// `output_path` when given.
///
/// The name is resolved with [`SignConfig::signatory_or_default`]. Uses an
/// atomic write (temp file in the target directory + rename) so a failed
/// run never leaves a truncated PDF behind.
pub async fn sign_file(
    input_path: impl AsRef<Path>,
    output_path: Option<&Path>,
    signatory: Option<&str>,
    config: &SignConfig,
) -> Result<(PathBuf, SignStats), SignError> {
    let archive = input::load_archive(input_path, config.max_archive_bytes).await?;
    let name = config.signatory_or_default(signatory);

    let out_path = match output_path {
        Some(p) => p.to_path_buf(),
        None => archive.path.with_file_name(signed_file_name(&archive.file_name())),
    };

    let signed = sign_archive(&archive.text, &name, config).await?;
    write_atomic(&out_path, &signed.pdf)?;
    info!("Wrote {}", out_path.display());

    Ok((out_path, signed.stats))
}

/// Synchronous wrapper around [`sign_archive`].
///
/// Creates a temporary tokio runtime internally.
pub fn sign_archive_sync(
    raw: &str,
    signatory: &str,
    config: &SignConfig,
) -> Result<SignedPdf, SignError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SignError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(sign_archive(raw, signatory, config))
}

/// Download name for a signed archive: a trailing `.mht` / `.mhtml`
/// (any case) is dropped and `_signed.pdf` appended.
///
/// ```
/// use dtr_signatory::signed_file_name;
///
/// assert_eq!(signed_file_name("DTR-March.mhtml"), "DTR-March_signed.pdf");
/// assert_eq!(signed_file_name("dtr.MHT"), "dtr_signed.pdf");
/// assert_eq!(signed_file_name("dtr.html"), "dtr.html_signed.pdf");
/// ```
pub fn signed_file_name(original: &str) -> String {
    let stem = ARCHIVE_EXTENSION_RE.replace(original, "");
    format!("{stem}_signed.pdf")
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SignError> {
    let write_err = |source: std::io::Error| SignError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
