//! Input loading: read an archive from disk for the `sign` command.
//!
//! Uploads arrive as bytes and skip this stage. Files are checked for
//! existence, read permission and the size cap *before* being read, so a
//! mistyped path to a multi-gigabyte file fails fast instead of filling
//! memory.

use crate::error::SignError;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// An archive loaded into memory.
#[derive(Debug, Clone)]
pub struct LoadedArchive {
    pub path: PathBuf,
    /// Archive text (invalid UTF-8 sequences replaced).
    pub text: String,
}

impl LoadedArchive {
    /// File name component, used to derive the output name.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.mhtml".to_string())
    }
}

/// Convert uploaded or read bytes to archive text.
///
/// MHTML headers are ASCII and bodies are transfer-encoded, so lossy UTF-8
/// conversion only affects archives that are already damaged.
pub fn archive_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// `true` when the text looks like a MIME archive rather than bare HTML.
pub fn looks_like_mhtml(text: &str) -> bool {
    let head: String = text.chars().take(4096).collect::<String>().to_ascii_lowercase();
    head.contains("mime-version:") || head.contains("multipart/related")
}

/// Read the archive at `path`, refusing files larger than `max_bytes`.
pub async fn load_archive(path: impl AsRef<Path>, max_bytes: usize) -> Result<LoadedArchive, SignError> {
    let path = path.as_ref().to_path_buf();

    let meta = match tokio::fs::metadata(&path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(SignError::PermissionDenied { path });
        }
        Err(_) => return Err(SignError::FileNotFound { path }),
    };
    if !meta.is_file() {
        return Err(SignError::FileNotFound { path });
    }
    if meta.len() > max_bytes as u64 {
        return Err(SignError::ArchiveTooLarge {
            path,
            size: meta.len(),
            limit: max_bytes,
        });
    }

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(SignError::PermissionDenied { path });
        }
        Err(_) => return Err(SignError::FileNotFound { path }),
    };

    let text = archive_text(&bytes);
    if !looks_like_mhtml(&text) {
        warn!(
            "{} has no MIME header; it will be rendered as plain HTML",
            path.display()
        );
    }
    info!("Loaded archive: {} ({} bytes)", path.display(), bytes.len());
    debug!("Archive text length: {} chars", text.len());

    Ok(LoadedArchive { path, text })
}
