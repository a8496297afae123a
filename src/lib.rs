//! # dtr-signatory
//!
//! Write a Head Officer's name into a Daily Time Record (DTR) web archive
//! and print the result to PDF.
//!
//! DTR forms are exported from the attendance system as MHTML: one MIME
//! document holding the page HTML, its stylesheets and images, each part
//! quoted-printable or base64 encoded. The signature line is an empty
//! `<span>&nbsp;</span>` shortly before the "Signature of the Head Officer"
//! label. This crate fills that span, rebuilds a single HTML document from
//! the archive and prints it through headless Chromium with network access
//! cut off.
//!
//! ## Pipeline Overview
//!
//! ```text
//! MHTML archive
//!  │
//!  ├─ 1. Inject  replace the placeholder span(s) with the signatory name
//!  ├─ 2. Split   keep text/html + text/css parts, decode QP / base64
//!  ├─ 3. Style   inject DTR print overrides before </head>
//!  └─ 4. Render  headless Chromium → A4 landscape PDF (offline, timed)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dtr_signatory::{sign_file, SignConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Chromium located from CHROME_PATH, PATH or the Puppeteer cache
//!     let config = SignConfig::default();
//!     let (pdf_path, stats) = sign_file("DTR-March.mhtml", None, Some("J. DOE"), &config).await?;
//!     eprintln!("{} placeholder(s) signed → {}", stats.replacements, pdf_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | [`server`] module: axum router for `POST /api/inject-signatory` |
//! | `cli`    | on      | Enables the `dtr-sign` binary (clap + anyhow + tracing-subscriber); implies `server` |
//!
//! Disable both when using only the library:
//! ```toml
//! dtr-signatory = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
#[cfg(feature = "server")]
pub mod server;
pub mod sign;
pub mod styles;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageLayout, PaperSize, ServerConfig, SignConfig, SignConfigBuilder, DEFAULT_SIGNATORY};
pub use error::SignError;
pub use output::{SignStats, SignedPdf};
pub use pipeline::inject::inject_signatory;
pub use pipeline::mhtml::{split_archive, ReconstructedDocument};
pub use pipeline::render::{ChromeEngine, RenderEngine};
pub use sign::{sign_archive, sign_archive_sync, sign_file, signed_file_name};
