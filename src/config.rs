//! Configuration types for signing and rendering.
//!
//! All pipeline behaviour is controlled through [`SignConfig`], built via its
//! [`SignConfigBuilder`]. The same value is handed to the HTTP handler and to
//! the injector, so the fallback signatory lives in exactly one place.
//!
//! The HTTP listener has its own small [`ServerConfig`]; both are filled from
//! the environment by the `dtr-sign` binary, never from a config file.

use crate::error::SignError;
use crate::pipeline::inject::MAX_PLACEHOLDER_WINDOW;
use crate::pipeline::render::RenderEngine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

/// Name injected when the caller supplies no signatory (or only whitespace).
pub const DEFAULT_SIGNATORY: &str = "ENGR. GEORGE P. TARDIO";

/// Maximum distance, in characters, between the `&nbsp;` placeholder span
/// and the "Signature of the Head Officer" label.
pub const DEFAULT_PLACEHOLDER_WINDOW: usize = 300;

/// Bound applied separately to page loading and to PDF generation.
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 120;

/// Upload / input file cap: 50 MiB.
pub const DEFAULT_MAX_ARCHIVE_BYTES: usize = 50 * 1024 * 1024;

/// Configuration for a signing run.
///
/// Built via [`SignConfig::builder()`] or using [`SignConfig::default()`].
///
/// # Example
/// ```rust
/// use dtr_signatory::SignConfig;
///
/// let config = SignConfig::builder()
///     .default_signatory("DR. JANE SANTOS")
///     .render_timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.signatory_or_default(Some("  ")), "DR. JANE SANTOS");
/// ```
#[derive(Clone)]
pub struct SignConfig {
    /// Signatory used when a request carries no name. Default: [`DEFAULT_SIGNATORY`].
    pub default_signatory: String,

    /// Lookahead bound between the placeholder and its label. Default: 300.
    ///
    /// Wide enough to span the markup between the blank span and the label
    /// in real DTR exports, narrow enough not to reach the next form field.
    pub placeholder_window: usize,

    /// Per-stage rendering timeout in seconds. Default: 120.
    pub render_timeout_secs: u64,

    /// Browser executable. If None, located by [`chrome_auto::locate_chrome`].
    pub chrome_executable: Option<PathBuf>,

    /// Page geometry of the produced PDF. Default: A4 landscape, 5 mm margins.
    pub layout: PageLayout,

    /// Largest archive accepted from disk or over HTTP. Default: 50 MiB.
    pub max_archive_bytes: usize,

    /// Pre-constructed rendering engine. Takes precedence over `chrome_executable`.
    pub engine: Option<Arc<dyn RenderEngine>>,
}

impl Default for SignConfig {
    fn default() -> Self {
        Self {
            default_signatory: DEFAULT_SIGNATORY.to_string(),
            placeholder_window: DEFAULT_PLACEHOLDER_WINDOW,
            render_timeout_secs: DEFAULT_RENDER_TIMEOUT_SECS,
            chrome_executable: None,
            layout: PageLayout::default(),
            max_archive_bytes: DEFAULT_MAX_ARCHIVE_BYTES,
            engine: None,
        }
    }
}

impl fmt::Debug for SignConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignConfig")
            .field("default_signatory", &self.default_signatory)
            .field("placeholder_window", &self.placeholder_window)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("chrome_executable", &self.chrome_executable)
            .field("layout", &self.layout)
            .field("max_archive_bytes", &self.max_archive_bytes)
            .field("engine", &self.engine.as_ref().map(|_| "<dyn RenderEngine>"))
            .finish()
    }
}

impl SignConfig {
    /// Create a new builder for `SignConfig`.
    pub fn builder() -> SignConfigBuilder {
        SignConfigBuilder {
            config: Self::default(),
        }
    }

    /// Trim the requested name, falling back to [`Self::default_signatory`]
    /// when it is absent or blank.
    pub fn signatory_or_default(&self, requested: Option<&str>) -> String {
        match requested.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.default_signatory.clone(),
        }
    }
}

/// Builder for [`SignConfig`].
#[derive(Debug)]
pub struct SignConfigBuilder {
    config: SignConfig,
}

impl SignConfigBuilder {
    pub fn default_signatory(mut self, name: impl Into<String>) -> Self {
        self.config.default_signatory = name.into().trim().to_string();
        self
    }

    pub fn placeholder_window(mut self, chars: usize) -> Self {
        self.config.placeholder_window = chars.clamp(1, MAX_PLACEHOLDER_WINDOW);
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs.max(1);
        self
    }

    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_executable = Some(path.into());
        self
    }

    pub fn layout(mut self, layout: PageLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn max_archive_bytes(mut self, bytes: usize) -> Self {
        self.config.max_archive_bytes = bytes;
        self
    }

    pub fn engine(mut self, engine: Arc<dyn RenderEngine>) -> Self {
        self.config.engine = Some(engine);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SignConfig, SignError> {
        let c = &self.config;
        if c.default_signatory.is_empty() {
            return Err(SignError::InvalidConfig(
                "Default signatory must not be empty".into(),
            ));
        }
        if c.max_archive_bytes == 0 {
            return Err(SignError::InvalidConfig(
                "Archive size limit must be ≥ 1 byte".into(),
            ));
        }
        if !(c.layout.margin_mm >= 0.0) {
            return Err(SignError::InvalidConfig(format!(
                "Margin must be a non-negative length, got {}mm",
                c.layout.margin_mm
            )));
        }
        Ok(self.config)
    }
}

// ── Page layout ──────────────────────────────────────────────────────────

const MM_PER_INCH: f64 = 25.4;

/// Paper sizes the renderer knows how to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    /// 210 × 297 mm (default).
    #[default]
    A4,
    /// 8.5 × 11 in.
    Letter,
    /// 8.5 × 14 in.
    Legal,
}

impl PaperSize {
    /// Portrait `(width, height)` in inches, the unit the DevTools protocol
    /// expects.
    pub fn dimensions_in(&self) -> (f64, f64) {
        match self {
            PaperSize::A4 => (210.0 / MM_PER_INCH, 297.0 / MM_PER_INCH),
            PaperSize::Letter => (8.5, 11.0),
            PaperSize::Legal => (8.5, 14.0),
        }
    }
}

/// Geometry of the printed PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub paper: PaperSize,
    /// Default: true. DTR forms are two side-by-side copies.
    pub landscape: bool,
    /// Default: true, so table shading survives printing.
    pub print_background: bool,
    /// Uniform margin on all four sides. Default: 5 mm.
    pub margin_mm: f64,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            paper: PaperSize::A4,
            landscape: true,
            print_background: true,
            margin_mm: 5.0,
        }
    }
}

impl PageLayout {
    /// Margin converted to inches.
    pub fn margin_in(&self) -> f64 {
        self.margin_mm / MM_PER_INCH
    }
}

// ── HTTP listener ────────────────────────────────────────────────────────

/// Where the HTTP service listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: IpAddr,
    /// Default: 3001.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3001,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
