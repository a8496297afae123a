//! PDF rendering: styled HTML → PDF bytes through a headless browser.
//!
//! ## Why a trait?
//!
//! The browser is an external capability. [`RenderEngine`] is the contract
//! the pipeline relies on: given finished HTML and a [`PageLayout`], return
//! PDF bytes within a time bound, without touching the network. The shipped
//! implementation, [`ChromeEngine`], drives Chromium over the DevTools
//! protocol; tests and embedders can plug in their own through
//! [`crate::config::SignConfig::engine`].
//!
//! ## Why one browser per call?
//!
//! A browser shared across requests would share cookies, cache and crash
//! fate. Launching per call costs a few hundred milliseconds, which is small
//! next to printing a two-copy DTR page, and guarantees nothing leaks from
//! one signatory's document into another's.
//!
//! ## Offline rendering
//!
//! Archived pages still reference the HR portal's images, fonts and
//! tracking scripts by absolute URL. The engine enables request interception
//! for `http://*` and `https://*` and fails every paused request, so the
//! render neither leaks data nor waits on unreachable hosts. `data:`,
//! `about:` and `file:` resources are not intercepted.

use crate::config::{PageLayout, SignConfig};
use crate::error::SignError;
use crate::styles::{build_style_block, inject_style_block};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::ErrorReason;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::Page;
use futures::future::BoxFuture;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// URL patterns whose requests are failed before leaving the browser.
pub const BLOCKED_URL_PATTERNS: [&str; 2] = ["http://*", "https://*"];

/// Extra Chromium switches for running inside containers and CI.
const LAUNCH_ARGS: [&str; 7] = [
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-software-rasterizer",
    "--no-first-run",
    "--no-zygote",
    "--disable-extensions",
];

/// Grace period for shutting the browser down after a render.
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Headless HTML-to-PDF capability.
///
/// Implementations must:
/// - use a fresh, isolated rendering context per call,
/// - refuse every `http://` / `https://` fetch,
/// - bound page loading and PDF generation by `timeout` each,
///   returning [`SignError::RenderTimeout`] when exceeded,
/// - release every process or context they started, on success and failure.
pub trait RenderEngine: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Load `html` and print it with `layout`.
    fn print_to_pdf<'a>(
        &'a self,
        html: &'a str,
        layout: &'a PageLayout,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Vec<u8>, SignError>>;
}

/// Apply the DTR print stylesheet and the archive CSS to `html`.
pub fn prepare_document(html: &str, css: &str) -> String {
    let block = build_style_block(css);
    inject_style_block(html, &block)
}

/// Render a reconstructed document to PDF bytes.
///
/// Uses `config.engine` when set, otherwise launches Chromium from
/// `config.chrome_executable` (or wherever [`chrome_auto`] finds it).
pub async fn render_pdf(html: &str, css: &str, config: &SignConfig) -> Result<Vec<u8>, SignError> {
    let styled = prepare_document(html, css);
    let engine = resolve_engine(config)?;
    let timeout = Duration::from_secs(config.render_timeout_secs);

    debug!(
        "Rendering {} bytes of styled HTML with engine '{}'",
        styled.len(),
        engine.name()
    );
    let pdf = engine.print_to_pdf(&styled, &config.layout, timeout).await?;

    if !pdf.starts_with(b"%PDF") {
        let head: Vec<u8> = pdf.iter().take(4).copied().collect();
        return Err(SignError::RenderFailed(format!(
            "engine '{}' returned {} bytes that are not a PDF (first bytes: {:?})",
            engine.name(),
            pdf.len(),
            head
        )));
    }

    Ok(pdf)
}

fn resolve_engine(config: &SignConfig) -> Result<Arc<dyn RenderEngine>, SignError> {
    if let Some(ref engine) = config.engine {
        return Ok(Arc::clone(engine));
    }
    let engine = ChromeEngine::locate(config.chrome_executable.as_deref())?;
    Ok(Arc::new(engine))
}

// ── Chromium engine ──────────────────────────────────────────────────────

/// [`RenderEngine`] backed by a headless Chromium launched per call.
#[derive(Debug, Clone)]
pub struct ChromeEngine {
    executable: PathBuf,
    /// Pass `--no-sandbox`. Default: true; containers rarely allow the
    /// setuid sandbox.
    no_sandbox: bool,
}

impl ChromeEngine {
    /// Use the browser at `executable` as-is.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            no_sandbox: true,
        }
    }

    /// Find a browser via [`chrome_auto::locate_chrome`], honouring an
    /// explicit override first.
    pub fn locate(explicit: Option<&Path>) -> Result<Self, SignError> {
        let executable = chrome_auto::locate_chrome(explicit)?;
        info!("Using browser: {}", executable.display());
        Ok(Self::new(executable))
    }

    pub fn with_sandbox(mut self, enabled: bool) -> Self {
        self.no_sandbox = !enabled;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    async fn render(
        &self,
        html: &str,
        layout: &PageLayout,
        timeout: Duration,
    ) -> Result<Vec<u8>, SignError> {
        let start = Instant::now();

        // A private profile keeps concurrent browsers from contending for
        // the same singleton lock. Removed when `profile` drops.
        let profile = tempfile::Builder::new()
            .prefix("dtr-signatory-")
            .tempdir()
            .map_err(|e| SignError::Internal(format!("browser profile dir: {e}")))?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&self.executable)
            .user_data_dir(profile.path())
            .args(LAUNCH_ARGS);
        if self.no_sandbox {
            builder = builder.no_sandbox();
        }
        let browser_config = builder.build().map_err(|detail| SignError::BrowserLaunch {
            executable: self.executable.clone(),
            detail,
        })?;

        let (mut browser, mut handler) =
            tokio::time::timeout(timeout, Browser::launch(browser_config))
                .await
                .map_err(|_| SignError::RenderTimeout {
                    stage: "launching the browser",
                    secs: timeout.as_secs(),
                })?
                .map_err(|e| SignError::BrowserLaunch {
                    executable: self.executable.clone(),
                    detail: e.to_string(),
                })?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler event error: {}", e);
                }
            }
        });

        let result = print_page(&browser, html, layout, timeout).await;

        // ── Teardown: always, whatever `result` is ──────────────────────
        match tokio::time::timeout(TEARDOWN_TIMEOUT, browser.close()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                warn!("Browser close failed ({}); killing the process", e);
                let _ = browser.kill().await;
            }
            Err(_) => {
                warn!("Browser close timed out; killing the process");
                let _ = browser.kill().await;
            }
        }
        if let Err(e) = browser.wait().await {
            warn!("Waiting for browser exit failed: {}", e);
        }
        handler_task.abort();
        drop(profile);

        match &result {
            Ok(pdf) => info!(
                "Rendered PDF: {} bytes in {}ms",
                pdf.len(),
                start.elapsed().as_millis()
            ),
            Err(e) => warn!("Render failed after {}ms: {}", start.elapsed().as_millis(), e),
        }
        result
    }
}

impl RenderEngine for ChromeEngine {
    fn name(&self) -> &str {
        "chromium"
    }

    fn print_to_pdf<'a>(
        &'a self,
        html: &'a str,
        layout: &'a PageLayout,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Vec<u8>, SignError>> {
        Box::pin(self.render(html, layout, timeout))
    }
}

/// Open a page, block network fetches, load `html` and print it.
async fn print_page(
    browser: &Browser,
    html: &str,
    layout: &PageLayout,
    timeout: Duration,
) -> Result<Vec<u8>, SignError> {
    let secs = timeout.as_secs();
    let page = browser.new_page("about:blank").await.map_err(render_fault)?;

    let interceptor = block_network(&page).await?;

    let loaded = tokio::time::timeout(timeout, page.set_content(html))
        .await
        .map_err(|_| SignError::RenderTimeout {
            stage: "loading the page",
            secs,
        })
        .and_then(|r| r.map(|_| ()).map_err(render_fault));

    let printed = match loaded {
        Ok(()) => tokio::time::timeout(timeout, page.pdf(print_params(layout)))
            .await
            .map_err(|_| SignError::RenderTimeout {
                stage: "printing to PDF",
                secs,
            })
            .and_then(|r| r.map_err(render_fault)),
        Err(e) => Err(e),
    };

    interceptor.abort();
    printed
}

/// Intercept every http(s) request on `page` and fail it.
///
/// The listener is registered before interception is enabled so no paused
/// request can slip by unanswered.
async fn block_network(page: &Page) -> Result<tokio::task::JoinHandle<()>, SignError> {
    let mut paused = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(render_fault)?;

    let responder = page.clone();
    let task = tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            debug!("Blocked network request: {}", event.request.url);
            let fail = FailRequestParams::new(event.request_id.clone(), ErrorReason::BlockedByClient);
            if let Err(e) = responder.execute(fail).await {
                warn!("Failed to abort request {}: {}", event.request.url, e);
            }
        }
    });

    let mut enable = EnableParams::builder();
    for pattern in BLOCKED_URL_PATTERNS {
        enable = enable.pattern(RequestPattern::builder().url_pattern(pattern).build());
    }
    page.execute(enable.build()).await.map_err(render_fault)?;

    Ok(task)
}

fn print_params(layout: &PageLayout) -> PrintToPdfParams {
    let (width, height) = layout.paper.dimensions_in();
    let margin = layout.margin_in();
    PrintToPdfParams::builder()
        .landscape(layout.landscape)
        .print_background(layout.print_background)
        .paper_width(width)
        .paper_height(height)
        .margin_top(margin)
        .margin_bottom(margin)
        .margin_left(margin)
        .margin_right(margin)
        .build()
}

fn render_fault(e: chromiumoxide::error::CdpError) -> SignError {
    SignError::RenderFailed(e.to_string())
}
