//! CLI binary for dtr-signatory.
//!
//! `dtr-sign serve` runs the HTTP service; `dtr-sign sign` signs one archive
//! on disk. Both map flags and environment variables onto `SignConfig`.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dtr_signatory::server;
use dtr_signatory::{sign_file, ChromeEngine, ServerConfig, SignConfig, SignStats};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service on port 3001
  dtr-sign serve

  # Custom port and browser
  PORT=8080 CHROME_PATH=/usr/bin/chromium dtr-sign serve

  # Sign one archive (writes DTR-March_signed.pdf next to it)
  dtr-sign sign DTR-March.mhtml --signatory "J. DOE"

  # Explicit output, statistics as JSON
  dtr-sign sign DTR-March.mhtml -o signed.pdf --json

HTTP API:
  GET  /health                 {"status":"ok"}
  POST /api/inject-signatory   multipart: file (required), signatoryName (optional)
                               → application/pdf attachment <name>_signed.pdf

ENVIRONMENT VARIABLES:
  PORT                       Listen port for `serve` (default 3001)
  CHROME_PATH                Chromium/Chrome executable
  PUPPETEER_EXECUTABLE_PATH  Alternative to CHROME_PATH
  PUPPETEER_CACHE_DIR        Puppeteer browser cache searched for a Chrome build
  DTR_DEFAULT_SIGNATORY      Name used when none is given
  DTR_MAX_UPLOAD_MB          Largest accepted archive in MiB (default 50)
  DTR_RENDER_TIMEOUT         Per-stage rendering timeout in seconds (default 120)
  DTR_CHROME_SANDBOX         Keep Chromium's sandbox enabled
  RUST_LOG                   tracing filter, overrides -v / -q
"#;

/// Inject the Head Officer signatory into DTR archives and print them to PDF.
#[derive(Parser, Debug)]
#[command(
    name = "dtr-sign",
    version,
    about = "Inject the Head Officer signatory into DTR MHTML archives and render them to PDF",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DTR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DTR_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Sign a single archive on disk.
    Sign(SignArgs),
}

/// Settings shared by both commands.
#[derive(Args, Debug)]
struct EngineArgs {
    /// Chromium/Chrome executable. Located automatically if not set.
    #[arg(long, env = "CHROME_PATH")]
    chrome: Option<PathBuf>,

    /// Signatory used when a request carries no name.
    #[arg(long, env = "DTR_DEFAULT_SIGNATORY")]
    default_signatory: Option<String>,

    /// Largest accepted archive, in MiB.
    #[arg(long, env = "DTR_MAX_UPLOAD_MB", default_value_t = 50,
          value_parser = clap::value_parser!(u64).range(1..=1024))]
    max_upload_mb: u64,

    /// Per-stage rendering timeout in seconds.
    #[arg(long, env = "DTR_RENDER_TIMEOUT", default_value_t = 120)]
    render_timeout: u64,

    /// Keep Chromium's sandbox on (needs a user namespace or setuid helper).
    #[arg(long, env = "DTR_CHROME_SANDBOX")]
    chrome_sandbox: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Listen port.
    #[arg(short, long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// Listen address.
    #[arg(long, env = "DTR_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args, Debug)]
struct SignArgs {
    /// MHTML archive to sign.
    input: PathBuf,

    /// Write the PDF here instead of `<input>_signed.pdf`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Name written on the signature line.
    #[arg(short, long)]
    signatory: Option<String>,

    /// Print run statistics as JSON on stdout.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    engine: EngineArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers progress for `sign`; keep library logs quiet there
    // unless asked for.
    let interactive_sign = matches!(&cli.command, Command::Sign(args) if !args.json);
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || interactive_sign {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => run_serve(args).await,
        Command::Sign(args) => run_sign(args, cli.quiet).await,
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = build_config(&args.engine)?;
    let listen = ServerConfig {
        host: args.host,
        port: args.port,
    };
    server::serve(&listen, Arc::new(config))
        .await
        .with_context(|| format!("Server on {} failed", listen.socket_addr()))
}

async fn run_sign(args: SignArgs, quiet: bool) -> Result<()> {
    let config = build_config(&args.engine)?;

    let spinner = if !quiet && !args.json {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Signing");
        bar.set_message(args.input.display().to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    let result = sign_file(
        &args.input,
        args.output.as_deref(),
        args.signatory.as_deref(),
        &config,
    )
    .await;

    if let Some(ref bar) = spinner {
        bar.finish_and_clear();
    }
    let (out_path, stats) =
        result.with_context(|| format!("Failed to sign {}", args.input.display()))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialise statistics")?
        );
    } else if !quiet {
        print_summary(&stats, &out_path);
    }
    Ok(())
}

fn print_summary(stats: &SignStats, out_path: &std::path::Path) {
    let mark = if stats.replacements > 0 {
        green("✔")
    } else {
        cyan("⚠")
    };
    eprintln!(
        "{}  {} placeholder(s) signed as {}  →  {}",
        mark,
        stats.replacements,
        bold(&stats.signatory),
        bold(&out_path.display().to_string()),
    );
    eprintln!(
        "   {}  {}",
        dim(&format!(
            "{} HTML / {} CSS part(s), {} KiB PDF",
            stats.html_parts,
            stats.css_parts,
            stats.pdf_bytes / 1024
        )),
        dim(&format!("{}ms", stats.total_duration_ms)),
    );
    if stats.degraded {
        eprintln!(
            "   {}",
            cyan("archive had no MIME boundary; rendered as plain HTML")
        );
    }
}

/// Map CLI args to `SignConfig`.
///
/// The browser is resolved once here so a missing executable is reported at
/// startup; every render still launches its own process from that path.
fn build_config(args: &EngineArgs) -> Result<SignConfig> {
    let mut builder = SignConfig::builder()
        .render_timeout_secs(args.render_timeout)
        .max_archive_bytes((args.max_upload_mb as usize).saturating_mul(1024 * 1024));
    if let Some(ref name) = args.default_signatory {
        builder = builder.default_signatory(name.as_str());
    }
    if let Some(ref chrome) = args.chrome {
        builder = builder.chrome_executable(chrome.clone());
    }

    match ChromeEngine::locate(args.chrome.as_deref()) {
        Ok(engine) => {
            let engine = engine.with_sandbox(args.chrome_sandbox);
            tracing::debug!(
                "Rendering with {} (sandbox {})",
                engine.executable().display(),
                if args.chrome_sandbox { "on" } else { "off" }
            );
            builder = builder.engine(Arc::new(engine));
        }
        Err(e) => tracing::warn!("{e}"),
    }
    builder.build().context("Invalid configuration")
}
