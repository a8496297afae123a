//! # chrome-auto
//!
//! Locate a Chrome / Chromium executable at runtime, so that users of
//! `chromiumoxide` do not need to hard-code a browser path per machine.
//!
//! ## How it works
//!
//! [`locate_chrome`] walks a fixed chain of sources and returns the first
//! existing file:
//!
//! 1. The explicit path passed by the caller (a configured override).
//! 2. `CHROME_PATH`, then `PUPPETEER_EXECUTABLE_PATH`.
//! 3. Well-known executable names on `PATH` (`chromium`, `google-chrome`, …).
//! 4. Well-known install locations for the current platform.
//! 5. The Puppeteer download cache (`~/.cache/puppeteer/chrome/<version>/…`),
//!    newest version first, so a machine that once ran `npx puppeteer
//!    browsers install chrome` works out of the box.
//!
//! Auto-detected results (no explicit path) are memoised for the lifetime of
//! the process.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chrome_auto::locate_chrome;
//!
//! let chrome = locate_chrome(None).expect("no browser installed");
//! println!("using {}", chrome.display());
//! ```
//!
//! ## Environment variable overrides
//!
//! - `CHROME_PATH` — path to a browser executable.
//! - `PUPPETEER_EXECUTABLE_PATH` — same, kept for deployments that already
//!   set it for a Node service.
//! - `PUPPETEER_CACHE_DIR` — override the Puppeteer cache root.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variables consulted, in order, before any filesystem search.
pub const ENV_OVERRIDES: [&str; 2] = ["CHROME_PATH", "PUPPETEER_EXECUTABLE_PATH"];

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by chrome-auto operations.
#[derive(Error, Debug)]
pub enum LocateError {
    /// The current OS/architecture combination has no known browser layout.
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// The caller asked for a specific executable that does not exist.
    #[error("Browser executable '{path}' does not exist")]
    ExplicitPathMissing { path: PathBuf },

    /// Every source in the chain was tried without success.
    #[error("No Chrome/Chromium executable found ({} locations searched)", .searched.len())]
    NotFound { searched: Vec<PathBuf> },
}

// ── Internal: platform metadata ──────────────────────────────────────────────

struct PlatformInfo {
    /// Executable names looked up on `PATH`.
    path_names: &'static [&'static str],
    /// Absolute install locations, most common first.
    install_paths: &'static [&'static str],
    /// Binary location inside a Puppeteer `chrome/<version>/` directory.
    puppeteer_binary: &'static str,
}

fn detect_platform() -> Result<PlatformInfo, LocateError> {
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;

    match (os, arch) {
        ("linux", "x86_64") | ("linux", "aarch64") => Ok(PlatformInfo {
            path_names: &[
                "chromium",
                "chromium-browser",
                "google-chrome",
                "google-chrome-stable",
                "chrome",
            ],
            install_paths: &[
                "/usr/bin/chromium",
                "/usr/bin/chromium-browser",
                "/usr/bin/google-chrome",
                "/usr/bin/google-chrome-stable",
                "/snap/bin/chromium",
                "/opt/google/chrome/chrome",
            ],
            puppeteer_binary: "chrome-linux64/chrome",
        }),
        ("macos", "aarch64") => Ok(PlatformInfo {
            path_names: &["chromium", "google-chrome"],
            install_paths: &[
                "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                "/Applications/Chromium.app/Contents/MacOS/Chromium",
            ],
            puppeteer_binary: "chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
        }),
        ("macos", "x86_64") => Ok(PlatformInfo {
            path_names: &["chromium", "google-chrome"],
            install_paths: &[
                "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                "/Applications/Chromium.app/Contents/MacOS/Chromium",
            ],
            puppeteer_binary: "chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
        }),
        ("windows", "x86_64") | ("windows", "aarch64") | ("windows", "x86") => Ok(PlatformInfo {
            path_names: &["chrome.exe"],
            install_paths: &[
                r"C:\Program Files\Google\Chrome\Application\chrome.exe",
                r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            ],
            puppeteer_binary: r"chrome-win64\chrome.exe",
        }),
        (os, arch) => Err(LocateError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        }),
    }
}

// ── Cache directory resolution ───────────────────────────────────────────────

/// Returns the root of the Puppeteer browser cache.
///
/// Default: `~/.cache/puppeteer/` on every platform (Puppeteer does not use
/// the OS cache directory). Override by setting `PUPPETEER_CACHE_DIR`.
pub fn puppeteer_cache_dir() -> PathBuf {
    cache_dir_from(&env_lookup)
}

fn cache_dir_from(env: &dyn Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(override_dir) = env("PUPPETEER_CACHE_DIR") {
        return PathBuf::from(override_dir);
    }

    dirs::home_dir()
        .map(|h| h.join(".cache"))
        .or_else(dirs::cache_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("puppeteer")
}

// ── Thread-safe singleton path cache ─────────────────────────────────────────

static DETECTED_PATH: OnceLock<PathBuf> = OnceLock::new();

// ── Public API ───────────────────────────────────────────────────────────────

/// Resolve the browser executable to launch.
///
/// `explicit` takes precedence over every other source and must exist;
/// a missing explicit path is an error rather than a silent fallback, since
/// it almost always means a deployment typo.
pub fn locate_chrome(explicit: Option<&Path>) -> Result<PathBuf, LocateError> {
    if let Some(path) = explicit {
        return if is_executable_file(path) {
            Ok(path.to_path_buf())
        } else {
            Err(LocateError::ExplicitPathMissing {
                path: path.to_path_buf(),
            })
        };
    }

    // Fast path: already resolved in this process.
    if let Some(path) = DETECTED_PATH.get() {
        return Ok(path.clone());
    }

    let info = detect_platform()?;
    let path_var = std::env::var_os("PATH");
    let path_dirs: Vec<PathBuf> = path_var
        .as_deref()
        .map(|p| std::env::split_paths(p).collect())
        .unwrap_or_default();

    let path = search(&info, &env_lookup, &path_dirs, &puppeteer_cache_dir())?;

    // Best-effort cache in the OnceLock (ignore race; both will succeed).
    let _ = DETECTED_PATH.set(path.clone());

    Ok(path)
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

fn search(
    info: &PlatformInfo,
    env: &dyn Fn(&str) -> Option<String>,
    path_dirs: &[PathBuf],
    cache_dir: &Path,
) -> Result<PathBuf, LocateError> {
    let mut searched = Vec::new();

    // 1. Environment variable overrides.
    for var in ENV_OVERRIDES {
        if let Some(value) = env(var) {
            let p = PathBuf::from(value);
            if is_executable_file(&p) {
                return Ok(p);
            }
            // Fall through: env var set but file missing → keep searching.
            searched.push(p);
        }
    }

    // 2. Executable names on PATH.
    for name in info.path_names {
        for dir in path_dirs {
            let p = dir.join(name);
            if is_executable_file(&p) {
                return Ok(p);
            }
        }
    }

    // 3. Well-known install locations.
    for loc in info.install_paths {
        let p = PathBuf::from(loc);
        if is_executable_file(&p) {
            return Ok(p);
        }
        searched.push(p);
    }

    // 4. Puppeteer cache, newest version directory first.
    let chrome_root = cache_dir.join("chrome");
    if let Ok(entries) = std::fs::read_dir(&chrome_root) {
        let mut versions: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        versions.sort_by_cached_key(|p| (version_key(p), p.clone()));

        for version_dir in versions.iter().rev() {
            let p = version_dir.join(info.puppeteer_binary);
            if is_executable_file(&p) {
                return Ok(p);
            }
            searched.push(p);
        }
    } else {
        searched.push(chrome_root);
    }

    Err(LocateError::NotFound { searched })
}

/// Numeric segments of a cache directory name, e.g. `linux-131.0.6778.85`
/// → `[131, 0, 6778, 85]`, so versions order numerically rather than as text.
fn version_key(dir: &Path) -> Vec<u64> {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
