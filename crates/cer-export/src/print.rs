//! Paginated capture of print HTML through a headless browser.
//!
//! The browser is a scoped resource: each call writes the page into a
//! fresh temporary directory, runs one browser process to completion and
//! removes the directory again, whether or not the capture succeeded.

use std::env;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tempfile::TempDir;

/// Default time given to the page to finish in-page rendering.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(7000);

/// Executable names tried, in order, when no browser is configured.
const BROWSER_CANDIDATES: [&str; 5] = [
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

/// Absolute install locations checked after `PATH`.
const BROWSER_LOCATIONS: [&str; 2] = [
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

/// Error from the printing surface.
#[derive(Debug, thiserror::Error)]
pub enum PrintError {
    #[error("no Chromium-based browser found (set [print] browser in cer.toml)")]
    BrowserNotFound,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("browser exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("browser did not produce {}", .0.display())]
    MissingOutput(PathBuf),
}

/// Lays out a complete HTML page and captures it as a PDF file.
pub trait PrintSurface {
    fn print_to_pdf(&self, html: &str, output: &Path) -> Result<(), PrintError>;
}

/// [`PrintSurface`] driving a headless Chromium-based browser.
#[derive(Clone, Debug)]
pub struct ChromiumSurface {
    browser: PathBuf,
    settle: Duration,
}

impl ChromiumSurface {
    /// Use the browser executable at `browser`.
    pub fn new(browser: impl Into<PathBuf>) -> Self {
        Self {
            browser: browser.into(),
            settle: DEFAULT_SETTLE,
        }
    }

    /// Find a browser on `PATH` or in the usual install locations.
    pub fn detect() -> Result<Self, PrintError> {
        let path = env::var_os("PATH").unwrap_or_default();
        find_browser(&path).map(Self::new).ok_or(PrintError::BrowserNotFound)
    }

    /// Set how long the page may keep rendering before capture.
    #[must_use]
    pub fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Browser executable in use.
    pub fn browser(&self) -> &Path {
        &self.browser
    }

    fn args(&self, page: &Path, output: &Path) -> Vec<OsString> {
        let mut print_to = OsString::from("--print-to-pdf=");
        print_to.push(output);
        let mut url = OsString::from("file://");
        url.push(page);

        vec![
            "--headless".into(),
            "--disable-gpu".into(),
            "--no-sandbox".into(),
            "--no-pdf-header-footer".into(),
            "--allow-file-access-from-files".into(),
            format!("--virtual-time-budget={}", self.settle.as_millis()).into(),
            print_to,
            url,
        ]
    }
}

/// [`PrintSurface`] that looks for a browser only when a PDF is printed.
///
/// Exports that never reach the PDF sink never need a browser installed.
#[derive(Clone, Debug)]
pub struct DetectingSurface {
    settle: Duration,
}

impl Default for DetectingSurface {
    fn default() -> Self {
        Self {
            settle: DEFAULT_SETTLE,
        }
    }
}

impl DetectingSurface {
    /// Set how long the page may keep rendering before capture.
    #[must_use]
    pub fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

impl PrintSurface for DetectingSurface {
    fn print_to_pdf(&self, html: &str, output: &Path) -> Result<(), PrintError> {
        ChromiumSurface::detect()?
            .settle(self.settle)
            .print_to_pdf(html, output)
    }
}

impl PrintSurface for ChromiumSurface {
    fn print_to_pdf(&self, html: &str, output: &Path) -> Result<(), PrintError> {
        let workdir = TempDir::new()?;
        let page = workdir.path().join("document.html");
        fs::write(&page, html)?;

        let output = std::path::absolute(output)?;
        if output.exists() {
            fs::remove_file(&output)?;
        }

        tracing::info!(
            browser = %self.browser.display(),
            settle_ms = self.settle.as_millis(),
            "Printing to PDF"
        );
        let result = Command::new(&self.browser)
            .args(self.args(&page, &output))
            .output()?;

        if !result.status.success() {
            return Err(PrintError::Failed {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_owned(),
            });
        }
        if !output.exists() {
            return Err(PrintError::MissingOutput(output));
        }
        Ok(())
    }
}

/// Look up the first known browser in `path`, then in fixed locations.
fn find_browser(path: &OsStr) -> Option<PathBuf> {
    let dirs: Vec<PathBuf> = env::split_paths(path).collect();
    BROWSER_CANDIDATES
        .iter()
        .flat_map(|name| dirs.iter().map(move |dir| dir.join(name)))
        .chain(BROWSER_LOCATIONS.iter().map(PathBuf::from))
        .find(|candidate| candidate.is_file())
}
