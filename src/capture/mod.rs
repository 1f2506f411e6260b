//! Screenshot capture of rendered preview pages.
//!
//! # Flow
//!
//! ```text
//! PreviewSet ──► plan_captures() ──► requests for missing images
//!                                        │
//!            open browser once ◄─────────┘   (skipped when nothing is missing)
//!                   │
//!                   ▼
//!   for each request: navigate → settle → locate → rasterize → write png
//!                   │
//!                   ▼
//!            browser dropped (also on failure)
//! ```
//!
//! The image root in the source tree is the cache: an existing file is never
//! captured again.

#[cfg(feature = "cdp")]
mod chrome;

#[cfg(feature = "cdp")]
pub use chrome::ChromeBrowser;

use crate::{
    config::SiteConfig,
    log,
    preview::PreviewSet,
    utils::log::ProgressBars,
};
use anyhow::{Result, anyhow};
use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};
use thiserror::Error;

/// Bounding box of an element, in css pixels relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Browser automation capability.
pub trait Browser {
    /// Load `url` and wait for navigation to finish.
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Wait for asynchronous resources such as web fonts. Best effort.
    fn settle(&mut self, delay: Duration) -> Result<()> {
        thread::sleep(delay);
        Ok(())
    }

    /// Bounding box of the first element matching `selector`.
    fn locate(&mut self, selector: &str) -> Result<Option<Region>>;

    /// PNG bytes of `region`.
    fn rasterize(&mut self, region: &Region) -> Result<Vec<u8>>;
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("failed to load `{url}`: {reason}")]
    Navigation { url: String, reason: String },

    #[error("selector `{selector}` not found on `{url}`")]
    SelectorNotFound { selector: String, url: String },

    #[error("failed to rasterize `{selector}` on `{url}`: {reason}")]
    Rasterize {
        selector: String,
        url: String,
        reason: String,
    },

    #[error("empty screenshot of `{url}`")]
    EmptyImage { url: String },

    #[error("failed to write `{0}`")]
    Write(PathBuf, #[source] io::Error),

    #[error("screenshot capture requires the `cdp` feature")]
    Unsupported,
}

/// One screenshot to take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub url: String,
    pub selector: String,
    pub destination: PathBuf,
}

/// Capture `request.selector` on `request.url` into `request.destination`.
///
/// Writes exactly one file and performs no existence check.
pub fn capture(browser: &mut dyn Browser, request: &CaptureRequest, settle: Duration) -> Result<(), CaptureError> {
    let CaptureRequest { url, selector, destination } = request;
    let navigation = |e: anyhow::Error| CaptureError::Navigation {
        url: url.clone(),
        reason: format!("{e:#}"),
    };
    let rasterize = |e: anyhow::Error| CaptureError::Rasterize {
        selector: selector.clone(),
        url: url.clone(),
        reason: format!("{e:#}"),
    };

    browser.navigate(url).map_err(navigation)?;
    browser.settle(settle).map_err(navigation)?;

    let region = browser
        .locate(selector)
        .map_err(rasterize)?
        .filter(|region| !region.is_empty())
        .ok_or_else(|| CaptureError::SelectorNotFound {
            selector: selector.clone(),
            url: url.clone(),
        })?;

    let png = browser.rasterize(&region).map_err(rasterize)?;
    if png.is_empty() {
        return Err(CaptureError::EmptyImage { url: url.clone() });
    }

    write_image(destination, &png)
}

fn write_image(path: &Path, png: &[u8]) -> Result<(), CaptureError> {
    let write_err = |e| CaptureError::Write(path.to_path_buf(), e);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, png).map_err(write_err)
}

// ============================================================================
// Capture Phase
// ============================================================================

/// Missing images of a preview set, plus what was skipped.
#[derive(Debug, Default)]
pub struct CapturePlan {
    pub requests: Vec<CaptureRequest>,
    pub cached: usize,
    pub custom: usize,
}

/// Outcome of a capture phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureReport {
    pub captured: usize,
    pub cached: usize,
    pub custom: usize,
}

impl fmt::Display for CaptureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} captured, {} cached, {} with custom image",
            self.captured, self.cached, self.custom
        )
    }
}

/// Requests for every preview page whose image does not exist yet.
pub fn plan_captures(set: &PreviewSet, config: &SiteConfig) -> Result<CapturePlan> {
    let image_root = config.image_root_dir();
    let mut plan = CapturePlan::default();

    for page in set.iter() {
        if page.custom_image {
            plan.custom += 1;
            continue;
        }
        let destination = page.image_file(&image_root);
        if destination.exists() {
            plan.cached += 1;
            continue;
        }
        let url = page
            .file_url
            .clone()
            .ok_or_else(|| anyhow!("Preview page `{}` was never rendered", page.title))?;

        plan.requests.push(CaptureRequest {
            url,
            selector: config.preview.selector.clone(),
            destination,
        });
    }

    Ok(plan)
}

/// Run `requests` in order. The first failure stops the phase.
pub fn run_captures(
    browser: &mut dyn Browser,
    requests: &[CaptureRequest],
    settle: Duration,
) -> Result<usize, CaptureError> {
    let progress = ProgressBars::new(&[("capture", requests.len())]);
    for request in requests {
        capture(browser, request, settle)?;
        progress.inc(0);
    }
    progress.finish();
    Ok(requests.len())
}

/// Launch the browser configured for capture.
pub fn open_browser(config: &SiteConfig) -> Result<Box<dyn Browser>, CaptureError> {
    #[cfg(feature = "cdp")]
    {
        Ok(Box::new(ChromeBrowser::launch(&config.preview.viewport)?))
    }
    #[cfg(not(feature = "cdp"))]
    {
        let _ = config;
        Err(CaptureError::Unsupported)
    }
}

/// Capture every missing preview image.
///
/// The browser is opened only when something is missing, and dropped before
/// returning whether or not a capture failed.
pub fn capture_previews<F>(set: &PreviewSet, config: &SiteConfig, open: F) -> Result<CaptureReport>
where
    F: FnOnce(&SiteConfig) -> Result<Box<dyn Browser>, CaptureError>,
{
    let plan = plan_captures(set, config)?;
    let mut report = CaptureReport {
        captured: 0,
        cached: plan.cached,
        custom: plan.custom,
    };

    if !plan.requests.is_empty() {
        log!("capture"; "{} missing images", plan.requests.len());
        let mut browser = open(config)?;
        let settle = Duration::from_millis(config.preview.settle_ms);
        report.captured = run_captures(browser.as_mut(), &plan.requests, settle)?;
    }

    log!("capture"; "{report}");
    Ok(report)
}
