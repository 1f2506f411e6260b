//! `[preview]` section configuration.
//!
//! Controls preview page synthesis, rendering and screenshot capture.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[preview]` section in vignette.toml.
///
/// # Example
/// ```toml
/// [preview]
/// image_root = "assets/images/open-graph"  # Cached screenshots (source tree)
/// selector = "#open-graph"                 # Element captured on each preview page
/// settle_ms = 1000                         # Wait for web fonts before capturing
///
/// [preview.viewport]
/// width = 1200
/// height = 630
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    /// Generate preview pages at all.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub enable: bool,

    /// Output directory prefix for preview pages.
    #[serde(default = "defaults::preview::dir")]
    #[educe(Default = defaults::preview::dir())]
    pub dir: String,

    /// Layout identifier recorded on every preview page.
    #[serde(default = "defaults::preview::layout")]
    #[educe(Default = defaults::preview::layout())]
    pub layout: String,

    /// Custom layout template; the built-in card is used when unset.
    #[serde(default)]
    pub template: Option<PathBuf>,

    /// Logical image root. Also the prefix written into `og_image`.
    #[serde(default = "defaults::preview::image_root")]
    #[educe(Default = defaults::preview::image_root())]
    pub image_root: String,

    /// Directory under the site output that receives the image root on finalize.
    #[serde(default = "defaults::preview::publish_dir")]
    #[educe(Default = defaults::preview::publish_dir())]
    pub publish_dir: String,

    /// CSS selector of the element rasterized on each preview page.
    #[serde(default = "defaults::preview::selector")]
    #[educe(Default = defaults::preview::selector())]
    pub selector: String,

    /// Fixed delay after navigation, in milliseconds.
    #[serde(default = "defaults::preview::settle_ms")]
    #[educe(Default = defaults::preview::settle_ms())]
    pub settle_ms: u64,

    /// Browser window size.
    #[serde(default)]
    pub viewport: ViewportConfig,
}

/// `[preview.viewport]` section
#[derive(Debug, Clone, Copy, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ViewportConfig {
    #[serde(default = "defaults::preview::viewport::width")]
    #[educe(Default = defaults::preview::viewport::width())]
    pub width: u32,

    #[serde(default = "defaults::preview::viewport::height")]
    #[educe(Default = defaults::preview::viewport::height())]
    pub height: u32,
}
