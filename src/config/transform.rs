//! `[transform]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[transform]` section in vignette.toml - post-render html rewrites.
///
/// # Example
/// ```toml
/// [transform]
/// content_region = "main"
/// image_links = true
/// heading_anchors = true
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct TransformConfig {
    /// Element name bounding the rewritten content.
    #[serde(default = "defaults::transform::content_region")]
    #[educe(Default = defaults::transform::content_region())]
    pub content_region: String,

    /// Wrap bare content images in links to themselves.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub image_links: bool,

    /// Insert self-links into headings carrying an `id`.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub heading_anchors: bool,

    /// Caption placed under linked images.
    #[serde(default = "defaults::transform::expand_label")]
    #[educe(Default = defaults::transform::expand_label())]
    pub expand_label: String,
}
