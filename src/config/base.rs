//! `[base]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[base]` section in vignette.toml - basic site metadata.
///
/// # Example
/// ```toml
/// [base]
/// title = "Steve Polito Design"
/// owner = "Steve Polito"
/// url = "https://stevepolito.design"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BaseConfig {
    /// Site title, exposed to preview templates as `{{ site }}`.
    #[serde(default)]
    pub title: String,

    /// Site owner, used in archive preview titles ("Latest X posts from <owner>").
    #[serde(default = "defaults::base::owner")]
    #[educe(Default = defaults::base::owner())]
    pub owner: String,

    /// Canonical site URL.
    #[serde(default = "defaults::base::url")]
    #[educe(Default = defaults::base::url())]
    pub url: Option<String>,
}
