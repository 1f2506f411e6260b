//! `[build]` section configuration.
//!
//! Contains input/output paths and the build mode switch.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable selecting the build mode (`production` or anything else).
pub const BUILD_ENV_VAR: &str = "VIGNETTE_ENV";

// ============================================================================
// Enums
// ============================================================================

/// Whether preview pages are part of the navigable site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildMode {
    /// Preview pages are rendered into the site output.
    #[default]
    Development,
    /// Preview pages are kept out of the site output; metadata and images still apply.
    Production,
}

impl BuildMode {
    /// Resolve the mode from the config flag and the `VIGNETTE_ENV` value.
    pub fn resolve(production: bool, env_value: Option<&str>) -> Self {
        let env_production = env_value.is_some_and(|v| v.trim().eq_ignore_ascii_case("production"));
        if production || env_production {
            Self::Production
        } else {
            Self::Development
        }
    }

    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

// ============================================================================
// BuildConfig
// ============================================================================

/// `[build]` section in vignette.toml.
///
/// # Example
/// ```toml
/// [build]
/// inventory = "site.json"            # Content inventory from the site renderer
/// output = "_site"                   # Rendered site
/// stylesheet = "assets/css/main.scss"
/// production = false
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Content inventory: posts, pages and archive groupings as JSON.
    #[serde(default = "defaults::build::inventory")]
    #[educe(Default = defaults::build::inventory())]
    pub inventory: PathBuf,

    /// Rendered site directory.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Shared SCSS stylesheet compiled once for every preview page.
    #[serde(default = "defaults::build::stylesheet")]
    #[educe(Default = defaults::build::stylesheet())]
    pub stylesheet: PathBuf,

    /// Build state directory (patched inventory, preview manifest, staging).
    #[serde(default = "defaults::build::state")]
    #[educe(Default = defaults::build::state())]
    pub state: PathBuf,

    /// Production build: keep preview pages out of the navigable site.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub production: bool,
}
