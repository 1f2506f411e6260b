//! Site configuration management for `vignette.toml`.
//!
//! # Sections
//!
//! | Section       | Purpose                                            |
//! |---------------|----------------------------------------------------|
//! | `[base]`      | Site metadata (title, owner, url)                  |
//! | `[build]`     | Inventory, output, stylesheet, build mode          |
//! | `[preview]`   | Preview pages, image cache, screenshot capture     |
//! | `[transform]` | Post-render html rewrites                          |
//!
//! # Example
//!
//! ```toml
//! [base]
//! title = "Steve Polito Design"
//! owner = "Steve Polito"
//!
//! [build]
//! output = "_site"
//!
//! [preview]
//! selector = "#open-graph"
//!
//! [transform]
//! content_region = "main"
//! ```

mod base;
mod build;
pub mod defaults;
mod error;
mod preview;
mod transform;

pub use build::{BUILD_ENV_VAR, BuildMode};
pub use error::ConfigError;

pub use base::BaseConfig;
pub use build::BuildConfig;
pub use preview::{PreviewConfig, ViewportConfig};
pub use transform::TransformConfig;

use crate::cli::Cli;
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing vignette.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Basic site information
    #[serde(default)]
    pub base: BaseConfig,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Preview page and capture settings
    #[serde(default)]
    pub preview: PreviewConfig,

    /// Post-render transform settings
    #[serde(default)]
    pub transform: TransformConfig,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let mut config = Self::from_str(&content)?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Build mode from `[build].production` and `VIGNETTE_ENV`.
    pub fn mode(&self) -> BuildMode {
        BuildMode::resolve(
            self.build.production,
            env::var(BUILD_ENV_VAR).ok().as_deref(),
        )
    }

    /// Directory holding cached preview images (`<root>/<image_root>`).
    pub fn image_root_dir(&self) -> PathBuf {
        self.get_root().join(&self.preview.image_root)
    }

    /// Directory under the output that receives the images on finalize.
    pub fn publish_dir(&self) -> PathBuf {
        self.build.output.join(&self.preview.publish_dir)
    }

    /// Where preview html is rendered: the site output, or private staging in production.
    pub fn preview_render_dir(&self) -> PathBuf {
        if self.mode().is_production() {
            self.build.state.join("staging")
        } else {
            self.build.output.clone()
        }
    }

    /// Path of the preview manifest shared between `generate` and `capture`.
    pub fn preview_manifest_path(&self) -> PathBuf {
        self.build.state.join("previews.json")
    }

    /// Path of the inventory with `og_image` patches applied.
    pub fn patched_inventory_path(&self) -> PathBuf {
        self.build.state.join("site.json")
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli
            .root
            .clone()
            .unwrap_or_else(|| self.get_root().to_owned());

        Self::update_option(&mut self.build.output, cli.output.as_ref());
        Self::update_option(&mut self.build.inventory, cli.inventory.as_ref());
        if cli.production {
            self.build.production = true;
        }

        if let Some(args) = cli.capture_args() {
            Self::update_option(&mut self.preview.settle_ms, args.settle_ms.as_ref());
            Self::update_option(&mut self.preview.selector, args.selector.as_ref());
        }

        self.config_path = Self::normalize_path(&root.join(&cli.config));
        self.update_path_with_root(&root);
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve all paths against the root directory and normalize to absolute paths
    pub fn update_path_with_root(&mut self, root: &Path) {
        let root = Self::normalize_path(root);
        self.set_root(&root);

        self.build.inventory = Self::normalize_path(&root.join(&self.build.inventory));
        self.build.output = Self::normalize_path(&root.join(&self.build.output));
        self.build.stylesheet = Self::normalize_path(&root.join(&self.build.stylesheet));
        self.build.state = Self::normalize_path(&root.join(&self.build.state));

        if let Some(template) = self.preview.template.as_ref() {
            self.preview.template = Some(Self::normalize_path(&root.join(template)));
        }
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration before any work starts
    pub fn validate(&self) -> Result<()> {
        if !self.config_path.exists() {
            bail!("Config file not found");
        }

        if self.preview.selector.trim().is_empty() {
            bail!(ConfigError::Validation(
                "[preview.selector] must not be empty".into()
            ));
        }

        if self.transform.content_region.trim().is_empty() {
            bail!(ConfigError::Validation(
                "[transform.content_region] must not be empty".into()
            ));
        }

        if self.preview.viewport.width == 0 || self.preview.viewport.height == 0 {
            bail!(ConfigError::Validation(
                "[preview.viewport] width and height must be positive".into()
            ));
        }

        for (field, value) in [
            ("[preview.image_root]", &self.preview.image_root),
            ("[preview.publish_dir]", &self.preview.publish_dir),
        ] {
            if value.trim().is_empty() || Path::new(value).is_absolute() {
                bail!(ConfigError::Validation(format!(
                    "{field} must be a non-empty relative path"
                )));
            }
        }

        if let Some(template) = &self.preview.template
            && !template.is_file()
        {
            bail!(ConfigError::Validation(format!(
                "[preview.template] not found: {}",
                template.display()
            )));
        }

        if let Some(url) = &self.base.url
            && !url.starts_with("http")
        {
            bail!(ConfigError::Validation(
                "[base.url] must start with http:// or https://".into()
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn loaded(root: &Path, toml: &str) -> SiteConfig {
        let path = root.join("vignette.toml");
        fs::write(&path, toml).unwrap();
        let mut config = SiteConfig::from_path(&path).unwrap();
        config.update_path_with_root(root);
        config
    }

    #[test]
    fn test_from_str() {
        let config = SiteConfig::from_str(
            r#"
            [base]
            title = "My Blog"
            owner = "Alice"
        "#,
        )
        .unwrap();

        assert_eq!(config.base.title, "My Blog");
        assert_eq!(config.base.owner, "Alice");
    }

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(SiteConfig::from_str("[base\ntitle = \"x\"").is_err());
    }

    #[test]
    fn test_unknown_top_level_field_rejection() {
        let result = SiteConfig::from_str("[deploy]\nprovider = \"github\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_get_root_default() {
        let config = SiteConfig::default();
        assert_eq!(config.get_root(), Path::new("./"));
    }

    #[test]
    fn test_paths_resolved_against_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = loaded(dir.path(), "[base]\ntitle = \"t\"");
        let root = dir.path().canonicalize().unwrap();

        assert_eq!(config.get_root(), root);
        assert_eq!(config.build.output, root.join("_site"));
        assert_eq!(config.build.inventory, root.join("site.json"));
        assert_eq!(config.image_root_dir(), root.join("assets/images/open-graph"));
        assert_eq!(
            config.publish_dir(),
            root.join("_site/assets/images/open-graph")
        );
        assert_eq!(
            config.preview_manifest_path(),
            root.join(".vignette/previews.json")
        );
    }

    #[test]
    fn test_update_with_cli() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();
        let cli = Cli::try_parse_from([
            "vignette",
            "--root",
            root,
            "--output",
            "public",
            "--production",
            "capture",
            "--settle-ms",
            "0",
        ])
        .unwrap();

        let mut config = SiteConfig::default();
        config.update_with_cli(&cli);

        assert!(config.build.production);
        assert_eq!(config.preview.settle_ms, 0);
        assert!(config.build.output.ends_with("public"));
        assert!(config.config_path.ends_with("vignette.toml"));
        assert_eq!(config.mode(), BuildMode::Production);
        assert!(config.preview_render_dir().ends_with(".vignette/staging"));
    }

    #[test]
    fn test_validate_ok() {
        let dir = tempfile::tempdir().unwrap();
        let config = loaded(dir.path(), "[base]\nurl = \"https://example.com\"");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_selector() {
        let dir = tempfile::tempdir().unwrap();
        let config = loaded(dir.path(), "[preview]\nselector = \"  \"");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("[preview.selector]"));
    }

    #[test]
    fn test_validate_absolute_image_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = loaded(dir.path(), "[preview]\nimage_root = \"/tmp/images\"");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("[preview.image_root]"));
    }

    #[test]
    fn test_validate_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let config = loaded(dir.path(), "[preview]\ntemplate = \"missing.html\"");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_url() {
        let dir = tempfile::tempdir().unwrap();
        let config = loaded(dir.path(), "[base]\nurl = \"example.com\"");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_full_config_all_sections() {
        let config = SiteConfig::from_str(
            r##"
            [base]
            title = "Steve Polito Design"
            owner = "Steve Polito"
            url = "https://stevepolito.design"

            [build]
            inventory = "data/site.json"
            output = "_site"
            stylesheet = "assets/css/main.scss"

            [preview]
            selector = "#open-graph"
            settle_ms = 500

            [preview.viewport]
            width = 1200
            height = 630

            [transform]
            content_region = "main"
            expand_label = "Click to expand"
        "##,
        )
        .unwrap();

        assert_eq!(config.build.inventory, PathBuf::from("data/site.json"));
        assert_eq!(config.preview.settle_ms, 500);
        assert_eq!(config.preview.selector, "#open-graph");
        assert_eq!(config.transform.content_region, "main");
    }
}
