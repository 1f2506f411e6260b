//! Build orchestration.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── generate_stage()
//!     │       │
//!     │       ├── Compile stylesheet, derive preview pages
//!     │       ├── Patch `og_image` into every eligible document
//!     │       │   (before anything renders the inventory)
//!     │       └── Render preview html → file:// urls → manifest
//!     │
//!     ├── transform_stage() ──► Rewrite rendered html in the output
//!     │
//!     ├── capture_stage() ──► Screenshot missing images into the image root
//!     │
//!     └── finalize() ──► Copy the image root into the output
//! ```

use crate::{
    capture::{Browser, CaptureError, CaptureReport, capture_previews},
    config::{BuildMode, SiteConfig},
    log,
    preview::{self, LayoutRenderer, PreviewSet, render_previews},
    site::Site,
    style::GrassCompiler,
    transform::transform_output,
};
use anyhow::{Context, Result};
use std::{fs, path::Path};
use walkdir::WalkDir;

/// State threaded from one stage to the next.
#[derive(Debug)]
pub struct BuildContext {
    pub site: Site,
    pub previews: PreviewSet,
    pub mode: BuildMode,
}

/// Synthesize and render preview pages, and write the patched inventory.
pub fn generate_stage(config: &SiteConfig) -> Result<BuildContext> {
    let mode = config.mode();
    let mut site = Site::load(&config.build.inventory)?;

    let style_dir = config.build.stylesheet.parent().unwrap_or(config.get_root());
    let compiler = GrassCompiler::with_load_path(style_dir);
    let mut previews = preview::generate(&mut site, &compiler, config, mode)?;

    site.save(&config.patched_inventory_path())?;

    if !previews.is_empty() {
        let renderer = LayoutRenderer::from_config(config)?;
        render_previews(&mut previews, &renderer, &config.preview_render_dir())?;
    }
    previews.save(&config.preview_manifest_path())?;

    Ok(BuildContext { site, previews, mode })
}

/// Rewrite every rendered html file of the output.
pub fn transform_stage(config: &SiteConfig) -> Result<usize> {
    transform_output(config, &[])
}

/// Capture missing preview images. No browser is launched when none are missing.
pub fn capture_stage<F>(config: &SiteConfig, previews: &PreviewSet, open: F) -> Result<CaptureReport>
where
    F: FnOnce(&SiteConfig) -> Result<Box<dyn Browser>, CaptureError>,
{
    capture_previews(previews, config, open).context("Capture failed")
}

/// Copy the image root into the output, replacing previously published images.
pub fn finalize(config: &SiteConfig) -> Result<usize> {
    let source = config.image_root_dir();
    let target = config.publish_dir();

    if source == target {
        log!("finalize"; "images already in place at {}", target.display());
        return Ok(0);
    }
    if target.exists() {
        fs::remove_dir_all(&target)
            .with_context(|| format!("Failed to clear {}", target.display()))?;
    }
    if !source.is_dir() {
        log!("finalize"; "no preview images at {}", source.display());
        return Ok(0);
    }

    let copied = copy_tree(&source, &target)?;
    log!("finalize"; "{copied} images -> {}", target.display());
    Ok(copied)
}

fn copy_tree(source: &Path, target: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(source).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(source)?;
        let dest = target.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &dest)
            .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        copied += 1;
    }
    Ok(copied)
}

/// `capture` command: capture from the manifest written by `generate`, then finalize.
pub fn capture_site<F>(config: &SiteConfig, open: F) -> Result<CaptureReport>
where
    F: FnOnce(&SiteConfig) -> Result<Box<dyn Browser>, CaptureError>,
{
    let previews = PreviewSet::load(&config.preview_manifest_path())?;
    let report = capture_stage(config, &previews, open)?;
    finalize(config)?;
    Ok(report)
}

/// `build` command: every stage in order.
pub fn build_site<F>(config: &SiteConfig, open: F) -> Result<CaptureReport>
where
    F: FnOnce(&SiteConfig) -> Result<Box<dyn Browser>, CaptureError>,
{
    let ctx = generate_stage(config)?;
    transform_stage(config)?;
    let report = capture_stage(config, &ctx.previews, open)?;
    finalize(config)?;

    log!(
        "build";
        "{} mode: {} preview pages, {} documents",
        ctx.mode.name(),
        ctx.previews.len(),
        ctx.site.document_count()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{capture::Region, site::OG_IMAGE_KEY};
    use std::time::Duration;
    use tempfile::TempDir;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    const INVENTORY: &str = r#"{
        "pages": [
            { "slug": "about", "title": "About", "dir": "/", "basename": "about", "ext": ".md" }
        ],
        "posts": [
            { "slug": "hello-world", "title": "Hello World", "dir": "/blog/", "basename": "hello-world",
              "ext": ".md", "collection": "posts" },
            { "slug": "custom", "title": "Custom", "dir": "/blog/", "basename": "custom", "ext": ".md",
              "collection": "posts", "metadata": { "og_image": "assets/images/custom.png" } }
        ],
        "archives": [ { "type": "tags", "title": "Opinion", "slug": "opinion" } ]
    }"#;

    struct StubBrowser;

    impl Browser for StubBrowser {
        fn navigate(&mut self, url: &str) -> Result<()> {
            anyhow::ensure!(url.starts_with("file://"), "unexpected url {url}");
            Ok(())
        }

        fn settle(&mut self, _delay: Duration) -> Result<()> {
            Ok(())
        }

        fn locate(&mut self, _selector: &str) -> Result<Option<Region>> {
            Ok(Some(Region { x: 0.0, y: 0.0, width: 1200.0, height: 630.0 }))
        }

        fn rasterize(&mut self, _region: &Region) -> Result<Vec<u8>> {
            Ok(PNG.to_vec())
        }
    }

    fn stub_browser(_: &SiteConfig) -> Result<Box<dyn Browser>, CaptureError> {
        Ok(Box::new(StubBrowser))
    }

    fn no_browser(_: &SiteConfig) -> Result<Box<dyn Browser>, CaptureError> {
        Err(CaptureError::Launch("browser must not be launched".into()))
    }

    fn project() -> (TempDir, SiteConfig) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("site.json"), INVENTORY).unwrap();
        fs::create_dir_all(root.join("assets/css")).unwrap();
        fs::write(root.join("assets/css/main.scss"), "---\n---\n.p-5 { padding: 3rem; }").unwrap();

        let mut config = SiteConfig::default();
        config.base.owner = "Steve Polito".into();
        config.update_path_with_root(root);
        (dir, config)
    }

    #[test]
    fn test_build_hello_world() {
        let (_dir, config) = project();

        let report = build_site(&config, stub_browser).unwrap();
        assert_eq!(report, CaptureReport { captured: 3, cached: 0, custom: 1 });

        let site = Site::load(&config.patched_inventory_path()).unwrap();
        assert_eq!(
            site.posts[0].metadata[OG_IMAGE_KEY],
            "assets/images/open-graph/blog/hello-world.png"
        );
        assert_eq!(site.posts[1].metadata[OG_IMAGE_KEY], "assets/images/custom.png");

        let image = config.image_root_dir().join("blog/hello-world.png");
        assert!(!fs::read(&image).unwrap().is_empty());
        let published = config.publish_dir().join("blog/hello-world.png");
        assert_eq!(fs::read(published).unwrap(), PNG);
        assert!(config.build.output.join("open-graph/tags/opinion.html").is_file());
    }

    #[test]
    fn test_rebuild_uses_cached_images() {
        let (_dir, config) = project();
        build_site(&config, stub_browser).unwrap();

        let report = build_site(&config, no_browser).unwrap();
        assert_eq!(report, CaptureReport { captured: 0, cached: 3, custom: 1 });
    }

    #[test]
    fn test_production_keeps_previews_out_of_site() {
        let (_dir, mut config) = project();
        config.build.production = true;

        let ctx = generate_stage(&config).unwrap();

        assert!(ctx.site.generated.is_empty());
        assert!(ctx.site.posts[0].metadata.contains_key(OG_IMAGE_KEY));
        assert!(ctx.site.pages[0].metadata.contains_key(OG_IMAGE_KEY));
        assert!(!config.build.output.join("open-graph").exists());
        assert!(config.build.state.join("staging/open-graph/blog/hello-world.html").is_file());
    }

    #[test]
    fn test_capture_command_reads_manifest() {
        let (_dir, config) = project();
        generate_stage(&config).unwrap();

        let report = capture_site(&config, stub_browser).unwrap();
        assert_eq!(report.captured, 3);
        assert!(config.publish_dir().join("tags/opinion.png").is_file());
    }

    #[test]
    fn test_capture_without_generate() {
        let (_dir, config) = project();
        let err = capture_site(&config, stub_browser).unwrap_err();
        assert!(format!("{err:#}").contains("run `generate` first"));
    }

    #[test]
    fn test_missing_stylesheet_is_fatal() {
        let (dir, config) = project();
        fs::remove_file(dir.path().join("assets/css/main.scss")).unwrap();

        let err = build_site(&config, no_browser).unwrap_err();
        assert!(format!("{err:#}").contains("Preview styles unavailable"));
        assert!(!config.image_root_dir().exists());
    }

    #[test]
    fn test_finalize_replaces_published_images() {
        let (_dir, config) = project();
        let stale = config.publish_dir().join("blog/deleted.png");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, PNG).unwrap();
        let fresh = config.image_root_dir().join("blog/kept.png");
        fs::create_dir_all(fresh.parent().unwrap()).unwrap();
        fs::write(&fresh, PNG).unwrap();

        assert_eq!(finalize(&config).unwrap(), 1);
        assert!(!stale.exists());
        assert!(config.publish_dir().join("blog/kept.png").is_file());
    }
}
