//! Post-render html rewrites.
//!
//! Each transformer is an idempotent, stateless rewrite of one rendered
//! document. They run in a fixed order: image links, then heading anchors.
//! A transformer that cannot parse its input returns it unchanged.

mod heading_anchor;
mod image_link;
mod markup;

pub use heading_anchor::HeadingAnchorer;
pub use image_link::ImageLinker;

use crate::{config::SiteConfig, log, utils::log::ProgressBars};
use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// `transform(html) -> html'`.
pub trait HtmlTransformer {
    fn name(&self) -> &'static str;

    fn try_transform(&self, html: &str) -> Result<String>;

    /// Rewrite `html`, or return it unchanged if it cannot be parsed.
    fn transform(&self, html: &str) -> String {
        match self.try_transform(html) {
            Ok(out) => out,
            Err(e) => {
                log!("warn"; "{} skipped: {e:#}", self.name());
                html.to_owned()
            }
        }
    }
}

/// The enabled transformers, in application order.
pub struct Transformers {
    chain: Vec<Box<dyn HtmlTransformer>>,
}

impl Transformers {
    pub fn from_config(config: &SiteConfig) -> Self {
        let transform = &config.transform;
        let mut chain: Vec<Box<dyn HtmlTransformer>> = Vec::new();
        if transform.image_links {
            chain.push(Box::new(ImageLinker::from_config(transform)));
        }
        if transform.heading_anchors {
            chain.push(Box::new(HeadingAnchorer::from_config(transform)));
        }
        Self { chain }
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn apply(&self, html: &str) -> String {
        self.chain
            .iter()
            .fold(html.to_owned(), |html, transformer| transformer.transform(&html))
    }
}

/// Rewrite one html file in place. Returns whether its content changed.
pub fn transform_file(path: &Path, transformers: &Transformers) -> Result<bool> {
    let html = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let out = transformers.apply(&html);
    if out == html {
        return Ok(false);
    }
    fs::write(path, out).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

/// Every `.html` file under `dir`.
pub fn collect_html_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "html"))
        .map(|e| e.into_path())
        .collect()
}

/// Transform `paths`, or every html file of the output directory when empty.
pub fn transform_output(config: &SiteConfig, paths: &[PathBuf]) -> Result<usize> {
    let transformers = Transformers::from_config(config);
    if transformers.is_empty() {
        log!("transform"; "all transformers disabled");
        return Ok(0);
    }

    let files = if paths.is_empty() {
        collect_html_files(&config.build.output)
    } else {
        paths.to_vec()
    };

    let progress = ProgressBars::new(&[("transform", files.len())]);
    let mut changed = 0;
    for file in &files {
        if transform_file(file, &transformers)? {
            changed += 1;
        }
        progress.inc(0);
    }
    progress.finish();

    log!("transform"; "{changed} of {} html files rewritten", files.len());
    Ok(changed)
}
