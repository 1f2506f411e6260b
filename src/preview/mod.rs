//! Preview pages: one synthetic page per post, static page and archive.
//!
//! A preview page exists only to be rendered and screenshotted; the resulting
//! image becomes the document's social card (`og_image`).
//!
//! # Pipeline
//!
//! ```text
//! Site ──► classify() ──► derive() ──► Synthesis { pages, patches }
//!                                             │
//!                      apply(patches) ◄───────┘   (before any render)
//!                             │
//!                             ▼
//!                  render_previews() ──► file:// urls ──► capture
//! ```

pub mod render;
pub mod synthesize;

pub use render::{LayoutRenderer, render_previews};
pub use synthesize::generate;

use crate::site::{ArchiveDocument, Site, SourceDocument};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Extension of every rendered preview page.
pub const PREVIEW_EXT: &str = ".html";

// ============================================================================
// Classification
// ============================================================================

/// Position of a document in the inventory. A back-reference, never ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentRef {
    Page(usize),
    Post(usize),
    Archive(usize),
}

/// Kind of document a preview page stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewKind {
    Post,
    Page,
    Archive,
}

/// A document that qualifies for a preview page.
#[derive(Debug, Clone, Copy)]
pub enum PreviewSubject<'a> {
    Post(DocumentRef, &'a SourceDocument),
    Page(DocumentRef, &'a SourceDocument),
    Archive(DocumentRef, &'a ArchiveDocument),
}

impl PreviewSubject<'_> {
    pub const fn kind(&self) -> PreviewKind {
        match self {
            Self::Post(..) => PreviewKind::Post,
            Self::Page(..) => PreviewKind::Page,
            Self::Archive(..) => PreviewKind::Archive,
        }
    }

    pub const fn location(&self) -> DocumentRef {
        match self {
            Self::Post(at, _) | Self::Page(at, _) | Self::Archive(at, _) => *at,
        }
    }
}

/// Classify a source document: posts by collection tag, pages by `.md` extension.
pub fn classify_document(at: DocumentRef, doc: &SourceDocument) -> Option<PreviewSubject<'_>> {
    if doc.is_post() {
        Some(PreviewSubject::Post(at, doc))
    } else if doc.collection.is_none() && doc.ext == ".md" {
        Some(PreviewSubject::Page(at, doc))
    } else {
        None
    }
}

/// Every eligible document of the site: pages, then posts, then archives.
pub fn classify(site: &Site) -> Vec<PreviewSubject<'_>> {
    let pages = site
        .pages
        .iter()
        .enumerate()
        .filter_map(|(i, doc)| classify_document(DocumentRef::Page(i), doc));
    let posts = site
        .posts
        .iter()
        .enumerate()
        .filter_map(|(i, doc)| classify_document(DocumentRef::Post(i), doc));
    let archives = site
        .archives
        .iter()
        .enumerate()
        .map(|(i, archive)| PreviewSubject::Archive(DocumentRef::Archive(i), archive));

    pages.chain(posts).chain(archives).collect()
}

// ============================================================================
// Preview Page
// ============================================================================

/// A synthetic page rendered only to be captured as an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewPage {
    pub source: DocumentRef,
    pub kind: PreviewKind,
    pub title: String,
    /// Output directory relative to the render root, e.g. `open-graph/blog`.
    pub dir: String,
    pub basename: String,
    pub ext: String,
    /// Image path under the image root, without extension, e.g. `blog/hello-world`.
    pub image_path: String,
    pub layout: String,
    /// Compiled CSS shared by every page of the build.
    #[serde(skip)]
    pub styles: Arc<str>,
    /// `file://` url of the rendered page, set after rendering.
    #[serde(default)]
    pub file_url: Option<String>,
    /// The source document set its own `og_image`; nothing to capture.
    #[serde(default)]
    pub custom_image: bool,
    pub sitemap: bool,
}

impl PreviewPage {
    /// File name, e.g. `hello-world.html`.
    pub fn name(&self) -> String {
        format!("{}{}", self.basename, self.ext)
    }

    /// Path relative to the render root, e.g. `open-graph/blog/hello-world.html`.
    pub fn relative_path(&self) -> PathBuf {
        Path::new(&self.dir).join(self.name())
    }

    /// Logical image path written into `og_image`.
    pub fn og_image(&self, image_root: &str) -> String {
        format!("{}/{}.png", image_root.trim_end_matches('/'), self.image_path)
    }

    /// Image file under the image root directory.
    pub fn image_file(&self, image_root_dir: &Path) -> PathBuf {
        image_root_dir.join(format!("{}.png", self.image_path))
    }
}

// ============================================================================
// Preview Set
// ============================================================================

/// All preview pages of one build, in classification order.
///
/// Persisted as a manifest so that `capture` can run after `generate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewSet {
    pub pages: Vec<PreviewPage>,
}

impl PreviewSet {
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PreviewPage> {
        self.pages.iter()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read preview manifest: {} (run `generate` first)",
                path.display()
            )
        })?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid preview manifest: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write preview manifest: {}", path.display()))
    }
}
