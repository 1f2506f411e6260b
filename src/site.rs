//! Content inventory: the documents the site renderer already knows about.
//!
//! Routing, slugs and taxonomy are computed upstream; this module only reads
//! the resulting fields from a JSON inventory and writes the patched copy back.
//!
//! ```json
//! {
//!   "pages":    [{ "slug": "about", "title": "About", "dir": "/", "basename": "about", "ext": ".md" }],
//!   "posts":    [{ "slug": "hello-world", "title": "Hello", "dir": "/blog/", "basename": "2021-01-01-hello-world",
//!                  "ext": ".md", "collection": "posts", "metadata": { "tags": ["opinion"] } }],
//!   "archives": [{ "type": "tags", "title": "Opinion", "slug": "opinion" }]
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fs, path::Path};

/// Metadata key carrying the preview image path.
pub const OG_IMAGE_KEY: &str = "og_image";

/// Collection tag of blog posts.
pub const POSTS_COLLECTION: &str = "posts";

/// Free-form front matter of a document.
pub type Metadata = Map<String, Value>;

/// An authored post or static page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub slug: String,
    pub title: String,
    /// Output directory, e.g. `/` or `/projects/`.
    #[serde(default)]
    pub dir: String,
    pub basename: String,
    /// Source extension, e.g. `.md` or `.html`.
    pub ext: String,
    /// Collection tag; `posts` for blog posts, absent for static pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl SourceDocument {
    /// Custom `og_image` set by the author, if any.
    pub fn custom_og_image(&self) -> Option<&str> {
        self.metadata
            .get(OG_IMAGE_KEY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn is_post(&self) -> bool {
        self.collection.as_deref() == Some(POSTS_COLLECTION)
    }
}

/// A virtual listing document, e.g. every post tagged `opinion`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveDocument {
    /// Archive type: `tags`, `categories`, ...
    #[serde(rename = "type")]
    pub kind: String,
    /// Human label, e.g. `Opinion`.
    pub title: String,
    pub slug: String,
}

/// A renderable page added to the site by this pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPage {
    pub title: String,
    pub dir: String,
    pub name: String,
    pub layout: String,
    pub sitemap: bool,
}

/// The full content inventory of one build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Site {
    #[serde(default)]
    pub pages: Vec<SourceDocument>,
    #[serde(default)]
    pub posts: Vec<SourceDocument>,
    #[serde(default)]
    pub archives: Vec<ArchiveDocument>,
    /// Navigable pages contributed by the pipeline (empty in production).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generated: Vec<GeneratedPage>,
}

impl Site {
    pub fn from_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load an inventory file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read inventory: {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("Invalid inventory: {}", path.display()))
    }

    /// Write the inventory as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write inventory: {}", path.display()))
    }

    pub fn document_count(&self) -> usize {
        self.pages.len() + self.posts.len() + self.archives.len()
    }
}
