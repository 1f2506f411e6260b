//! Stylesheet compilation for preview pages.
//!
//! The shared SCSS stylesheet is compiled once per build and the resulting CSS
//! is injected into every preview page.

use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StyleError {
    #[error("failed to read stylesheet `{0}`")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("failed to compile stylesheet: {0}")]
    Compile(String),
}

/// `compile(scss) -> css`.
pub trait StyleCompiler {
    fn compile(&self, scss: &str) -> Result<String, StyleError>;
}

/// SCSS compiler backed by `grass`.
#[derive(Debug, Clone, Default)]
pub struct GrassCompiler {
    load_paths: Vec<PathBuf>,
    compressed: bool,
}

impl GrassCompiler {
    /// Compiler resolving `@use`/`@import` relative to `dir`.
    pub fn with_load_path(dir: &Path) -> Self {
        Self {
            load_paths: vec![dir.to_path_buf()],
            compressed: true,
        }
    }
}

impl StyleCompiler for GrassCompiler {
    fn compile(&self, scss: &str) -> Result<String, StyleError> {
        let style = if self.compressed {
            grass::OutputStyle::Compressed
        } else {
            grass::OutputStyle::Expanded
        };
        let options = grass::Options::default()
            .load_paths(self.load_paths.as_slice())
            .style(style);

        grass::from_string(scss, &options).map_err(|e| StyleError::Compile(e.to_string()))
    }
}

/// Read and compile the stylesheet at `path`, dropping its front matter fence.
pub fn compile_stylesheet(path: &Path, compiler: &dyn StyleCompiler) -> Result<String, StyleError> {
    let source =
        fs::read_to_string(path).map_err(|err| StyleError::Read(path.to_path_buf(), err))?;
    compiler.compile(strip_front_matter(&source))
}

/// Remove a leading `---` ... `---` block.
fn strip_front_matter(source: &str) -> &str {
    let Some(rest) = source.strip_prefix("---") else {
        return source;
    };
    let rest = rest.trim_start_matches([' ', '\t']);
    let Some(rest) = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")) else {
        return source;
    };
    if let Some(body) = rest.strip_prefix("---") {
        return body;
    }
    match rest.find("\n---") {
        Some(pos) => &rest[pos + 4..],
        None => source,
    }
}
