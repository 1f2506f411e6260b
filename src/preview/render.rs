//! Rendering preview pages to html files.
//!
//! Preview pages use a single layout. The built-in card can be replaced by a
//! template file with these placeholders:
//!
//! | Placeholder      | Value                              |
//! |------------------|------------------------------------|
//! | `{{ title }}`    | Preview title (escaped)            |
//! | `{{ styles }}`   | Compiled stylesheet                |
//! | `{{ owner }}`    | `[base].owner` (escaped)           |
//! | `{{ site }}`     | `[base].title` (escaped)           |
//! | `{{ width }}`    | `[preview.viewport].width`         |
//! | `{{ height }}`   | `[preview.viewport].height`        |

use super::{PreviewPage, PreviewSet};
use crate::{config::SiteConfig, log};
use anyhow::{Context, Result, anyhow};
use quick_xml::escape::escape;
use std::{fs, path::Path};
use url::Url;

/// `render(page) -> html`.
pub trait Renderer {
    fn render(&self, page: &PreviewPage) -> Result<String>;
}

const BUILTIN_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="robots" content="noindex">
<title>{{ title }}</title>
<style>{{ styles }}</style>
</head>
<body class="m-0">
<div id="open-graph" class="open-graph d-flex flex-column justify-content-between p-5" style="width: {{ width }}px; height: {{ height }}px; box-sizing: border-box;">
<h1 class="long-shadow">{{ title }}</h1>
<p class="h3">{{ owner }} &middot; {{ site }}</p>
</div>
</body>
</html>
"#;

/// Renders preview pages from the `open-graph` layout.
#[derive(Debug, Clone)]
pub struct LayoutRenderer {
    template: String,
    owner: String,
    site: String,
    width: u32,
    height: u32,
}

impl LayoutRenderer {
    /// Renderer using `[preview].template`, or the built-in card.
    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        let template = match &config.preview.template {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("Failed to read preview template: {}", path.display()))?,
            None => BUILTIN_TEMPLATE.to_owned(),
        };
        Ok(Self::with_template(template, config))
    }

    pub fn with_template(template: String, config: &SiteConfig) -> Self {
        Self {
            template,
            owner: config.base.owner.clone(),
            site: config.base.title.clone(),
            width: config.preview.viewport.width,
            height: config.preview.viewport.height,
        }
    }
}

impl Renderer for LayoutRenderer {
    fn render(&self, page: &PreviewPage) -> Result<String> {
        Ok(self
            .template
            .replace("{{ title }}", &escape(page.title.as_str()))
            .replace("{{ owner }}", &escape(self.owner.as_str()))
            .replace("{{ site }}", &escape(self.site.as_str()))
            .replace("{{ width }}", &self.width.to_string())
            .replace("{{ height }}", &self.height.to_string())
            // styles last: compiled css is never scanned for placeholders
            .replace("{{ styles }}", &page.styles))
    }
}

/// Render every page under `out_dir` and record its `file://` url.
pub fn render_previews(set: &mut PreviewSet, renderer: &dyn Renderer, out_dir: &Path) -> Result<usize> {
    for page in &mut set.pages {
        let html = renderer
            .render(page)
            .with_context(|| format!("Failed to render preview page `{}`", page.title))?;

        let path = out_dir.join(page.relative_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, html).with_context(|| format!("Failed to write {}", path.display()))?;

        let url = Url::from_file_path(&path)
            .map_err(|()| anyhow!("Preview path is not absolute: {}", path.display()))?;
        page.file_url = Some(url.to_string());
    }

    log!("render"; "{} preview pages into {}", set.len(), out_dir.display());
    Ok(set.len())
}
