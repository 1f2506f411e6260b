//! Preview page synthesis.
//!
//! Runs before the site is rendered: every eligible document gets a preview page
//! and an `og_image` entry in its metadata. Derivation and mutation are separate
//! steps so that all patches land before any template reads them.

use super::{DocumentRef, PREVIEW_EXT, PreviewKind, PreviewPage, PreviewSet, PreviewSubject, classify};
use crate::{
    config::{BuildMode, SiteConfig},
    log,
    site::{GeneratedPage, OG_IMAGE_KEY, Site},
    style::{StyleCompiler, compile_stylesheet},
};
use anyhow::{Context, Result};
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SynthesisError {
    #[error("`{title}` and `{other}` both map to image `{image_path}`")]
    DuplicateImagePath {
        image_path: String,
        title: String,
        other: String,
    },

    #[error("`{title}` has no slug or basename to name its preview image")]
    MissingKey { title: String },
}

/// `og_image` value to write into one source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataPatch {
    pub target: DocumentRef,
    pub og_image: String,
}

/// Result of the derive phase: nothing in the site has been touched yet.
#[derive(Debug, Default)]
pub struct Synthesis {
    pub pages: Vec<PreviewPage>,
    pub patches: Vec<MetadataPatch>,
}

/// Derive preview pages and metadata patches for every eligible document.
pub fn derive(site: &Site, styles: Arc<str>, config: &SiteConfig) -> Result<Synthesis, SynthesisError> {
    let prefix = config.preview.dir.trim_end_matches('/');
    let mut synthesis = Synthesis::default();
    let mut claimed: HashMap<String, String> = HashMap::new();

    for subject in classify(site) {
        let (title, dir, basename, image_path, custom_image) = match subject {
            PreviewSubject::Post(_, doc) => (
                doc.title.clone(),
                format!("{prefix}/blog"),
                doc.slug.clone(),
                format!("blog/{}", doc.slug),
                doc.custom_og_image().is_some(),
            ),
            PreviewSubject::Page(_, doc) => (
                doc.title.clone(),
                page_dir(prefix, &doc.dir),
                doc.basename.clone(),
                doc.basename.clone(),
                doc.custom_og_image().is_some(),
            ),
            PreviewSubject::Archive(_, archive) => (
                format!("Latest {} posts from {}", archive.title, config.base.owner),
                format!("{prefix}/{}", archive.kind),
                archive.slug.clone(),
                format!("{}/{}", archive.kind, archive.slug),
                false,
            ),
        };

        if basename.trim().is_empty() {
            return Err(SynthesisError::MissingKey { title });
        }
        if let Some(other) = claimed.insert(image_path.clone(), title.clone()) {
            return Err(SynthesisError::DuplicateImagePath {
                image_path,
                title,
                other,
            });
        }

        let page = PreviewPage {
            source: subject.location(),
            kind: subject.kind(),
            title,
            dir,
            basename,
            ext: PREVIEW_EXT.into(),
            image_path,
            layout: config.preview.layout.clone(),
            styles: Arc::clone(&styles),
            file_url: None,
            custom_image,
            sitemap: false,
        };

        // Archives have no front matter to patch
        if page.kind != PreviewKind::Archive && !custom_image {
            synthesis.patches.push(MetadataPatch {
                target: page.source,
                og_image: page.og_image(&config.preview.image_root),
            });
        }
        synthesis.pages.push(page);
    }

    Ok(synthesis)
}

/// Write every patch into its source document's metadata.
pub fn apply(site: &mut Site, patches: &[MetadataPatch]) {
    for patch in patches {
        let doc = match patch.target {
            DocumentRef::Page(i) => site.pages.get_mut(i),
            DocumentRef::Post(i) => site.posts.get_mut(i),
            DocumentRef::Archive(_) => None,
        };
        if let Some(doc) = doc {
            doc.metadata
                .insert(OG_IMAGE_KEY.into(), Value::String(patch.og_image.clone()));
        }
    }
}

/// Compile styles, derive and apply, then register the pages with the site.
///
/// In production the pages stay out of `site.generated`; metadata is patched either way.
pub fn generate(
    site: &mut Site,
    compiler: &dyn StyleCompiler,
    config: &SiteConfig,
    mode: BuildMode,
) -> Result<PreviewSet> {
    if !config.preview.enable {
        log!("generate"; "preview pages disabled");
        return Ok(PreviewSet::default());
    }

    let styles: Arc<str> = compile_stylesheet(&config.build.stylesheet, compiler)
        .with_context(|| {
            format!(
                "Preview styles unavailable: {}",
                config.build.stylesheet.display()
            )
        })?
        .into();

    let Synthesis { pages, patches } = derive(site, styles, config)?;
    apply(site, &patches);

    if !mode.is_production() {
        site.generated.extend(pages.iter().map(|page| GeneratedPage {
            title: page.title.clone(),
            dir: page.dir.clone(),
            name: page.name(),
            layout: page.layout.clone(),
            sitemap: page.sitemap,
        }));
    }

    let custom = pages.iter().filter(|p| p.custom_image).count();
    log!(
        "generate";
        "{} preview pages from {} documents ({} with custom images, {} mode)",
        pages.len(),
        site.document_count(),
        custom,
        mode.name()
    );

    Ok(PreviewSet { pages })
}

/// `open-graph` + `/projects/` → `open-graph/projects`.
fn page_dir(prefix: &str, dir: &str) -> String {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        prefix.to_owned()
    } else {
        format!("{prefix}/{dir}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::{ArchiveDocument, POSTS_COLLECTION, SourceDocument};
    use crate::style::StyleError;
    use serde_json::json;
    use std::collections::HashSet;
    use std::fs;

    struct EchoCompiler;

    impl StyleCompiler for EchoCompiler {
        fn compile(&self, scss: &str) -> Result<String, StyleError> {
            Ok(scss.trim().to_owned())
        }
    }

    fn post(slug: &str) -> SourceDocument {
        SourceDocument {
            slug: slug.into(),
            title: format!("Post {slug}"),
            dir: "/blog/".into(),
            basename: format!("2021-01-01-{slug}"),
            ext: ".md".into(),
            collection: Some(POSTS_COLLECTION.into()),
            ..Default::default()
        }
    }

    fn page(basename: &str, dir: &str) -> SourceDocument {
        SourceDocument {
            slug: basename.into(),
            title: basename.to_uppercase(),
            dir: dir.into(),
            basename: basename.into(),
            ext: ".md".into(),
            ..Default::default()
        }
    }

    fn archive(kind: &str, title: &str, slug: &str) -> ArchiveDocument {
        ArchiveDocument {
            kind: kind.into(),
            title: title.into(),
            slug: slug.into(),
        }
    }

    fn sample_site() -> Site {
        let mut custom = post("post-with-meta-data");
        custom
            .metadata
            .insert(OG_IMAGE_KEY.into(), json!("assets/images/posts/custom.jpg"));

        Site {
            pages: vec![page("about", "/"), page("uses", "/projects/")],
            posts: vec![post("hello-world"), custom],
            archives: vec![
                archive("tags", "Opinion", "opinion"),
                archive("categories", "Ruby on Rails", "ruby-on-rails"),
            ],
            ..Default::default()
        }
    }

    fn config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.base.owner = "Steve Polito".into();
        config
    }

    fn with_stylesheet(config: &mut SiteConfig, dir: &std::path::Path) {
        let path = dir.join("main.scss");
        fs::write(&path, "---\n---\n.card { color: red; }").unwrap();
        config.build.stylesheet = path;
    }

    #[test]
    fn test_derive_post() {
        let site = Site {
            posts: vec![post("hello-world")],
            ..Default::default()
        };
        let synthesis = derive(&site, Arc::from("css"), &config()).unwrap();
        let page = &synthesis.pages[0];

        assert_eq!(page.kind, PreviewKind::Post);
        assert_eq!(page.title, "Post hello-world");
        assert_eq!(page.dir, "open-graph/blog");
        assert_eq!(page.basename, "hello-world");
        assert_eq!(page.image_path, "blog/hello-world");
        assert_eq!(page.ext, ".html");
        assert_eq!(page.layout, "open-graph");
        assert_eq!(&*page.styles, "css");
        assert!(!page.sitemap);
        assert_eq!(
            synthesis.patches,
            vec![MetadataPatch {
                target: DocumentRef::Post(0),
                og_image: "assets/images/open-graph/blog/hello-world.png".into(),
            }]
        );
    }

    #[test]
    fn test_derive_pages_use_directory_and_basename() {
        let site = sample_site();
        let synthesis = derive(&site, Arc::from(""), &config()).unwrap();

        let about = &synthesis.pages[0];
        assert_eq!(about.dir, "open-graph");
        assert_eq!(about.image_path, "about");

        let uses = &synthesis.pages[1];
        assert_eq!(uses.dir, "open-graph/projects");
        assert_eq!(uses.basename, "uses");
        assert_eq!(uses.image_path, "uses");
    }

    #[test]
    fn test_derive_archive() {
        let site = sample_site();
        let synthesis = derive(&site, Arc::from(""), &config()).unwrap();
        let opinion = synthesis
            .pages
            .iter()
            .find(|p| p.source == DocumentRef::Archive(0))
            .unwrap();

        assert_eq!(opinion.title, "Latest Opinion posts from Steve Polito");
        assert_eq!(opinion.dir, "open-graph/tags");
        assert_eq!(opinion.basename, "opinion");
        assert_eq!(opinion.image_path, "tags/opinion");
        assert!(
            !synthesis
                .patches
                .iter()
                .any(|p| matches!(p.target, DocumentRef::Archive(_)))
        );
    }

    #[test]
    fn test_derive_shares_one_stylesheet() {
        let site = sample_site();
        let styles: Arc<str> = Arc::from(".card{}");
        let synthesis = derive(&site, Arc::clone(&styles), &config()).unwrap();

        assert!(synthesis.pages.iter().all(|p| Arc::ptr_eq(&p.styles, &styles)));
    }

    #[test]
    fn test_image_paths_unique() {
        let synthesis = derive(&sample_site(), Arc::from(""), &config()).unwrap();
        let paths: HashSet<_> = synthesis.pages.iter().map(|p| &p.image_path).collect();

        assert_eq!(synthesis.pages.len(), 6);
        assert_eq!(paths.len(), synthesis.pages.len());
    }

    #[test]
    fn test_duplicate_image_path_is_fatal() {
        let site = Site {
            pages: vec![page("uses", "/"), page("uses", "/projects/")],
            ..Default::default()
        };
        let err = derive(&site, Arc::from(""), &config()).unwrap_err();

        assert!(matches!(err, SynthesisError::DuplicateImagePath { ref image_path, .. } if image_path == "uses"));
    }

    #[test]
    fn test_missing_slug_is_fatal() {
        let site = Site {
            posts: vec![post("")],
            ..Default::default()
        };
        let err = derive(&site, Arc::from(""), &config()).unwrap_err();
        assert!(matches!(err, SynthesisError::MissingKey { .. }));
    }

    #[test]
    fn test_custom_og_image_wins() {
        let mut site = sample_site();
        let synthesis = derive(&site, Arc::from(""), &config()).unwrap();
        apply(&mut site, &synthesis.patches);

        let custom_page = synthesis
            .pages
            .iter()
            .find(|p| p.source == DocumentRef::Post(1))
            .unwrap();
        assert!(custom_page.custom_image);
        assert_eq!(
            site.posts[1].metadata[OG_IMAGE_KEY],
            json!("assets/images/posts/custom.jpg")
        );
    }

    #[test]
    fn test_apply_sets_every_eligible_document() {
        let mut site = sample_site();
        site.pages.push(page("feed", "/"));
        site.pages[2].ext = ".xml".into();

        let synthesis = derive(&site, Arc::from(""), &config()).unwrap();
        apply(&mut site, &synthesis.patches);

        assert_eq!(
            site.pages[0].metadata[OG_IMAGE_KEY],
            json!("assets/images/open-graph/about.png")
        );
        assert_eq!(
            site.posts[0].metadata[OG_IMAGE_KEY],
            json!("assets/images/open-graph/blog/hello-world.png")
        );
        // ineligible documents are left alone
        assert!(!site.pages[2].metadata.contains_key(OG_IMAGE_KEY));
    }

    #[test]
    fn test_generate_registers_pages_in_development() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config();
        with_stylesheet(&mut config, dir.path());
        let mut site = sample_site();

        let set = generate(&mut site, &EchoCompiler, &config, BuildMode::Development).unwrap();

        assert_eq!(set.len(), 6);
        assert_eq!(site.generated.len(), 6);
        assert!(site.generated.iter().all(|p| !p.sitemap));
        assert_eq!(&*set.pages[0].styles, ".card { color: red; }");
    }

    #[test]
    fn test_generate_production_keeps_metadata_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config();
        with_stylesheet(&mut config, dir.path());
        let mut site = sample_site();

        let set = generate(&mut site, &EchoCompiler, &config, BuildMode::Production).unwrap();

        assert_eq!(set.len(), 6);
        assert!(site.generated.is_empty());
        assert!(
            site.pages
                .iter()
                .chain(&site.posts)
                .all(|doc| doc.metadata.contains_key(OG_IMAGE_KEY))
        );
    }

    #[test]
    fn test_generate_missing_stylesheet_is_fatal() {
        let mut config = config();
        config.build.stylesheet = "/nonexistent/main.scss".into();
        let mut site = sample_site();

        let err = generate(&mut site, &EchoCompiler, &config, BuildMode::Development).unwrap_err();

        assert!(err.to_string().contains("Preview styles unavailable"));
        assert!(!site.posts[0].metadata.contains_key(OG_IMAGE_KEY));
    }

    #[test]
    fn test_generate_disabled() {
        let mut config = config();
        config.preview.enable = false;
        let mut site = sample_site();

        let set = generate(&mut site, &EchoCompiler, &config, BuildMode::Development).unwrap();
        assert!(set.is_empty());
    }
}
