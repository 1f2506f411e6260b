//! Wraps bare content images in a link to the full-size image.
//!
//! ```html
//! <main><img src="/a.png"></main>
//! <!-- becomes -->
//! <main><a href="/a.png" class="border d-block text-center"><img src="/a.png"><span class="d-inline-block py-3">Click to expand</span></a></main>
//! ```

use super::HtmlTransformer;
use super::markup::{
    ElementStack, HtmlReader, XmlWriter, attr_value, create_xml_writer, into_string, prepare,
    tag_name, write_text_element,
};
use crate::config::TransformConfig;
use anyhow::{Result, bail};
use quick_xml::events::{BytesEnd, BytesStart, Event};

const LINK_CLASS: &str = "border d-block text-center";
const LABEL_CLASS: &str = "d-inline-block py-3";

#[derive(Debug, Clone)]
pub struct ImageLinker {
    region: Vec<u8>,
    label: String,
}

impl ImageLinker {
    pub fn new(region: &str, label: &str) -> Self {
        Self {
            region: region.to_ascii_lowercase().into_bytes(),
            label: label.to_owned(),
        }
    }

    pub fn from_config(config: &TransformConfig) -> Self {
        Self::new(&config.content_region, &config.expand_label)
    }

    /// Link target for `elem`, if it is an image that should be wrapped.
    fn link_target(&self, name: &[u8], elem: &BytesStart<'_>, stack: &ElementStack) -> Option<String> {
        if name != b"img" || !stack.within(&self.region) || stack.parent() == Some(b"a") {
            return None;
        }
        attr_value(elem, b"src").filter(|src| !src.trim().is_empty())
    }

    fn write_linked(&self, writer: &mut XmlWriter, image: Event<'_>, src: &str) -> Result<()> {
        let mut anchor = BytesStart::new("a");
        anchor.push_attribute(("href", src));
        anchor.push_attribute(("class", LINK_CLASS));

        writer.write_event(Event::Start(anchor))?;
        writer.write_event(image)?;
        write_text_element(writer, "span", &[("class", LABEL_CLASS)], &self.label)?;
        writer.write_event(Event::End(BytesEnd::new("a")))?;
        Ok(())
    }
}

impl Default for ImageLinker {
    fn default() -> Self {
        Self::from_config(&TransformConfig::default())
    }
}

impl HtmlTransformer for ImageLinker {
    fn name(&self) -> &'static str {
        "image links"
    }

    fn try_transform(&self, html: &str) -> Result<String> {
        let prepared = prepare(html);
        let mut reader = HtmlReader::new(&prepared);
        let mut writer = create_xml_writer(html.len() + 256);
        let mut stack = ElementStack::default();
        let mut linked = 0;

        loop {
            match reader.read_event() {
                Ok(Event::Start(elem)) => {
                    let name = tag_name(&elem);
                    if let Some(src) = self.link_target(&name, &elem, &stack) {
                        self.write_linked(&mut writer, Event::Start(elem), &src)?;
                        linked += 1;
                    } else {
                        writer.write_event(Event::Start(elem))?;
                        stack.push(name);
                    }
                }
                Ok(Event::Empty(elem)) => {
                    let name = tag_name(&elem);
                    match self.link_target(&name, &elem, &stack) {
                        Some(src) => {
                            self.write_linked(&mut writer, Event::Empty(elem), &src)?;
                            linked += 1;
                        }
                        None => writer.write_event(Event::Empty(elem))?,
                    }
                }
                Ok(Event::End(elem)) => {
                    stack.pop(elem.name().as_ref());
                    writer.write_event(Event::End(elem))?;
                }
                Ok(Event::Eof) => break,
                Ok(event) => writer.write_event(event)?,
                Err(e) => bail!("HTML parse error at position {}: {e}", reader.error_position()),
            }
        }

        if linked == 0 {
            return Ok(html.to_owned());
        }
        into_string(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(html: &str) -> String {
        ImageLinker::default().transform(html)
    }

    #[test]
    fn test_wraps_content_image() {
        let html = r#"<main><p><img src="/img/a.png" alt="A"></p></main>"#;
        assert_eq!(
            link(html),
            concat!(
                r#"<main><p><a href="/img/a.png" class="border d-block text-center">"#,
                r#"<img src="/img/a.png" alt="A">"#,
                r#"<span class="d-inline-block py-3">Click to expand</span></a></p></main>"#
            )
        );
    }

    #[test]
    fn test_self_closing_image() {
        let html = r#"<main><img src="a.png"/></main>"#;
        let out = link(html);
        assert!(out.contains(r#"<a href="a.png" class="border d-block text-center"><img src="a.png"/>"#));
    }

    #[test]
    fn test_idempotent() {
        let html = r#"<body><main><h2 id="x">X</h2><img src="a.png"><img src="b.png?w=1&amp;h=2"></main></body>"#;
        let once = link(html);
        let twice = link(&once);

        assert_ne!(once, html);
        assert_eq!(once, twice);
        assert!(once.contains(r#"href="b.png?w=1&amp;h=2""#));
    }

    #[test]
    fn test_ignores_images_outside_region() {
        let html = r#"<header><img src="logo.svg"></header><main></main><footer><img src="x.png"></footer>"#;
        assert_eq!(link(html), html);
    }

    #[test]
    fn test_keeps_existing_links() {
        let html = r#"<main><a href="/post"><img src="thumb.png"></a></main>"#;
        assert_eq!(link(html), html);
    }

    #[test]
    fn test_skips_images_without_src() {
        let html = r#"<main><img alt="x"><img src=""><img src="  "></main>"#;
        assert_eq!(link(html), html);
    }

    #[test]
    fn test_script_content_untouched() {
        let html = r#"<main><script>if (a < b) { el.innerHTML = "<img src='x'>"; }</script></main>"#;
        assert_eq!(link(html), html);
    }

    #[test]
    fn test_wraps_image_after_script_with_operators() {
        let html = r#"<main><script>for (let i = 0; i<n && ok; i++) {}</script><img src="a.png"></main>"#;
        let out = link(html);

        assert!(out.contains("<script>for (let i = 0; i<n && ok; i++) {}</script>"));
        assert!(out.contains(r#"<a href="a.png" class="border d-block text-center"><img src="a.png">"#));
    }

    #[test]
    fn test_wraps_image_after_bare_ampersand() {
        let html = r#"<main><p>Q&A time</p><img src="a.png"></main>"#;
        let out = link(html);

        assert!(out.contains("<p>Q&amp;A time</p>"));
        assert!(out.contains(r#"<a href="a.png" class="border d-block text-center">"#));
        assert_eq!(link(&out), out);
    }

    #[test]
    fn test_unchanged_document_is_byte_identical() {
        let html = "<main><p>Q&A, 1 < 2</p><style>a>b{}</style></main>";
        assert_eq!(link(html), html);
    }

    #[test]
    fn test_custom_region_and_label() {
        let linker = ImageLinker::new("article", "Open");
        let out = linker.transform(r#"<article><img src="a.png"></article>"#);
        assert!(out.contains(r#"<span class="d-inline-block py-3">Open</span>"#));
    }

    #[test]
    fn test_unparseable_passthrough() {
        let html = r#"<main><p>text</p><img src="a.png""#;
        assert!(ImageLinker::default().try_transform(html).is_err());
        assert_eq!(link(html), html);
    }
}
