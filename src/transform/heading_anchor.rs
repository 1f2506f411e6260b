//! Self links for content headings.
//!
//! ```html
//! <h2 id="headline-1">Headline 1</h2>
//! <!-- becomes -->
//! <h2 id="headline-1"><a class="anchor-link" href="#headline-1" aria-label="Headline 1">#</a>Headline 1</h2>
//! ```

use super::HtmlTransformer;
use super::markup::{
    ElementStack, HtmlReader, XmlWriter, attr_value, create_xml_writer, decode, into_string,
    is_heading, is_raw_text, prepare, resolve_reference, tag_name, write_text_element,
};
use crate::config::TransformConfig;
use anyhow::{Result, bail};
use quick_xml::events::{BytesStart, Event};

const ANCHOR_CLASS: &str = "anchor-link";

#[derive(Debug, Clone)]
pub struct HeadingAnchorer {
    region: Vec<u8>,
}

/// A heading element read up to and including its end tag.
struct Heading<'a> {
    start: BytesStart<'a>,
    id: String,
    children: Vec<Event<'a>>,
}

impl Heading<'_> {
    /// Text content with whitespace collapsed. Script and style bodies are not text.
    fn label(&self) -> String {
        let mut text = String::new();
        let mut in_raw = false;
        for event in &self.children {
            match event {
                Event::Start(e) if is_raw_text(&tag_name(e)) => in_raw = true,
                Event::End(e) if is_raw_text(&e.name().as_ref().to_ascii_lowercase()) => in_raw = false,
                _ if in_raw => {}
                Event::Text(t) => text.push_str(&decode(t)),
                Event::GeneralRef(r) => text.push_str(&resolve_reference(&String::from_utf8_lossy(r))),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(c)),
                _ => {}
            }
        }

        let label = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if label.is_empty() { self.id.clone() } else { label }
    }

    fn has_self_link(&self) -> bool {
        let target = format!("#{}", self.id);
        self.children.iter().any(|event| match event {
            Event::Start(e) | Event::Empty(e) => {
                tag_name(e) == b"a" && attr_value(e, b"href").as_deref() == Some(target.as_str())
            }
            _ => false,
        })
    }

    /// Write the heading back. Returns whether a self link was inserted.
    fn write(self, writer: &mut XmlWriter) -> Result<bool> {
        let end = self.start.to_end().into_owned();
        let anchor = (!self.has_self_link()).then(|| self.label());
        let inserted = anchor.is_some();

        writer.write_event(Event::Start(self.start))?;
        if let Some(label) = anchor {
            let href = format!("#{}", self.id);
            write_text_element(
                writer,
                "a",
                &[("class", ANCHOR_CLASS), ("href", &href), ("aria-label", &label)],
                "#",
            )?;
        }
        for event in self.children {
            writer.write_event(event)?;
        }
        writer.write_event(Event::End(end))?;
        Ok(inserted)
    }
}

impl HeadingAnchorer {
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_ascii_lowercase().into_bytes(),
        }
    }

    pub fn from_config(config: &TransformConfig) -> Self {
        Self::new(&config.content_region)
    }
}

impl Default for HeadingAnchorer {
    fn default() -> Self {
        Self::from_config(&TransformConfig::default())
    }
}

/// Read the rest of a heading whose start tag was just consumed.
fn read_heading<'a>(reader: &mut HtmlReader<'a>, start: BytesStart<'a>, id: String) -> Result<Heading<'a>> {
    let name = tag_name(&start);
    let mut depth = 0usize;
    let mut children = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if tag_name(&e) == name => {
                depth += 1;
                children.push(Event::Start(e));
            }
            Ok(Event::End(e)) if e.name().as_ref().eq_ignore_ascii_case(&name) => {
                if depth == 0 {
                    return Ok(Heading { start, id, children });
                }
                depth -= 1;
                children.push(Event::End(e));
            }
            Ok(Event::Eof) => bail!("unclosed <{}> heading", String::from_utf8_lossy(&name)),
            Ok(event) => children.push(event),
            Err(e) => bail!("HTML parse error at position {}: {e}", reader.error_position()),
        }
    }
}

impl HtmlTransformer for HeadingAnchorer {
    fn name(&self) -> &'static str {
        "heading anchors"
    }

    fn try_transform(&self, html: &str) -> Result<String> {
        let prepared = prepare(html);
        let mut reader = HtmlReader::new(&prepared);
        let mut writer = create_xml_writer(html.len() + 256);
        let mut stack = ElementStack::default();
        let mut anchored = 0;

        loop {
            match reader.read_event() {
                Ok(Event::Start(elem)) => {
                    let name = tag_name(&elem);
                    let id = attr_value(&elem, b"id").filter(|id| !id.trim().is_empty());
                    match id {
                        Some(id) if is_heading(&name) && stack.within(&self.region) => {
                            if read_heading(&mut reader, elem, id)?.write(&mut writer)? {
                                anchored += 1;
                            }
                        }
                        _ => {
                            writer.write_event(Event::Start(elem))?;
                            stack.push(name);
                        }
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

        if anchored == 0 {
            return Ok(html.to_owned());
        }
        into_string(writer)
    }
}
