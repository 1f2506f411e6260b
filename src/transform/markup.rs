//! Shared quick-xml plumbing for the html rewriters.
//!
//! quick-xml is an xml reader, so html goes through [`prepare`] first:
//!
//! ```text
//! html ──► prepare() ──► markup (xml-safe) + raw-text bodies
//!                              │
//!                              ▼
//!                        HtmlReader ──► events, bodies re-inserted verbatim
//! ```
//!
//! The bodies of `script`, `style`, `textarea` and `title` never reach the
//! parser. In text, a bare `&` or a `<` that opens no tag becomes an escape.
//! Tags, comments and references are copied unchanged.

use anyhow::Result;
use quick_xml::{
    Reader, Writer,
    events::{BytesEnd, BytesStart, BytesText, Event},
};
use std::{io::Cursor, slice, str};

pub type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Html elements that never have a closing tag.
const VOID_ELEMENTS: &[&[u8]] = &[
    b"area", b"base", b"br", b"col", b"embed", b"hr", b"img", b"input", b"link", b"meta",
    b"param", b"source", b"track", b"wbr",
];

/// Elements whose content is not markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Longest reference name considered, `&` and `;` excluded.
const MAX_REFERENCE_LEN: usize = 32;

#[inline]
pub fn create_xml_writer(capacity: usize) -> XmlWriter {
    Writer::new(Cursor::new(Vec::with_capacity(capacity)))
}

/// Finish writing and return the document as a string.
pub fn into_string(writer: XmlWriter) -> Result<String> {
    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

/// Lowercased tag name.
#[inline]
pub fn tag_name(elem: &BytesStart<'_>) -> Vec<u8> {
    elem.name().as_ref().to_ascii_lowercase()
}

#[inline]
pub fn is_void(name: &[u8]) -> bool {
    VOID_ELEMENTS.contains(&name)
}

#[inline]
pub fn is_heading(name: &[u8]) -> bool {
    matches!(name, b"h1" | b"h2" | b"h3" | b"h4" | b"h5" | b"h6")
}

#[inline]
pub fn is_raw_text(name: &[u8]) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|raw| raw.as_bytes() == name)
}

/// Decoded value of an attribute, tolerating html-style attributes.
pub fn attr_value(elem: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    elem.html_attributes()
        .flatten()
        .find(|attr| attr.key.as_ref().eq_ignore_ascii_case(key))
        .map(|attr| decode(&attr.value))
}

/// Text with every html character reference decoded.
pub fn decode(raw: &[u8]) -> String {
    let raw = String::from_utf8_lossy(raw);
    html_escape::decode_html_entities(&raw).into_owned()
}

/// Text of a reference such as `amp`, `rsquo` or `#x26`. Unknown names stay literal.
pub fn resolve_reference(name: &str) -> String {
    html_escape::decode_html_entities(&format!("&{name};")).into_owned()
}

/// Write a text element with attributes: `<tag k="v">text</tag>`.
pub fn write_text_element(
    writer: &mut XmlWriter,
    tag: &str,
    attrs: &[(&str, &str)],
    text: &str,
) -> Result<()> {
    let mut elem = BytesStart::new(tag);
    for (k, v) in attrs {
        elem.push_attribute((*k, *v));
    }
    writer.write_event(Event::Start(elem))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

// ============================================================================
// Html Preparation
// ============================================================================

/// An html document split into xml-safe markup and raw-text bodies.
#[derive(Debug, Default, PartialEq)]
pub struct Prepared {
    markup: String,
    bodies: Vec<String>,
}

/// Make `html` readable by quick-xml without changing its meaning.
pub fn prepare(html: &str) -> Prepared {
    let mut prepared = Prepared {
        markup: String::with_capacity(html.len() + 16),
        bodies: Vec::new(),
    };
    let out = &mut prepared.markup;
    let mut rest = html;

    while let Some(pos) = rest.find(['<', '&']) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if let Some(after) = rest.strip_prefix('&') {
            out.push_str(if is_reference(after) { "&" } else { "&amp;" });
            rest = after;
            continue;
        }

        let len = if rest.starts_with("<!--") {
            rest.find("-->").map_or(rest.len(), |i| i + 3)
        } else if rest.starts_with("<![CDATA[") {
            rest.find("]]>").map_or(rest.len(), |i| i + 3)
        } else if opens_tag(rest) {
            tag_len(rest)
        } else {
            out.push_str("&lt;");
            rest = &rest[1..];
            continue;
        };

        let (tag, after) = rest.split_at(len);
        out.push_str(tag);
        rest = after;

        if let Some(name) = raw_text_start(tag)
            && !tag.ends_with("/>")
        {
            let close = find_end_tag(rest, name).unwrap_or(rest.len());
            prepared.bodies.push(rest[..close].to_owned());
            rest = &rest[close..];
        }
    }

    out.push_str(rest);
    prepared
}

/// Whether `s` (just after `&`) starts a terminated character reference.
fn is_reference(s: &str) -> bool {
    let Some(end) = s.bytes().take(MAX_REFERENCE_LEN + 1).position(|b| b == b';') else {
        return false;
    };
    let name = &s.as_bytes()[..end];
    match name {
        [b'#', b'x' | b'X', hex @ ..] => !hex.is_empty() && hex.iter().all(u8::is_ascii_hexdigit),
        [b'#', dec @ ..] => !dec.is_empty() && dec.iter().all(u8::is_ascii_digit),
        [first, tail @ ..] => {
            first.is_ascii_alphabetic() && tail.iter().all(u8::is_ascii_alphanumeric)
        }
        [] => false,
    }
}

/// `<` followed by a tag name, `/`, `!` or `?`.
fn opens_tag(s: &str) -> bool {
    s.as_bytes()
        .get(1)
        .is_some_and(|b| b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?'))
}

/// Length of the tag at the start of `s`, through its `>`. Quoted values may contain `>`.
fn tag_len(s: &str) -> usize {
    let mut quote = None;
    for (i, b) in s.bytes().enumerate().skip(1) {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return i + 1,
            _ => {}
        }
    }
    s.len()
}

/// Raw-text element name of a start tag, e.g. `script` for `<SCRIPT src=x>`.
fn raw_text_start(tag: &str) -> Option<&'static str> {
    let body = tag.strip_prefix('<')?;
    RAW_TEXT_ELEMENTS.iter().copied().find(|name| {
        body.get(..name.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(name))
            && body[name.len()..].starts_with(|c: char| c == '>' || c == '/' || c.is_ascii_whitespace())
    })
}

/// Offset of the `</name` end tag in `s`.
fn find_end_tag(s: &str, name: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(i) = s[from..].find("</") {
        let at = from + i;
        let tail = &s[at + 2..];
        if tail.get(..name.len()).is_some_and(|head| head.eq_ignore_ascii_case(name))
            && tail[name.len()..].starts_with(|c: char| c == '>' || c.is_ascii_whitespace())
        {
            return Some(at);
        }
        from = at + 2;
    }
    None
}

// ============================================================================
// Html Reader
// ============================================================================

/// Event reader over prepared html. Raw-text bodies come back as text events.
pub struct HtmlReader<'a> {
    reader: Reader<&'a [u8]>,
    bodies: slice::Iter<'a, String>,
    pending: Option<&'a str>,
}

impl<'a> HtmlReader<'a> {
    pub fn new(prepared: &'a Prepared) -> Self {
        let mut reader = Reader::from_reader(prepared.markup.as_bytes());
        reader.config_mut().trim_text(false);
        reader.config_mut().enable_all_checks(false);
        Self {
            reader,
            bodies: prepared.bodies.iter(),
            pending: None,
        }
    }

    pub fn read_event(&mut self) -> Result<Event<'a>, quick_xml::Error> {
        if let Some(body) = self.pending.take() {
            return Ok(Event::Text(BytesText::from_escaped(body)));
        }
        let event = self.reader.read_event()?;
        if let Event::Start(elem) = &event
            && is_raw_text(&tag_name(elem))
        {
            self.pending = self
                .bodies
                .next()
                .map(String::as_str)
                .filter(|body| !body.is_empty());
        }
        Ok(event)
    }

    pub fn error_position(&self) -> u64 {
        self.reader.error_position()
    }
}

// ============================================================================
// Element Stack
// ============================================================================

/// Open elements from the root to the current position.
#[derive(Debug, Default)]
pub struct ElementStack {
    open: Vec<Vec<u8>>,
}

impl ElementStack {
    /// Track a start tag. Void elements are ignored.
    pub fn push(&mut self, name: Vec<u8>) {
        if !is_void(&name) {
            self.open.push(name);
        }
    }

    /// Close the innermost open element named `name` and everything inside it.
    /// Stray end tags are ignored.
    pub fn pop(&mut self, name: &[u8]) {
        let name = name.to_ascii_lowercase();
        if let Some(pos) = self.open.iter().rposition(|open| *open == name) {
            self.open.truncate(pos);
        }
    }

    pub fn parent(&self) -> Option<&[u8]> {
        self.open.last().map(Vec::as_slice)
    }

    pub fn within(&self, name: &[u8]) -> bool {
        self.open.iter().any(|open| open == name)
    }
}
