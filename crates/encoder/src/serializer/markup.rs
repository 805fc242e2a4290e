//! HTML and XML markup sink.
//!
//! Emits tags, attributes and character data with the escaping each family
//! needs. Formatting (indentation, wrapping) is never added: output is the
//! tree's text as-is.

use super::{window, ContentSerializer, SerializerConfig};
use crate::error::EncodeError;
use crate::flags::EncoderFlags;
use crate::OutputBuffer;
use dom::{Document, NodeData, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

const LINK_ATTRIBUTES: &[&str] = &["href", "src", "action", "cite", "background", "longdesc"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Family {
    Html,
    Xml,
}

#[derive(Debug)]
pub struct MarkupSerializer {
    family: Family,
    flags: EncoderFlags,
    charset_name: &'static str,
    rewrite_encoding_declaration: bool,
    /// One entry per open element: whether its end tag must be suppressed
    /// (void element or XML self-closed element).
    open: Vec<bool>,
}

impl MarkupSerializer {
    pub fn html() -> Self {
        Self::new(Family::Html)
    }

    pub fn xml() -> Self {
        Self::new(Family::Xml)
    }

    fn new(family: Family) -> Self {
        Self {
            family,
            flags: EncoderFlags::empty(),
            charset_name: "UTF-8",
            rewrite_encoding_declaration: false,
            open: Vec::new(),
        }
    }

    fn is_raw_text_parent(&self, doc: &Document, node: NodeId) -> bool {
        if self.family != Family::Html {
            return false;
        }
        let Some(parent) = doc.parent(node) else {
            return false;
        };
        doc.is_any_element_of(parent, RAW_TEXT_ELEMENTS)
            || (doc.script_enabled() && doc.is_element_named(parent, "noscript"))
    }

    fn attribute_value<'v>(&self, doc: &Document, name: &str, value: &'v str) -> std::borrow::Cow<'v, str> {
        if self.flags.contains(EncoderFlags::OUTPUT_ABSOLUTE_LINKS)
            && LINK_ATTRIBUTES.iter().any(|a| name.eq_ignore_ascii_case(a))
            && let Some(base) = doc.base_url()
            && let Ok(resolved) = base.join(value.trim())
        {
            return std::borrow::Cow::Owned(resolved.into());
        }
        std::borrow::Cow::Borrowed(value)
    }

    fn push_escaped_text(&self, text: &str, out: &mut OutputBuffer) {
        for ch in text.chars() {
            match ch {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '\u{A0}' if self.family == Family::Html => out.push_str("&nbsp;"),
                _ => out.push(ch),
            }
        }
    }

    fn push_escaped_attribute(&self, value: &str, out: &mut OutputBuffer) {
        for ch in value.chars() {
            match ch {
                '&' => out.push_str("&amp;"),
                '"' => out.push_str("&quot;"),
                '<' if self.family == Family::Xml => out.push_str("&lt;"),
                '\u{A0}' if self.family == Family::Html => out.push_str("&nbsp;"),
                _ => out.push(ch),
            }
        }
    }
}

impl ContentSerializer for MarkupSerializer {
    fn init(&mut self, config: &SerializerConfig) -> bool {
        self.flags = config.flags;
        self.charset_name = config.charset.map(|e| e.name()).unwrap_or("UTF-8");
        self.rewrite_encoding_declaration = config.rewrite_encoding_declaration;
        self.open.clear();
        false
    }

    fn append_text(
        &mut self,
        doc: &Document,
        text: NodeId,
        start: u32,
        end: Option<u32>,
        out: &mut OutputBuffer,
    ) -> Result<(), EncodeError> {
        let data = window(doc.character_data(text).unwrap_or(""), start, end);
        if self.is_raw_text_parent(doc, text) {
            out.push_str(data);
        } else {
            self.push_escaped_text(data, out);
        }
        Ok(())
    }

    fn append_cdata_section(
        &mut self,
        doc: &Document,
        cdata: NodeId,
        start: u32,
        end: Option<u32>,
        out: &mut OutputBuffer,
    ) -> Result<(), EncodeError> {
        let data = window(doc.character_data(cdata).unwrap_or(""), start, end);
        out.push_str("<![CDATA[");
        out.push_str(data);
        out.push_str("]]>");
        Ok(())
    }

    fn append_processing_instruction(
        &mut self,
        doc: &Document,
        pi: NodeId,
        start: u32,
        end: Option<u32>,
        out: &mut OutputBuffer,
    ) -> Result<(), EncodeError> {
        let NodeData::ProcessingInstruction { target, data } = doc.data(pi) else {
            return Ok(());
        };
        out.push_str("<?");
        out.push_str(target);
        let data = window(data, start, end);
        if !data.is_empty() {
            out.push(' ');
            out.push_str(data);
        }
        out.push_str("?>");
        Ok(())
    }

    fn append_comment(
        &mut self,
        doc: &Document,
        comment: NodeId,
        start: u32,
        end: Option<u32>,
        out: &mut OutputBuffer,
    ) -> Result<(), EncodeError> {
        let data = window(doc.character_data(comment).unwrap_or(""), start, end);
        out.push_str("<!--");
        out.push_str(data);
        out.push_str("-->");
        Ok(())
    }

    fn append_doctype(
        &mut self,
        doc: &Document,
        doctype: NodeId,
        out: &mut OutputBuffer,
    ) -> Result<(), EncodeError> {
        let NodeData::DocumentType {
            name,
            public_id,
            system_id,
        } = doc.data(doctype)
        else {
            return Ok(());
        };
        out.push_str("<!DOCTYPE ");
        out.push_str(name);
        if !public_id.is_empty() {
            out.push_str(" PUBLIC \"");
            out.push_str(public_id);
            out.push('"');
            if !system_id.is_empty() {
                out.push_str(" \"");
                out.push_str(system_id);
                out.push('"');
            }
        } else if !system_id.is_empty() {
            out.push_str(" SYSTEM \"");
            out.push_str(system_id);
            out.push('"');
        }
        out.push('>');
        Ok(())
    }

    fn append_element_start(
        &mut self,
        doc: &Document,
        element: NodeId,
        _original: NodeId,
        out: &mut OutputBuffer,
    ) -> Result<(), EncodeError> {
        let Some(data) = doc.element(element) else {
            return Ok(());
        };
        out.push('<');
        out.push_str(&data.name);
        for (name, value) in &data.attributes {
            out.push(' ');
            out.push_str(name);
            match value {
                Some(value) => {
                    out.push_str("=\"");
                    let value = self.attribute_value(doc, name, value);
                    self.push_escaped_attribute(&value, out);
                    out.push('"');
                }
                None if self.family == Family::Xml => out.push_str("=\"\""),
                None => {}
            }
        }

        let suppress_end = match self.family {
            Family::Html => VOID_ELEMENTS.contains(&data.name.as_str()),
            Family::Xml => doc.first_child_of_template_or_node(element).is_none(),
        };
        if suppress_end && self.family == Family::Xml {
            out.push_str("/>");
        } else {
            out.push('>');
        }
        self.open.push(suppress_end);
        Ok(())
    }

    fn append_element_end(
        &mut self,
        doc: &Document,
        element: NodeId,
        _original: NodeId,
        out: &mut OutputBuffer,
    ) -> Result<(), EncodeError> {
        let Some(name) = doc.element_name(element) else {
            return Ok(());
        };
        let suppress_end = match self.open.pop() {
            Some(suppress) => suppress,
            // End without a start (context closed by an outer caller).
            None => self.family == Family::Html && VOID_ELEMENTS.contains(&name),
        };
        if !suppress_end {
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        Ok(())
    }

    fn append_document_start(
        &mut self,
        doc: &Document,
        out: &mut OutputBuffer,
    ) -> Result<(), EncodeError> {
        if self.family == Family::Xml && !doc.is_html() && self.rewrite_encoding_declaration {
            out.push_str("<?xml version=\"1.0\" encoding=\"");
            out.push_str(self.charset_name);
            out.push_str("\"?>\n");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(flags: EncoderFlags) -> SerializerConfig {
        SerializerConfig {
            flags,
            wrap_column: 72,
            charset: None,
            is_copying: false,
            rewrite_encoding_declaration: true,
        }
    }

    #[test]
    fn html_escapes_and_skips_void_end_tags() {
        let mut doc = Document::new_html();
        let p = doc.create_element_with_attributes(
            "p",
            vec![("title".into(), Some("a\"b".into())), ("hidden".into(), None)],
        );
        doc.append_child(Document::ROOT, p).unwrap();
        let t = doc.append_text(p, "1 < 2 & 3").unwrap();
        let br = doc.append_element(p, "br").unwrap();

        let mut sink = MarkupSerializer::html();
        sink.init(&config(EncoderFlags::empty()));
        let mut out = OutputBuffer::new();
        sink.append_element_start(&doc, p, p, &mut out).unwrap();
        sink.append_text(&doc, t, 0, None, &mut out).unwrap();
        sink.append_element_start(&doc, br, br, &mut out).unwrap();
        sink.append_element_end(&doc, br, br, &mut out).unwrap();
        sink.append_element_end(&doc, p, p, &mut out).unwrap();
        assert_eq!(
            out.as_str(),
            "<p title=\"a&quot;b\" hidden>1 &lt; 2 &amp; 3<br></p>"
        );
    }

    #[test]
    fn script_text_is_raw() {
        let mut doc = Document::new_html();
        let script = doc.append_element(Document::ROOT, "script").unwrap();
        let t = doc.append_text(script, "a < b").unwrap();
        let mut sink = MarkupSerializer::html();
        sink.init(&config(EncoderFlags::empty()));
        let mut out = OutputBuffer::new();
        sink.append_text(&doc, t, 0, None, &mut out).unwrap();
        assert_eq!(out.as_str(), "a < b");
    }

    #[test]
    fn xml_self_closes_empty_elements_and_writes_declaration() {
        let mut doc = Document::new_xml();
        let root = doc.append_element(Document::ROOT, "root").unwrap();
        let leaf = doc.append_element(root, "leaf").unwrap();
        let mut sink = MarkupSerializer::xml();
        sink.init(&config(EncoderFlags::empty()));
        let mut out = OutputBuffer::new();
        sink.append_document_start(&doc, &mut out).unwrap();
        sink.append_element_start(&doc, root, root, &mut out).unwrap();
        sink.append_element_start(&doc, leaf, leaf, &mut out).unwrap();
        sink.append_element_end(&doc, leaf, leaf, &mut out).unwrap();
        sink.append_element_end(&doc, root, root, &mut out).unwrap();
        assert_eq!(
            out.as_str(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root><leaf/></root>"
        );
    }

    #[test]
    fn links_resolve_against_base_url() {
        let mut doc = Document::new_html();
        doc.set_base_url(url::Url::parse("https://example.com/dir/page.html").ok());
        let a = doc.create_element_with_attributes("a", vec![("href".into(), Some("../x".into()))]);
        doc.append_child(Document::ROOT, a).unwrap();
        let mut sink = MarkupSerializer::html();
        sink.init(&config(EncoderFlags::OUTPUT_ABSOLUTE_LINKS));
        let mut out = OutputBuffer::new();
        sink.append_element_start(&doc, a, a, &mut out).unwrap();
        assert_eq!(out.as_str(), "<a href=\"https://example.com/x\">");
    }
}
