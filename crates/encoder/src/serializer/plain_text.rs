//! Plain-text sink: character data only, with line breaks at block
//! boundaries.

use super::{window, ContentSerializer, SerializerConfig};
use crate::error::EncodeError;
use crate::flags::EncoderFlags;
use crate::OutputBuffer;
use dom::{Document, NodeId};
use tools::whitespace;

const PREFORMATTED_ELEMENTS: &[&str] = &["pre", "textarea", "listing", "xmp", "plaintext"];
const IGNORED_ELEMENTS: &[&str] = &["script", "style", "head", "title", "template"];

#[derive(Debug, Default)]
pub struct PlainTextSerializer {
    flags: EncoderFlags,
    wrap_column: u32,
    /// One entry per scanned element: whether text under it is preformatted.
    preformat: Vec<bool>,
    ignored_depth: u32,
    pending_breaks: u32,
    pending_space: bool,
    pending_tab: bool,
    cell_in_row: bool,
    wrote_any: bool,
    line_len: u32,
}

impl PlainTextSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_ignored(&self, doc: &Document, element: NodeId) -> bool {
        doc.is_any_element_of(element, IGNORED_ELEMENTS)
            || (doc.is_element_named(element, "noscript")
                && !self.flags.contains(EncoderFlags::OUTPUT_NO_SCRIPT_CONTENT))
    }

    fn is_preformatted(&self) -> bool {
        self.flags.contains(EncoderFlags::OUTPUT_PREFORMATTED)
            || self.preformat.last().copied().unwrap_or(false)
    }

    fn request_break(&mut self) {
        self.pending_breaks = self.pending_breaks.max(1);
        self.pending_space = false;
    }

    /// Write pending separators before new content. Nothing is written before
    /// the first content, so output never starts with a break.
    fn emit_pending(&mut self, out: &mut OutputBuffer) {
        if !self.wrote_any {
            self.pending_breaks = 0;
            self.pending_space = false;
            self.pending_tab = false;
            return;
        }
        if self.pending_breaks > 0 {
            for _ in 0..self.pending_breaks {
                out.push('\n');
            }
            self.line_len = 0;
            self.pending_space = false;
        }
        if self.pending_tab {
            out.push('\t');
            self.line_len += 1;
            self.pending_space = false;
        }
        self.pending_breaks = 0;
        self.pending_tab = false;
    }

    fn push_preformatted(&mut self, text: &str, out: &mut OutputBuffer) {
        if text.is_empty() {
            return;
        }
        self.emit_pending(out);
        if self.pending_space {
            out.push(' ');
            self.pending_space = false;
        }
        out.push_str(text);
        match text.rfind('\n') {
            Some(pos) => self.line_len = text[pos + 1..].chars().count() as u32,
            None => self.line_len += text.chars().count() as u32,
        }
        self.wrote_any = true;
    }

    fn push_collapsed(&mut self, text: &str, out: &mut OutputBuffer) {
        let (collapsed, leading, trailing) = whitespace::collapse(text);
        if collapsed.is_empty() {
            if (leading || trailing) && self.wrote_any {
                self.pending_space = true;
            }
            return;
        }
        if leading {
            self.pending_space = true;
        }
        self.emit_pending(out);

        let wrap = self.flags.contains(EncoderFlags::OUTPUT_WRAP) && self.wrap_column > 0;
        for (i, word) in collapsed.split(' ').enumerate() {
            let word_len = word.chars().count() as u32;
            let separated = i > 0 || (self.pending_space && self.line_len > 0);
            if wrap && self.line_len > 0 && self.line_len + 1 + word_len > self.wrap_column {
                out.push('\n');
                self.line_len = 0;
            } else if separated {
                out.push(' ');
                self.line_len += 1;
            }
            self.pending_space = false;
            for ch in word.chars() {
                out.push(if ch == '\u{A0}' { ' ' } else { ch });
            }
            self.line_len += word_len;
        }
        self.wrote_any = true;
        self.pending_space = trailing;
    }

    fn append_character_data(
        &mut self,
        doc: &Document,
        node: NodeId,
        start: u32,
        end: Option<u32>,
        out: &mut OutputBuffer,
    ) {
        if self.ignored_depth > 0 {
            return;
        }
        let data = window(doc.character_data(node).unwrap_or(""), start, end);
        if self.is_preformatted() {
            self.push_preformatted(data, out);
        } else {
            self.push_collapsed(data, out);
        }
    }

    fn reset_pending(&mut self) {
        self.pending_breaks = 0;
        self.pending_space = false;
        self.pending_tab = false;
    }
}

impl ContentSerializer for PlainTextSerializer {
    fn init(&mut self, config: &SerializerConfig) -> bool {
        *self = Self {
            flags: config.flags,
            wrap_column: config.wrap_column,
            ..Self::default()
        };
        true
    }

    fn append_text(
        &mut self,
        doc: &Document,
        text: NodeId,
        start: u32,
        end: Option<u32>,
        out: &mut OutputBuffer,
    ) -> Result<(), EncodeError> {
        self.append_character_data(doc, text, start, end, out);
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
        self.append_character_data(doc, cdata, start, end, out);
        Ok(())
    }

    fn append_processing_instruction(
        &mut self,
        _doc: &Document,
        _pi: NodeId,
        _start: u32,
        _end: Option<u32>,
        _out: &mut OutputBuffer,
    ) -> Result<(), EncodeError> {
        Ok(())
    }

    fn append_comment(
        &mut self,
        _doc: &Document,
        _comment: NodeId,
        _start: u32,
        _end: Option<u32>,
        _out: &mut OutputBuffer,
    ) -> Result<(), EncodeError> {
        Ok(())
    }

    fn append_doctype(
        &mut self,
        _doc: &Document,
        _doctype: NodeId,
        _out: &mut OutputBuffer,
    ) -> Result<(), EncodeError> {
        Ok(())
    }

    fn append_element_start(
        &mut self,
        doc: &Document,
        element: NodeId,
        _original: NodeId,
        _out: &mut OutputBuffer,
    ) -> Result<(), EncodeError> {
        if self.is_ignored(doc, element) {
            self.ignored_depth += 1;
            return Ok(());
        }
        if self.ignored_depth > 0 {
            return Ok(());
        }
        match doc.element_name(element) {
            Some("br") => {
                self.pending_breaks += 1;
                self.pending_space = false;
            }
            Some("td" | "th") => {
                if self.cell_in_row {
                    self.pending_tab = true;
                    self.pending_space = false;
                }
                self.cell_in_row = true;
            }
            Some("tr") => {
                self.cell_in_row = false;
                self.request_break();
            }
            _ if doc.is_block_element(element) => self.request_break(),
            _ => {}
        }
        Ok(())
    }

    fn append_element_end(
        &mut self,
        doc: &Document,
        element: NodeId,
        _original: NodeId,
        _out: &mut OutputBuffer,
    ) -> Result<(), EncodeError> {
        if self.is_ignored(doc, element) {
            self.ignored_depth = self.ignored_depth.saturating_sub(1);
            return Ok(());
        }
        if self.ignored_depth > 0 {
            return Ok(());
        }
        match doc.element_name(element) {
            Some("td" | "th" | "br") => {}
            Some("tr") => {
                self.cell_in_row = false;
                self.request_break();
            }
            _ if doc.is_block_element(element) => self.request_break(),
            _ => {}
        }
        Ok(())
    }

    fn append_document_start(
        &mut self,
        _doc: &Document,
        _out: &mut OutputBuffer,
    ) -> Result<(), EncodeError> {
        Ok(())
    }

    fn scan_element_for_preformat(&mut self, doc: &Document, element: NodeId) {
        let preformatted = doc
            .inclusive_ancestors(element)
            .into_iter()
            .any(|ancestor| doc.is_any_element_of(ancestor, PREFORMATTED_ELEMENTS));
        self.preformat.push(preformatted);
    }

    fn forget_element_for_preformat(&mut self, _doc: &Document, _element: NodeId) {
        self.preformat.pop();
    }

    fn flush_and_finish(&mut self, _out: &mut OutputBuffer) -> Result<(), EncodeError> {
        self.reset_pending();
        Ok(())
    }

    fn finish(&mut self, _out: &mut OutputBuffer) -> Result<(), EncodeError> {
        self.reset_pending();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(flags: EncoderFlags, wrap_column: u32) -> SerializerConfig {
        SerializerConfig {
            flags,
            wrap_column,
            charset: None,
            is_copying: false,
            rewrite_encoding_declaration: false,
        }
    }

    fn walk(doc: &Document, sink: &mut PlainTextSerializer, node: NodeId, out: &mut OutputBuffer) {
        if doc.is_element(node) {
            sink.scan_element_for_preformat(doc, node);
            sink.append_element_start(doc, node, node, out).unwrap();
        } else if doc.is_text(node) {
            sink.append_text(doc, node, 0, None, out).unwrap();
        }
        for child in doc.children(node) {
            walk(doc, sink, child, out);
        }
        if doc.is_element(node) {
            sink.append_element_end(doc, node, node, out).unwrap();
            sink.forget_element_for_preformat(doc, node);
        }
    }

    fn render(doc: &Document, flags: EncoderFlags, wrap_column: u32) -> String {
        let mut sink = PlainTextSerializer::new();
        assert!(sink.init(&config(flags, wrap_column)));
        let mut out = OutputBuffer::new();
        walk(doc, &mut sink, Document::ROOT, &mut out);
        sink.flush_and_finish(&mut out).unwrap();
        out.into_string()
    }

    #[test]
    fn blocks_break_lines_without_leading_or_trailing_breaks() {
        let mut doc = Document::new_html();
        let div = doc.append_element(Document::ROOT, "div").unwrap();
        let p1 = doc.append_element(div, "p").unwrap();
        doc.append_text(p1, "  one\n two ").unwrap();
        let p2 = doc.append_element(div, "p").unwrap();
        doc.append_text(p2, "three").unwrap();
        doc.append_element(p2, "br").unwrap();
        doc.append_text(p2, "four").unwrap();
        assert_eq!(render(&doc, EncoderFlags::empty(), 72), "one two\nthree\nfour");
    }

    #[test]
    fn script_dropped_and_pre_kept_verbatim() {
        let mut doc = Document::new_html();
        let body = doc.append_element(Document::ROOT, "body").unwrap();
        let script = doc.append_element(body, "script").unwrap();
        doc.append_text(script, "var x;").unwrap();
        let pre = doc.append_element(body, "pre").unwrap();
        doc.append_text(pre, "a  b\n c").unwrap();
        assert_eq!(render(&doc, EncoderFlags::empty(), 72), "a  b\n c");
    }

    #[test]
    fn cells_are_tab_separated() {
        let mut doc = Document::new_html();
        let table = doc.append_element(Document::ROOT, "table").unwrap();
        for row in [["a", "b"], ["c", "d"]] {
            let tr = doc.append_element(table, "tr").unwrap();
            for cell in row {
                let td = doc.append_element(tr, "td").unwrap();
                doc.append_text(td, cell).unwrap();
            }
        }
        assert_eq!(render(&doc, EncoderFlags::empty(), 72), "a\tb\nc\td");
    }

    #[test]
    fn wraps_at_column() {
        let mut doc = Document::new_html();
        let p = doc.append_element(Document::ROOT, "p").unwrap();
        doc.append_text(p, "aaa bbb ccc ddd").unwrap();
        assert_eq!(render(&doc, EncoderFlags::OUTPUT_WRAP, 8), "aaa bbb\nccc ddd");
    }
}
