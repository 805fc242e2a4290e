//! Encoder orchestration: scope selection, sink lifecycle and the public
//! entry points.

use crate::context::{NoRangeContext, RangeContextSerializer, RangeNodeContext};
use crate::error::EncodeError;
use crate::fixup::NodeFixup;
use crate::flags::EncoderFlags;
use crate::mime::{self, OutputFormat};
use crate::node_serializer::{NodeSerializer, SerializeRoot};
use crate::range_serializer::{ContextInfoDepth, RangeReport, RangeSerializer};
use crate::serializer::{self, ContentSerializer, SerializerConfig};
use crate::streamer::TextStreamer;
use crate::visibility::{DomVisibility, Visibility};
use crate::OutputBuffer;
use dom::{Document, NodeId, Range, Selection};
use encoding_rs::Encoding;
use std::io::Write;

pub const DEFAULT_WRAP_COLUMN: u32 = 72;

/// What the next encode call covers. Consulted in the order selection,
/// range, node, whole document, and emptied after every encode call.
#[derive(Clone, Debug, Default)]
struct EncodingScope {
    selection: Option<Selection>,
    range: Option<Range>,
    node: Option<NodeId>,
    node_is_container: bool,
}

impl EncodingScope {
    fn is_limited(&self) -> bool {
        self.selection.is_some() || self.range.is_some() || self.node.is_some()
    }
}

/// Output of [`Encoder::encode_to_string_with_context`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContextEncoding {
    /// Start and end markers of the ancestors around the fragment.
    pub context: String,
    /// `"<start depth>,<end depth>"`.
    pub info: String,
    pub encoded: String,
}

/// Entry points shared by the plain and the copy encoder.
pub trait Encoder<'a> {
    fn init(
        &mut self,
        document: &'a Document,
        mime_type: &str,
        flags: EncoderFlags,
    ) -> Result<(), EncodeError>;

    fn mime_type(&self) -> &str;

    fn set_wrap_column(&mut self, column: u32);

    fn set_selection(&mut self, selection: Selection) -> Result<(), EncodeError>;

    fn set_range(&mut self, range: Range);

    fn set_node(&mut self, node: NodeId);

    /// Like `set_node`, without the node's own markers.
    fn set_container_node(&mut self, node: NodeId);

    fn set_charset(&mut self, label: &str) -> Result<(), EncodeError>;

    fn set_node_fixup(&mut self, fixup: Option<Box<dyn NodeFixup + 'a>>);

    fn encode_to_string(&mut self) -> Result<String, EncodeError> {
        self.encode_to_string_with_max_length(0)
    }

    /// `max_length == 0` means no limit.
    fn encode_to_string_with_max_length(&mut self, max_length: u32) -> Result<String, EncodeError>;

    fn encode_to_stream(&mut self, stream: &mut dyn Write) -> Result<(), EncodeError>;

    fn encode_to_string_with_context(&mut self) -> Result<ContextEncoding, EncodeError> {
        Err(EncodeError::NotImplemented("encode_to_string_with_context"))
    }
}

pub struct DocumentEncoder<'a> {
    document: Option<&'a Document>,
    mime_type: String,
    flags: EncoderFlags,
    wrap_column: u32,
    encoding: Option<&'static Encoding>,
    stream_threshold: usize,
    scope: EncodingScope,
    /// Kept across encode calls; dropped when `init` switches MIME type.
    serializer: Option<Box<dyn ContentSerializer + 'a>>,
    node_fixup: Option<Box<dyn NodeFixup + 'a>>,
    visibility: Box<dyn Visibility + 'a>,
    node_context: Box<dyn RangeNodeContext + 'a>,
    is_copying: bool,
    report: RangeReport,
}

impl Default for DocumentEncoder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> DocumentEncoder<'a> {
    pub fn new() -> Self {
        Self::with_range_node_context(Box::new(NoRangeContext))
    }

    pub fn with_range_node_context(node_context: Box<dyn RangeNodeContext + 'a>) -> Self {
        Self {
            document: None,
            mime_type: String::new(),
            flags: EncoderFlags::empty(),
            wrap_column: DEFAULT_WRAP_COLUMN,
            encoding: None,
            stream_threshold: TextStreamer::DEFAULT_FLUSH_THRESHOLD,
            scope: EncodingScope::default(),
            serializer: None,
            node_fixup: None,
            visibility: Box::new(DomVisibility),
            node_context,
            is_copying: false,
            report: RangeReport::default(),
        }
    }

    pub fn document(&self) -> Option<&'a Document> {
        self.document
    }

    pub fn flags(&self) -> EncoderFlags {
        self.flags
    }

    pub fn set_visibility(&mut self, visibility: Box<dyn Visibility + 'a>) {
        self.visibility = visibility;
    }

    /// Use `sink` instead of the built-in sink for the current MIME type. It
    /// stays in place until `init` is called with a different MIME type.
    pub fn set_serializer(&mut self, sink: Box<dyn ContentSerializer + 'a>) {
        self.serializer = Some(sink);
    }

    /// Flush threshold, in UTF-16 units, for `encode_to_stream`.
    pub fn set_stream_threshold(&mut self, threshold: usize) {
        self.stream_threshold = threshold;
    }

    pub fn charset(&self) -> Option<&'static Encoding> {
        self.encoding
    }

    /// Range bookkeeping of the last encode call.
    pub fn last_report(&self) -> &RangeReport {
        &self.report
    }

    pub fn context_info_depth(&self) -> ContextInfoDepth {
        self.report.context_info_depth
    }

    fn reset(&mut self, clear_serializer: bool) {
        self.flags = EncoderFlags::empty();
        self.wrap_column = DEFAULT_WRAP_COLUMN;
        self.scope = EncodingScope::default();
        self.node_fixup = None;
        self.is_copying = false;
        if clear_serializer {
            self.serializer = None;
        }
    }

    pub(crate) fn set_copying(&mut self, copying: bool) {
        self.is_copying = copying;
    }

    pub(crate) fn set_flags(&mut self, flags: EncoderFlags) {
        self.flags = flags;
    }

    pub(crate) fn clear_serializer(&mut self) {
        self.serializer = None;
    }

    /// Switch the output MIME type outside of `init`.
    pub(crate) fn set_mime_type(&mut self, mime_type: &str) {
        if self.mime_type != mime_type {
            self.serializer = None;
            self.mime_type = mime_type.to_string();
        }
    }

    fn config(&self, rewrite_encoding_declaration: bool) -> SerializerConfig {
        SerializerConfig {
            flags: self.flags,
            wrap_column: self.wrap_column,
            charset: self.encoding,
            is_copying: self.is_copying,
            rewrite_encoding_declaration,
        }
    }

    fn ensure_serializer(&mut self) -> Result<(), EncodeError> {
        if self.serializer.is_none() {
            let format = OutputFormat::from_mime(&self.mime_type)
                .ok_or_else(|| EncodeError::UnsupportedMimeType(self.mime_type.clone()))?;
            self.serializer = Some(serializer::for_format(format));
        }
        Ok(())
    }

    fn encode(
        &mut self,
        out: &mut OutputBuffer,
        max_len: Option<u32>,
        streamer: Option<&mut TextStreamer<'_>>,
    ) -> Result<(), EncodeError> {
        let doc = self.document.ok_or(EncodeError::NotInitialized)?;
        let scope = std::mem::take(&mut self.scope);
        let result = self.encode_scope(doc, &scope, out, max_len, streamer);
        if self.flags.contains(EncoderFlags::REQUIRES_REINIT_AFTER_OUTPUT) {
            self.document = None;
            self.reset(false);
        }
        result
    }

    fn encode_scope(
        &mut self,
        doc: &'a Document,
        scope: &EncodingScope,
        out: &mut OutputBuffer,
        max_len: Option<u32>,
        streamer: Option<&mut TextStreamer<'_>>,
    ) -> Result<(), EncodeError> {
        self.ensure_serializer()?;
        let rewrite = !scope.is_limited()
            && !self
                .flags
                .contains(EncoderFlags::OUTPUT_DONT_REWRITE_ENCODING_DECLARATION);
        let config = self.config(rewrite);
        let flags = self.flags;

        let Some(sink) = self.serializer.as_deref_mut() else {
            return Err(EncodeError::NotInitialized);
        };
        let needs_preformat_scanning = sink.init(&config);
        let mut ns = NodeSerializer::new(doc, flags, sink, out, self.visibility.as_ref())
            .with_fixup(self.node_fixup.as_deref())
            .with_streamer(streamer)
            .with_preformat_scanning(needs_preformat_scanning);
        let mut ranges =
            RangeSerializer::new(RangeContextSerializer::new(self.node_context.as_ref()), flags);

        if let Some(selection) = &scope.selection {
            log::debug!(target: "encoder.range", "encode selection of {} ranges", selection.range_count());
            serialize_selection(&mut ns, &mut ranges, selection)?;
        } else if let Some(range) = &scope.range {
            log::debug!(target: "encoder.range", "encode range");
            ranges.serialize_range(&mut ns, range)?;
        } else if let Some(node) = scope.node {
            log::debug!(
                target: "encoder.node",
                "encode node {node:?} (container: {})",
                scope.node_is_container
            );
            if scope.node_is_container && ns.can_serialize_iteratively() {
                ns.serialize_iterative(node)?;
            } else {
                let root = if scope.node_is_container {
                    SerializeRoot::No
                } else {
                    SerializeRoot::Yes
                };
                ns.serialize_recursive(node, root, None)?;
            }
        } else {
            log::debug!(target: "encoder.node", "encode document (max length {max_len:?})");
            ns.serialize_document_start()?;
            ns.serialize_recursive(doc.root(), SerializeRoot::Yes, max_len)?;
        }

        ns.flush_and_finish()?;
        self.report = ranges.into_report();
        Ok(())
    }

    /// Start markers of `ancestors` from the outermost inward, then their end
    /// markers from the innermost outward, as a standalone string.
    pub(crate) fn serialize_context_markers(
        &mut self,
        doc: &Document,
        ancestors: &[NodeId],
    ) -> Result<String, EncodeError> {
        self.ensure_serializer()?;
        let config = self.config(false);
        let flags = self.flags;
        let Some(sink) = self.serializer.as_deref_mut() else {
            return Err(EncodeError::NotInitialized);
        };
        let needs_preformat_scanning = sink.init(&config);
        let mut out = OutputBuffer::new();
        let mut ns = NodeSerializer::new(doc, flags, sink, &mut out, self.visibility.as_ref())
            .with_fixup(self.node_fixup.as_deref())
            .with_preformat_scanning(needs_preformat_scanning);
        for &node in ancestors.iter().rev() {
            ns.serialize_node_start(node, 0, None, None)?;
        }
        for &node in ancestors {
            ns.serialize_node_end(node, None)?;
        }
        ns.finish()?;
        Ok(out.into_string())
    }
}

/// Table rows selected cell by cell arrive as one range per row; consecutive
/// row ranges share one reopened table context.
fn serialize_selection(
    ns: &mut NodeSerializer<'_, '_>,
    ranges: &mut RangeSerializer<'_>,
    selection: &Selection,
) -> Result<(), EncodeError> {
    let doc = ns.document();
    let mut prev_row: Option<NodeId> = None;
    let mut first_start_depth = 0;

    for (i, range) in selection.ranges().iter().enumerate() {
        let node = range.start.container;
        if Some(node) != prev_row {
            if let Some(prev) = prev_row {
                ns.serialize_node_end(prev, None)?;
            }
            let is_row = doc.is_element_named(node, "tr")
                && !doc
                    .parent_element(node)
                    .is_some_and(|parent| doc.is_element_named(parent, "tr"));
            if is_row {
                if prev_row.is_none() {
                    let ancestors = doc
                        .parent(node)
                        .map(|parent| doc.inclusive_ancestors(parent))
                        .unwrap_or_default();
                    ranges.context().start(ns, &ancestors)?;
                    ranges.set_common_inclusive_ancestors(ancestors);
                    ranges.context().set_disabled(true);
                }
                ns.serialize_node_start(node, 0, None, None)?;
                prev_row = Some(node);
            } else if let Some(prev) = prev_row.take() {
                close_row_context(doc, ranges, ns, prev)?;
            }
        }

        ranges.serialize_range(ns, range)?;
        if i == 0 {
            first_start_depth = ranges.context_info_depth().start;
        }
    }

    let mut depth = ranges.context_info_depth();
    depth.start = first_start_depth;
    ranges.set_context_info_depth(depth);

    if let Some(prev) = prev_row {
        ns.serialize_node_end(prev, None)?;
        close_row_context(doc, ranges, ns, prev)?;
    }
    ranges.context().set_disabled(false);
    Ok(())
}

fn close_row_context(
    doc: &Document,
    ranges: &mut RangeSerializer<'_>,
    ns: &mut NodeSerializer<'_, '_>,
    row: NodeId,
) -> Result<(), EncodeError> {
    ranges.context().set_disabled(false);
    let ancestors = doc
        .parent(row)
        .map(|parent| doc.inclusive_ancestors(parent))
        .unwrap_or_default();
    ranges.set_common_inclusive_ancestors(ancestors);
    ranges.context().end(ns)
}

impl<'a> Encoder<'a> for DocumentEncoder<'a> {
    fn init(
        &mut self,
        document: &'a Document,
        mime_type: &str,
        flags: EncoderFlags,
    ) -> Result<(), EncodeError> {
        if !mime::is_supported(mime_type) {
            return Err(EncodeError::UnsupportedMimeType(mime_type.to_string()));
        }
        let mime_changed = self.mime_type != mime_type;
        self.reset(mime_changed);
        self.document = Some(document);
        self.mime_type = mime_type.to_string();
        self.flags = flags;
        Ok(())
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn set_wrap_column(&mut self, column: u32) {
        self.wrap_column = column;
    }

    fn set_selection(&mut self, selection: Selection) -> Result<(), EncodeError> {
        self.scope.selection = Some(selection);
        Ok(())
    }

    fn set_range(&mut self, range: Range) {
        self.scope.range = Some(range);
    }

    fn set_node(&mut self, node: NodeId) {
        self.scope.node_is_container = false;
        self.scope.node = Some(node);
    }

    fn set_container_node(&mut self, node: NodeId) {
        self.scope.node_is_container = true;
        self.scope.node = Some(node);
    }

    fn set_charset(&mut self, label: &str) -> Result<(), EncodeError> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| EncodeError::UnsupportedCharset(label.to_string()))?;
        self.encoding = Some(encoding.output_encoding());
        Ok(())
    }

    fn set_node_fixup(&mut self, fixup: Option<Box<dyn NodeFixup + 'a>>) {
        self.node_fixup = fixup;
    }

    fn encode_to_string_with_max_length(&mut self, max_length: u32) -> Result<String, EncodeError> {
        let mut out = OutputBuffer::new();
        let max_len = (max_length > 0).then_some(max_length);
        self.encode(&mut out, max_len, None)?;
        Ok(out.into_string())
    }

    fn encode_to_stream(&mut self, stream: &mut dyn Write) -> Result<(), EncodeError> {
        if self.document.is_none() {
            return Err(EncodeError::NotInitialized);
        }
        let encoding = self
            .encoding
            .ok_or_else(|| EncodeError::UnsupportedCharset(String::new()))?;
        let plain_text = self.mime_type.eq_ignore_ascii_case(mime::TEXT_PLAIN);
        let mut streamer =
            TextStreamer::with_threshold(stream, encoding, plain_text, self.stream_threshold);
        let mut out = OutputBuffer::new();
        self.encode(&mut out, None, Some(&mut streamer))?;
        streamer.force_flush(&mut out)?;
        log::debug!(target: "encoder.stream", "stream done after {} writes", streamer.writes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::Boundary;

    fn doc() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new_html();
        let div = doc.append_element(Document::ROOT, "div").unwrap();
        let p = doc.append_element(div, "p").unwrap();
        doc.append_text(p, "Hello ").unwrap();
        let b = doc.append_element(p, "b").unwrap();
        doc.append_text(b, "world").unwrap();
        (doc, div, p)
    }

    #[test]
    fn rejects_unknown_mime_type() {
        let (doc, _, _) = doc();
        let mut encoder = DocumentEncoder::new();
        assert!(matches!(
            encoder.init(&doc, "application/json", EncoderFlags::empty()),
            Err(EncodeError::UnsupportedMimeType(_))
        ));
    }

    #[test]
    fn requires_init() {
        let mut encoder = DocumentEncoder::new();
        assert!(matches!(encoder.encode_to_string(), Err(EncodeError::NotInitialized)));
    }

    #[test]
    fn scope_is_cleared_after_each_call() {
        let (doc, div, p) = doc();
        let mut encoder = DocumentEncoder::new();
        encoder.init(&doc, mime::TEXT_HTML, EncoderFlags::empty()).unwrap();
        encoder.set_node(p);
        assert_eq!(encoder.encode_to_string().unwrap(), "<p>Hello <b>world</b></p>");
        assert_eq!(
            encoder.encode_to_string().unwrap(),
            "<div><p>Hello <b>world</b></p></div>"
        );
        encoder.set_container_node(div);
        assert_eq!(encoder.encode_to_string().unwrap(), "<p>Hello <b>world</b></p>");
    }

    #[test]
    fn selection_wins_over_other_scopes() {
        let (doc, div, p) = doc();
        let mut encoder = DocumentEncoder::new();
        encoder.init(&doc, mime::TEXT_HTML, EncoderFlags::empty()).unwrap();
        encoder.set_node(div);
        encoder.set_range(Range::new(Boundary::new(div, 0), Boundary::new(div, 1)));
        encoder
            .set_selection(Selection::from(Range::new(Boundary::new(p, 1), Boundary::new(p, 2))))
            .unwrap();
        assert_eq!(encoder.encode_to_string().unwrap(), "<b>world</b>");
    }

    #[test]
    fn empty_selection_is_empty_output() {
        let (doc, _, _) = doc();
        let mut encoder = DocumentEncoder::new();
        encoder.init(&doc, mime::TEXT_HTML, EncoderFlags::empty()).unwrap();
        encoder.set_selection(Selection::new()).unwrap();
        assert_eq!(encoder.encode_to_string().unwrap(), "");
    }

    #[test]
    fn context_encoding_is_not_provided() {
        let (doc, _, _) = doc();
        let mut encoder = DocumentEncoder::new();
        encoder.init(&doc, mime::TEXT_HTML, EncoderFlags::empty()).unwrap();
        assert!(matches!(
            encoder.encode_to_string_with_context(),
            Err(EncodeError::NotImplemented(_))
        ));
    }

    #[test]
    fn stream_requires_charset() {
        let (doc, _, _) = doc();
        let mut encoder = DocumentEncoder::new();
        encoder.init(&doc, mime::TEXT_HTML, EncoderFlags::empty()).unwrap();
        let mut bytes = Vec::new();
        assert!(matches!(
            encoder.encode_to_stream(&mut bytes),
            Err(EncodeError::UnsupportedCharset(_))
        ));
        assert!(matches!(
            encoder.set_charset("no-such-charset"),
            Err(EncodeError::UnsupportedCharset(_))
        ));
        encoder.set_charset("latin1").unwrap();
        assert_eq!(encoder.charset(), Some(encoding_rs::WINDOWS_1252));
    }

    #[test]
    fn reinit_flag_releases_document() {
        let (doc, _, _) = doc();
        let mut encoder = DocumentEncoder::new();
        encoder
            .init(&doc, mime::TEXT_PLAIN, EncoderFlags::REQUIRES_REINIT_AFTER_OUTPUT)
            .unwrap();
        assert_eq!(encoder.encode_to_string().unwrap(), "Hello world");
        assert!(encoder.document().is_none());
        assert!(matches!(encoder.encode_to_string(), Err(EncodeError::NotInitialized)));
    }

    #[test]
    fn pinned_serializer_survives_same_mime_init() {
        struct Upper;
        impl ContentSerializer for Upper {
            fn init(&mut self, _config: &SerializerConfig) -> bool {
                false
            }
            fn append_text(
                &mut self,
                doc: &Document,
                text: NodeId,
                _start: u32,
                _end: Option<u32>,
                out: &mut OutputBuffer,
            ) -> Result<(), EncodeError> {
                out.push_str(&doc.character_data(text).unwrap_or("").to_uppercase());
                Ok(())
            }
            fn append_cdata_section(
                &mut self,
                _: &Document,
                _: NodeId,
                _: u32,
                _: Option<u32>,
                _: &mut OutputBuffer,
            ) -> Result<(), EncodeError> {
                Ok(())
            }
            fn append_processing_instruction(
                &mut self,
                _: &Document,
                _: NodeId,
                _: u32,
                _: Option<u32>,
                _: &mut OutputBuffer,
            ) -> Result<(), EncodeError> {
                Ok(())
            }
            fn append_comment(
                &mut self,
                _: &Document,
                _: NodeId,
                _: u32,
                _: Option<u32>,
                _: &mut OutputBuffer,
            ) -> Result<(), EncodeError> {
                Ok(())
            }
            fn append_doctype(
                &mut self,
                _: &Document,
                _: NodeId,
                _: &mut OutputBuffer,
            ) -> Result<(), EncodeError> {
                Ok(())
            }
            fn append_element_start(
                &mut self,
                _: &Document,
                _: NodeId,
                _: NodeId,
                _: &mut OutputBuffer,
            ) -> Result<(), EncodeError> {
                Ok(())
            }
            fn append_element_end(
                &mut self,
                _: &Document,
                _: NodeId,
                _: NodeId,
                _: &mut OutputBuffer,
            ) -> Result<(), EncodeError> {
                Ok(())
            }
            fn append_document_start(
                &mut self,
                _: &Document,
                _: &mut OutputBuffer,
            ) -> Result<(), EncodeError> {
                Ok(())
            }
        }

        let (doc, _, _) = doc();
        let mut encoder = DocumentEncoder::new();
        encoder.init(&doc, mime::TEXT_HTML, EncoderFlags::empty()).unwrap();
        encoder.set_serializer(Box::new(Upper));
        encoder.init(&doc, mime::TEXT_HTML, EncoderFlags::empty()).unwrap();
        assert_eq!(encoder.encode_to_string().unwrap(), "HELLO WORLD");
        encoder.init(&doc, mime::TEXT_PLAIN, EncoderFlags::empty()).unwrap();
        assert_eq!(encoder.encode_to_string().unwrap(), "Hello world");
    }
}
