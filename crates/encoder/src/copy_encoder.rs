//! Encoder used for clipboard copies.
//!
//! On top of [`DocumentEncoder`] it widens selected ranges to whole elements
//! where their content is fully selected, recognises selections inside text
//! widgets, and reports the paste context around the copied fragment.

use crate::context::RangeNodeContext;
use crate::document_encoder::{ContextEncoding, DocumentEncoder, Encoder};
use crate::error::EncodeError;
use crate::fixup::NodeFixup;
use crate::flags::EncoderFlags;
use crate::mime;
use crate::promote::Promoter;
use crate::range_serializer::RangeReport;
use crate::visibility::Visibility;
use dom::{Document, NodeId, Range, Selection, TreeKind};
use std::io::Write;

/// Inline formatting that a paste target needs to see again.
const INLINE_CONTEXT: &[&str] = &[
    "b", "i", "u", "a", "tt", "s", "big", "small", "strike", "em", "strong", "dfn", "code", "cite",
    "var", "abbr", "font", "script", "span", "pre", "h1", "h2", "h3", "h4", "h5", "h6",
];

const TABLE_STRUCTURE: &[&str] = &["tr", "thead", "tbody", "tfoot", "table"];

/// Reopens inline formatting ancestors, and table structure directly around
/// the fragment.
#[derive(Clone, Copy, Debug, Default)]
pub struct CopyContext;

impl RangeNodeContext for CopyContext {
    fn include_in_context(&self, doc: &Document, node: NodeId) -> bool {
        // An inline editing host would duplicate its own styling.
        !doc.is_editing_host(node) && doc.is_any_element_of(node, INLINE_CONTEXT)
    }

    fn immediate_context_count(&self, doc: &Document, ancestors: &[NodeId]) -> usize {
        ancestors
            .iter()
            .take_while(|&&node| doc.is_any_element_of(node, TABLE_STRUCTURE))
            .count()
    }
}

pub struct HtmlCopyEncoder<'a> {
    inner: DocumentEncoder<'a>,
    document: Option<&'a Document>,
    is_text_widget: bool,
    include_common_ancestor: bool,
}

impl Default for HtmlCopyEncoder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> HtmlCopyEncoder<'a> {
    pub fn new() -> Self {
        Self {
            inner: DocumentEncoder::with_range_node_context(Box::new(CopyContext)),
            document: None,
            is_text_widget: false,
            include_common_ancestor: true,
        }
    }

    /// Whether promotion may continue past the common ancestor of a range
    /// whose boundaries both land on it. On by default.
    pub fn set_include_common_ancestor(&mut self, include: bool) {
        self.include_common_ancestor = include;
    }

    /// The last selection was inside a text field or a non-HTML document and
    /// is copied as plain text.
    pub fn is_text_widget(&self) -> bool {
        self.is_text_widget
    }

    pub fn flags(&self) -> EncoderFlags {
        self.inner.flags()
    }

    pub fn set_visibility(&mut self, visibility: Box<dyn Visibility + 'a>) {
        self.inner.set_visibility(visibility);
    }

    pub fn last_report(&self) -> &RangeReport {
        self.inner.last_report()
    }

    fn tree_kind(&self, range: &Range) -> TreeKind {
        if self
            .inner
            .flags()
            .contains(EncoderFlags::ALLOW_CROSS_SHADOW_BOUNDARY)
            && range.may_cross_shadow_boundary()
        {
            TreeKind::Flat
        } else {
            TreeKind::Dom
        }
    }

    fn prepare_encode(&mut self) {
        if self.is_text_widget {
            self.inner.set_mime_type(mime::TEXT_PLAIN);
        }
    }
}

impl<'a> Encoder<'a> for HtmlCopyEncoder<'a> {
    fn init(
        &mut self,
        document: &'a Document,
        mime_type: &str,
        flags: EncoderFlags,
    ) -> Result<(), EncodeError> {
        let mime_type = if mime_type.eq_ignore_ascii_case(mime::TEXT_PLAIN) {
            mime::TEXT_PLAIN
        } else {
            mime::TEXT_HTML
        };
        self.inner.init(document, mime_type, flags)?;
        self.inner.clear_serializer();

        let mut flags = flags | EncoderFlags::OUTPUT_ABSOLUTE_LINKS;
        if !document.script_enabled() {
            flags |= EncoderFlags::OUTPUT_NO_SCRIPT_CONTENT;
        }
        self.inner.set_flags(flags);
        self.inner.set_copying(true);
        self.document = Some(document);
        self.is_text_widget = false;
        Ok(())
    }

    fn mime_type(&self) -> &str {
        self.inner.mime_type()
    }

    fn set_wrap_column(&mut self, column: u32) {
        self.inner.set_wrap_column(column);
    }

    fn set_selection(&mut self, selection: Selection) -> Result<(), EncodeError> {
        let doc = self.document.ok_or(EncodeError::NotInitialized)?;
        let Some(first) = selection.ranges().first() else {
            return Err(EncodeError::EmptySelection);
        };

        let in_form_field = first
            .closest_common_inclusive_ancestor(doc, TreeKind::Dom)
            .is_some_and(|common| {
                doc.inclusive_ancestors(common)
                    .into_iter()
                    .any(|node| doc.is_any_element_of(node, &["input", "textarea"]))
            });
        if in_form_field {
            log::debug!(target: "encoder.copy", "selection inside a form field, copying as text");
            self.is_text_widget = true;
            self.inner.set_mime_type(mime::TEXT_PLAIN);
            return self.inner.set_selection(selection);
        }
        if !doc.is_html() {
            // The MIME type switches when encoding starts.
            log::debug!(target: "encoder.copy", "non-HTML document, copying as text");
            self.is_text_widget = true;
            return self.inner.set_selection(selection);
        }

        // Text widget selections returned above, so promotion never sees one.
        let mut promoted = Selection::new();
        for range in selection.ranges() {
            let promoter = Promoter::new(doc, self.tree_kind(range), false)
                .include_common_ancestor(self.include_common_ancestor);
            promoted.add_range(promoter.promote_range(range)?);
        }
        self.inner.set_selection(promoted)
    }

    fn set_range(&mut self, range: Range) {
        self.inner.set_range(range);
    }

    fn set_node(&mut self, node: NodeId) {
        self.inner.set_node(node);
    }

    fn set_container_node(&mut self, node: NodeId) {
        self.inner.set_container_node(node);
    }

    fn set_charset(&mut self, label: &str) -> Result<(), EncodeError> {
        self.inner.set_charset(label)
    }

    fn set_node_fixup(&mut self, fixup: Option<Box<dyn NodeFixup + 'a>>) {
        self.inner.set_node_fixup(fixup);
    }

    fn encode_to_string_with_max_length(&mut self, max_length: u32) -> Result<String, EncodeError> {
        self.prepare_encode();
        self.inner.encode_to_string_with_max_length(max_length)
    }

    fn encode_to_stream(&mut self, stream: &mut dyn Write) -> Result<(), EncodeError> {
        self.prepare_encode();
        self.inner.encode_to_stream(stream)
    }

    fn encode_to_string_with_context(&mut self) -> Result<ContextEncoding, EncodeError> {
        let encoded = self.encode_to_string()?;
        if self.is_text_widget {
            return Ok(ContextEncoding {
                encoded,
                ..ContextEncoding::default()
            });
        }
        let doc = self.document.ok_or(EncodeError::NotInitialized)?;

        // With several ranges only the last one's ancestors are reported.
        let report = self.inner.last_report();
        let mut ancestors = report.common_inclusive_ancestors.clone();
        let mut depth = report.context_info_depth;
        if ancestors.first().is_some_and(|&node| doc.is_text(node)) {
            ancestors.remove(0);
            depth.start = depth.start.saturating_sub(1);
            depth.end = depth.end.saturating_sub(1);
        }

        let context = self.inner.serialize_context_markers(doc, &ancestors)?;
        Ok(ContextEncoding {
            context,
            info: format!("{},{}", depth.start, depth.end),
            encoded,
        })
    }
}
