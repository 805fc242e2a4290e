//! Output sinks: the per-format strategy that turns node events into text.
//!
//! Contract:
//! - The engine calls `init` once per encode call before any append, and
//!   `flush_and_finish` (whole encode) or `finish` (context-only output) once at
//!   the end.
//! - Character-data appends receive UTF-16 `start`/`end` bounds; `end == None`
//!   means "through the end of the data".
//! - `append_element_start`/`append_element_end` are balanced for every element
//!   the engine opens, including elements opened as paste context.
//! - `element` may be a fixup substitute; `original` is always the node from
//!   the tree being walked.

use crate::error::EncodeError;
use crate::flags::EncoderFlags;
use crate::mime::OutputFormat;
use crate::OutputBuffer;
use dom::{Document, NodeId};

pub mod markup;
pub mod plain_text;

pub use markup::MarkupSerializer;
pub use plain_text::PlainTextSerializer;

/// Per-call settings handed to a sink.
#[derive(Clone, Copy, Debug)]
pub struct SerializerConfig {
    pub flags: EncoderFlags,
    pub wrap_column: u32,
    pub charset: Option<&'static encoding_rs::Encoding>,
    pub is_copying: bool,
    pub rewrite_encoding_declaration: bool,
}

pub trait ContentSerializer {
    /// Reset per-call state. Returns whether the sink wants preformat scanning
    /// notifications.
    fn init(&mut self, config: &SerializerConfig) -> bool;

    fn append_text(
        &mut self,
        doc: &Document,
        text: NodeId,
        start: u32,
        end: Option<u32>,
        out: &mut OutputBuffer,
    ) -> Result<(), EncodeError>;

    fn append_cdata_section(
        &mut self,
        doc: &Document,
        cdata: NodeId,
        start: u32,
        end: Option<u32>,
        out: &mut OutputBuffer,
    ) -> Result<(), EncodeError>;

    fn append_processing_instruction(
        &mut self,
        doc: &Document,
        pi: NodeId,
        start: u32,
        end: Option<u32>,
        out: &mut OutputBuffer,
    ) -> Result<(), EncodeError>;

    fn append_comment(
        &mut self,
        doc: &Document,
        comment: NodeId,
        start: u32,
        end: Option<u32>,
        out: &mut OutputBuffer,
    ) -> Result<(), EncodeError>;

    fn append_doctype(
        &mut self,
        doc: &Document,
        doctype: NodeId,
        out: &mut OutputBuffer,
    ) -> Result<(), EncodeError>;

    fn append_element_start(
        &mut self,
        doc: &Document,
        element: NodeId,
        original: NodeId,
        out: &mut OutputBuffer,
    ) -> Result<(), EncodeError>;

    fn append_element_end(
        &mut self,
        doc: &Document,
        element: NodeId,
        original: NodeId,
        out: &mut OutputBuffer,
    ) -> Result<(), EncodeError>;

    fn append_document_start(
        &mut self,
        doc: &Document,
        out: &mut OutputBuffer,
    ) -> Result<(), EncodeError>;

    fn scan_element_for_preformat(&mut self, _doc: &Document, _element: NodeId) {}

    fn forget_element_for_preformat(&mut self, _doc: &Document, _element: NodeId) {}

    /// Write anything still pending at the end of a full encode.
    fn flush_and_finish(&mut self, _out: &mut OutputBuffer) -> Result<(), EncodeError> {
        Ok(())
    }

    /// End of a context-only pass; pending output is discarded.
    fn finish(&mut self, _out: &mut OutputBuffer) -> Result<(), EncodeError> {
        Ok(())
    }
}

/// Built-in sink for `format`.
pub fn for_format(format: OutputFormat) -> Box<dyn ContentSerializer> {
    match format {
        OutputFormat::PlainText => Box::new(PlainTextSerializer::new()),
        OutputFormat::Html => Box::new(MarkupSerializer::html()),
        OutputFormat::Xml => Box::new(MarkupSerializer::xml()),
    }
}

/// The `[start, end)` UTF-16 window of `data`.
pub(crate) fn window(data: &str, start: u32, end: Option<u32>) -> &str {
    tools::utf16::slice(data, start as usize, end.map(|e| e as usize))
}
