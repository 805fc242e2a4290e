//! Node-level traversal: start/end markers for one node and the two
//! whole-subtree strategies.

use crate::error::EncodeError;
use crate::fixup::NodeFixup;
use crate::flags::EncoderFlags;
use crate::serializer::ContentSerializer;
use crate::streamer::TextStreamer;
use crate::visibility::Visibility;
use crate::OutputBuffer;
use dom::{Document, NodeId, NodeType};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerializeRoot {
    Yes,
    No,
}

/// Walks nodes of one document and forwards them to a sink.
///
/// All state is borrowed for the duration of one encode call.
pub struct NodeSerializer<'a, 'w> {
    doc: &'a Document,
    flags: EncoderFlags,
    sink: &'a mut dyn ContentSerializer,
    out: &'a mut OutputBuffer,
    streamer: Option<&'a mut TextStreamer<'w>>,
    fixup: Option<&'a dyn NodeFixup>,
    visibility: &'a dyn Visibility,
    needs_preformat_scanning: bool,
}

impl<'a, 'w> NodeSerializer<'a, 'w> {
    pub fn new(
        doc: &'a Document,
        flags: EncoderFlags,
        sink: &'a mut dyn ContentSerializer,
        out: &'a mut OutputBuffer,
        visibility: &'a dyn Visibility,
    ) -> Self {
        Self {
            doc,
            flags,
            sink,
            out,
            streamer: None,
            fixup: None,
            visibility,
            needs_preformat_scanning: false,
        }
    }

    pub fn with_streamer(mut self, streamer: Option<&'a mut TextStreamer<'w>>) -> Self {
        self.streamer = streamer;
        self
    }

    pub fn with_fixup(mut self, fixup: Option<&'a dyn NodeFixup>) -> Self {
        self.fixup = fixup;
        self
    }

    /// Value returned by the sink's `init`.
    pub fn with_preformat_scanning(mut self, needed: bool) -> Self {
        self.needs_preformat_scanning = needed;
        self
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn flags(&self) -> EncoderFlags {
        self.flags
    }

    /// The non-recursive walk only follows literal children and has no
    /// per-node hooks.
    pub fn can_serialize_iteratively(&self) -> bool {
        self.fixup.is_none()
            && self.streamer.is_none()
            && !self.flags.intersects(
                EncoderFlags::SKIP_INVISIBLE_CONTENT | EncoderFlags::ALLOW_CROSS_SHADOW_BOUNDARY,
            )
    }

    pub fn serialize_document_start(&mut self) -> Result<(), EncodeError> {
        self.sink.append_document_start(self.doc, self.out)
    }

    pub fn flush_and_finish(&mut self) -> Result<(), EncodeError> {
        self.sink.flush_and_finish(self.out)
    }

    pub fn finish(&mut self) -> Result<(), EncodeError> {
        self.sink.finish(self.out)
    }

    pub fn output_len(&self) -> usize {
        self.out.len_utf16()
    }

    pub fn has_frame(&self, node: NodeId) -> bool {
        self.visibility.has_frame(self.doc, node)
    }

    pub fn is_invisible_and_skipped(&self, node: NodeId) -> bool {
        self.flags.contains(EncoderFlags::SKIP_INVISIBLE_CONTENT)
            && !self.visibility.is_visible(self.doc, node)
    }

    fn substitute(&self, original: NodeId, fixup_node: Option<NodeId>) -> NodeId {
        fixup_node
            .or_else(|| {
                self.fixup
                    .and_then(|f| f.fixup_node(self.doc, original))
                    .map(|f| f.node)
            })
            .unwrap_or(original)
    }

    fn preformat_target(&self, node: NodeId) -> Option<NodeId> {
        if !self.needs_preformat_scanning {
            return None;
        }
        if self.doc.is_element(node) {
            Some(node)
        } else if self.doc.is_text(node) {
            self.doc.parent_element(node)
        } else {
            None
        }
    }

    fn is_dropped_break(&self, node: NodeId) -> bool {
        self.flags
            .intersects(EncoderFlags::OUTPUT_PREFORMATTED | EncoderFlags::OUTPUT_DROP_INVISIBLE_BREAK)
            && self.doc.is_invisible_break(node)
    }

    pub fn serialize_node_start(
        &mut self,
        original: NodeId,
        start: u32,
        end: Option<u32>,
        fixup_node: Option<NodeId>,
    ) -> Result<(), EncodeError> {
        if let Some(target) = self.preformat_target(original) {
            self.sink.scan_element_for_preformat(self.doc, target);
        }
        if self.is_invisible_and_skipped(original) {
            log::trace!(target: "encoder.node", "skip invisible {original:?}");
            return Ok(());
        }

        let doc = self.doc;
        let node = self.substitute(original, fixup_node);
        if doc.is_element(node) {
            if self.is_dropped_break(node) {
                return Ok(());
            }
            return self.sink.append_element_start(doc, node, original, self.out);
        }

        match doc.node_type(node) {
            NodeType::Text => self.sink.append_text(doc, node, start, end, self.out),
            NodeType::CDataSection => self.sink.append_cdata_section(doc, node, start, end, self.out),
            NodeType::ProcessingInstruction => {
                self.sink
                    .append_processing_instruction(doc, node, start, end, self.out)
            }
            NodeType::Comment => self.sink.append_comment(doc, node, start, end, self.out),
            NodeType::DocumentType => self.sink.append_doctype(doc, node, self.out),
            _ => Ok(()),
        }
    }

    pub fn serialize_node_end(
        &mut self,
        original: NodeId,
        fixup_node: Option<NodeId>,
    ) -> Result<(), EncodeError> {
        if let Some(target) = self.preformat_target(original) {
            self.sink.forget_element_for_preformat(self.doc, target);
        }
        if self.is_invisible_and_skipped(original) {
            return Ok(());
        }

        let doc = self.doc;
        let node = self.substitute(original, fixup_node);
        if doc.is_element(node) && !self.is_dropped_break(node) {
            return self.sink.append_element_end(doc, node, original, self.out);
        }
        Ok(())
    }

    /// Depth-first walk of `node`'s subtree.
    ///
    /// With `max_len`, no node starts once the output holds `max_len` UTF-16
    /// units, and a text node starting below the cap is cut at the remaining
    /// budget. Every start marker written still gets its end marker.
    pub fn serialize_recursive(
        &mut self,
        node: NodeId,
        mut serialize_root: SerializeRoot,
        max_len: Option<u32>,
    ) -> Result<(), EncodeError> {
        let written = self.out.len_utf16();
        if let Some(max) = max_len
            && written >= max as usize
        {
            return Ok(());
        }
        if self.is_invisible_and_skipped(node) {
            return Ok(());
        }

        let doc = self.doc;
        let fixup = self.fixup.and_then(|f| f.fixup_node(doc, node));
        let substitute = fixup.map(|f| f.node).unwrap_or(node);

        if self.flags.contains(EncoderFlags::SKIP_INVISIBLE_CONTENT)
            && !doc.is_document(node)
            && !self.visibility.is_selectable(doc, node)
        {
            serialize_root = SerializeRoot::No;
        }

        if serialize_root == SerializeRoot::Yes {
            let end = max_len.map(|max| max - written as u32);
            self.serialize_node_start(node, 0, end, Some(substitute))?;
        }

        let cross_shadow = self.flags.contains(EncoderFlags::ALLOW_CROSS_SHADOW_BOUNDARY);
        let shadow_root = if cross_shadow {
            doc.shadow_root_for_selection(node)
        } else {
            None
        };

        if let Some(shadow_root) = shadow_root {
            self.serialize_recursive(shadow_root, SerializeRoot::No, max_len)?;
        } else {
            let walked = match fixup {
                Some(f) if f.serialize_children => f.node,
                _ => node,
            };
            let assigned: &[NodeId] = if cross_shadow && doc.is_slot(walked) {
                doc.assigned_nodes(walked)
            } else {
                &[]
            };
            if assigned.is_empty() {
                let mut child = doc.first_child_of_template_or_node(walked);
                while let Some(current) = child {
                    self.serialize_recursive(current, SerializeRoot::Yes, max_len)?;
                    child = doc.next_sibling(current);
                }
            } else {
                for &current in assigned {
                    self.serialize_recursive(current, SerializeRoot::Yes, max_len)?;
                }
            }
        }

        if serialize_root == SerializeRoot::Yes {
            self.serialize_node_end(node, Some(substitute))?;
        }

        if let Some(streamer) = self.streamer.as_deref_mut() {
            streamer.flush_if_long_enough(self.out)?;
        }
        Ok(())
    }

    /// Children of `root` in document order without recursion. Shadow roots
    /// and slot assignments are not followed, so this matches
    /// `serialize_recursive(root, SerializeRoot::No, None)` only when
    /// `can_serialize_iteratively` holds.
    pub fn serialize_iterative(&mut self, root: NodeId) -> Result<(), EncodeError> {
        let doc = self.doc;
        let mut next = doc.first_child_of_template_or_node(root);
        while let Some(node) = next {
            let mut current = Some(node);
            self.serialize_node_start(node, 0, None, Some(node))?;
            next = doc.first_child_of_template_or_node(node);
            while next.is_none() {
                let Some(cur) = current.filter(|&c| c != root) else {
                    break;
                };
                self.serialize_node_end(cur, None)?;
                next = doc.next_sibling(cur);
                if next.is_none() {
                    let mut parent = doc.parent(cur);
                    // Leaving template content returns to the template.
                    if let Some(p) = parent
                        && p != root
                        && doc.node_type(p) == NodeType::DocumentFragment
                        && let Some(host) = doc.host(p)
                        && doc.is_element_named(host, "template")
                    {
                        parent = Some(host);
                    }
                    current = parent;
                }
            }
        }
        Ok(())
    }

    /// Start and end of one character-data node bounded to `[start, end)`.
    pub fn serialize_text_node(
        &mut self,
        node: NodeId,
        start: u32,
        end: Option<u32>,
    ) -> Result<(), EncodeError> {
        self.serialize_node_start(node, start, end, None)?;
        self.serialize_node_end(node, None)
    }
}
