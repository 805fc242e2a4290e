//! Serialization of the nodes inside one range.
//!
//! Both boundaries are turned into inclusive-ancestor chains with per-level
//! offsets. The position of the common ancestor in each chain (its root
//! index) converts a recursion depth below the common ancestor into a chain
//! index, which is what decides whether a node is a start or end boundary
//! node at that depth.

use crate::context::RangeContextSerializer;
use crate::error::EncodeError;
use crate::flags::EncoderFlags;
use crate::node_serializer::{NodeSerializer, SerializeRoot};
use dom::{Document, NodeId, Range, TreeKind};

/// Ancestor levels of each boundary that were not reopened as context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContextInfoDepth {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Default)]
struct BoundaryChain {
    ancestors: Vec<NodeId>,
    offsets: Vec<Option<u32>>,
    root_index: Option<usize>,
}

impl BoundaryChain {
    fn build(doc: &Document, container: NodeId, offset: u32, kind: TreeKind, common: NodeId) -> Self {
        let (ancestors, offsets) = doc.inclusive_ancestors_and_offsets(container, offset, kind);
        let root_index = ancestors.iter().position(|&n| n == common);
        Self {
            ancestors,
            offsets,
            root_index,
        }
    }

    fn index_at_depth(&self, depth: usize) -> Option<usize> {
        self.root_index.and_then(|root| root.checked_sub(depth))
    }

    fn node_at_depth(&self, depth: usize) -> Option<NodeId> {
        self.index_at_depth(depth)
            .and_then(|i| self.ancestors.get(i).copied())
    }

    fn offset_at_depth(&self, depth: usize) -> Option<u32> {
        self.index_at_depth(depth)
            .and_then(|i| self.offsets.get(i).copied().flatten())
    }
}

/// Start and end boundary node at one recursion depth.
#[derive(Clone, Copy, Debug)]
struct BoundaryNodes {
    start: Option<NodeId>,
    end: Option<NodeId>,
}

/// State collected while serializing ranges, reported to callers once the
/// encode call completes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RangeReport {
    /// Inclusive ancestors of the last range's common ancestor, innermost
    /// first.
    pub common_inclusive_ancestors: Vec<NodeId>,
    pub context_info_depth: ContextInfoDepth,
}

pub struct RangeSerializer<'c> {
    context: RangeContextSerializer<'c>,
    flags: EncoderFlags,
    common_ancestor: Option<NodeId>,
    common_inclusive_ancestors: Vec<NodeId>,
    context_info_depth: ContextInfoDepth,
    /// Once a context-worthy node is met the depth counters stop.
    halt_range_hint: bool,
    start: BoundaryChain,
    end: BoundaryChain,
    kind: TreeKind,
    range: Option<Range>,
}

impl<'c> RangeSerializer<'c> {
    pub fn new(context: RangeContextSerializer<'c>, flags: EncoderFlags) -> Self {
        Self {
            context,
            flags,
            common_ancestor: None,
            common_inclusive_ancestors: Vec::new(),
            context_info_depth: ContextInfoDepth::default(),
            halt_range_hint: false,
            start: BoundaryChain::default(),
            end: BoundaryChain::default(),
            kind: TreeKind::Dom,
            range: None,
        }
    }

    pub fn context(&mut self) -> &mut RangeContextSerializer<'c> {
        &mut self.context
    }

    pub fn context_info_depth(&self) -> ContextInfoDepth {
        self.context_info_depth
    }

    pub fn set_context_info_depth(&mut self, depth: ContextInfoDepth) {
        self.context_info_depth = depth;
    }

    pub fn common_inclusive_ancestors(&self) -> &[NodeId] {
        &self.common_inclusive_ancestors
    }

    pub fn set_common_inclusive_ancestors(&mut self, ancestors: Vec<NodeId>) {
        self.common_inclusive_ancestors = ancestors;
    }

    pub fn into_report(self) -> RangeReport {
        RangeReport {
            common_inclusive_ancestors: self.common_inclusive_ancestors,
            context_info_depth: self.context_info_depth,
        }
    }

    /// Tree the range's offsets are resolved in.
    fn effective_kind(&self, range: &Range) -> TreeKind {
        if self.flags.contains(EncoderFlags::ALLOW_CROSS_SHADOW_BOUNDARY)
            && range.may_cross_shadow_boundary()
        {
            TreeKind::Flat
        } else {
            TreeKind::Dom
        }
    }

    pub fn serialize_range(
        &mut self,
        ns: &mut NodeSerializer<'_, '_>,
        range: &Range,
    ) -> Result<(), EncodeError> {
        let kind = self.effective_kind(range);
        if range.collapsed() && kind == TreeKind::Dom {
            return Ok(());
        }
        let doc = ns.document();
        let Some(common) = range.closest_common_inclusive_ancestor(doc, kind) else {
            log::debug!(target: "encoder.range", "range without common ancestor");
            return Ok(());
        };
        log::debug!(
            target: "encoder.range",
            "range {:?}:{} .. {:?}:{} common {common:?} ({kind:?})",
            range.start.container,
            range.start.offset,
            range.end.container,
            range.end.offset
        );

        self.kind = kind;
        self.range = Some(*range);
        self.common_ancestor = Some(common);
        self.context_info_depth = ContextInfoDepth::default();
        self.common_inclusive_ancestors = doc.inclusive_ancestors(common);
        self.start = BoundaryChain::build(doc, range.start.container, range.start.offset, kind, common);
        self.end = BoundaryChain::build(doc, range.end.container, range.end.offset, kind, common);

        self.context.start(ns, &self.common_inclusive_ancestors)?;

        let start_container = range.start.container;
        if start_container == range.end.container && doc.is_text(start_container) {
            if !self.parent_hides_frameless_text(ns, start_container) {
                ns.serialize_text_node(start_container, range.start.offset, Some(range.end.offset))?;
            }
        } else {
            self.serialize_range_nodes(ns, common, 0)?;
        }

        self.context.end(ns)
    }

    /// A text node without a frame inherits its parent's visibility.
    fn parent_hides_frameless_text(&self, ns: &NodeSerializer<'_, '_>, text: NodeId) -> bool {
        if !self.flags.contains(EncoderFlags::SKIP_INVISIBLE_CONTENT) {
            return false;
        }
        if ns.has_frame(text) {
            return false;
        }
        match ns.document().parent(text) {
            Some(parent) => ns.is_invisible_and_skipped(parent),
            None => true,
        }
    }

    fn boundary_nodes(&self, depth: usize) -> BoundaryNodes {
        BoundaryNodes {
            start: self.start.node_at_depth(depth),
            end: self.end.node_at_depth(depth),
        }
    }

    fn serialize_range_nodes(
        &mut self,
        ns: &mut NodeSerializer<'_, '_>,
        node: NodeId,
        depth: usize,
    ) -> Result<(), EncodeError> {
        if ns.is_invisible_and_skipped(node) {
            return Ok(());
        }
        let boundaries = self.boundary_nodes(depth);
        if boundaries.start != Some(node) && boundaries.end != Some(node) {
            log::trace!(target: "encoder.range", "{node:?} fully contained at depth {depth}");
            ns.serialize_recursive(node, SerializeRoot::Yes, None)
        } else {
            self.serialize_partially_contained(ns, node, boundaries, depth)
        }
    }

    fn serialize_partially_contained(
        &mut self,
        ns: &mut NodeSerializer<'_, '_>,
        node: NodeId,
        boundaries: BoundaryNodes,
        depth: usize,
    ) -> Result<(), EncodeError> {
        let doc = ns.document();
        let Some(range) = self.range else {
            return Ok(());
        };

        // A text node is never both boundaries here; that case is handled
        // before the walk starts.
        if doc.is_text(node) {
            return if boundaries.start == Some(node) {
                ns.serialize_text_node(node, range.start.offset, None)
            } else {
                ns.serialize_text_node(node, 0, Some(range.end.offset))
            };
        }

        let is_common = self.common_ancestor == Some(node);
        if !is_common {
            if self.context.node_context().include_in_context(doc, node) {
                self.halt_range_hint = true;
            }
            if !self.halt_range_hint {
                if boundaries.start == Some(node) {
                    self.context_info_depth.start += 1;
                }
                if boundaries.end == Some(node) {
                    self.context_info_depth.end += 1;
                }
            }
            ns.serialize_node_start(node, 0, None, None)?;
        }

        let mut start_offset = 0;
        if boundaries.start == Some(node) {
            start_offset = self.start.offset_at_depth(depth).unwrap_or(0);
        }
        let end_offset = match boundaries.end.filter(|&n| n == node).and(self.end.offset_at_depth(depth)) {
            // Intermediate levels record the index of the child on the path,
            // which itself is (partially) inside the range.
            Some(offset) if Some(depth) != self.end.root_index => offset + 1,
            Some(offset) => offset,
            None => doc.child_count_in(node, self.kind),
        };

        if end_offset > start_offset {
            self.serialize_children(ns, node, start_offset, end_offset, depth)?;
        }

        if !is_common {
            ns.serialize_node_end(node, None)?;
        }
        Ok(())
    }

    fn serialize_children(
        &mut self,
        ns: &mut NodeSerializer<'_, '_>,
        node: NodeId,
        start_offset: u32,
        end_offset: u32,
        depth: usize,
    ) -> Result<(), EncodeError> {
        let doc = ns.document();
        if self.kind == TreeKind::Flat
            && let Some(shadow_root) = doc.shadow_root_for_selection(node)
        {
            // Light children of a host reach the output through its slots.
            return self.serialize_range_nodes(ns, shadow_root, depth + 1);
        }

        let mut child = doc.child_at_in(node, start_offset, self.kind);
        let mut index = start_offset;
        while let Some(current) = child {
            if index >= end_offset {
                break;
            }
            if index == start_offset || index == end_offset - 1 {
                self.serialize_range_nodes(ns, current, depth + 1)?;
            } else {
                ns.serialize_recursive(current, SerializeRoot::Yes, None)?;
            }
            child = doc.next_sibling_in(current, self.kind);
            index += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NoRangeContext;
    use crate::serializer::{ContentSerializer, MarkupSerializer, SerializerConfig};
    use crate::visibility::DomVisibility;
    use crate::OutputBuffer;
    use dom::Boundary;

    fn serialize(doc: &Document, range: Range) -> (String, ContextInfoDepth) {
        let flags = EncoderFlags::empty();
        let mut sink = MarkupSerializer::html();
        sink.init(&SerializerConfig {
            flags,
            wrap_column: 72,
            charset: None,
            is_copying: false,
            rewrite_encoding_declaration: false,
        });
        let mut out = OutputBuffer::new();
        let mut ns = NodeSerializer::new(doc, flags, &mut sink, &mut out, &DomVisibility);
        let mut rs = RangeSerializer::new(RangeContextSerializer::new(&NoRangeContext), flags);
        rs.serialize_range(&mut ns, &range).unwrap();
        let depth = rs.context_info_depth();
        drop(ns);
        (out.into_string(), depth)
    }

    /// `<div><p>ab</p><p>cd</p><p>ef</p></div>`
    fn paragraphs() -> (Document, NodeId, [NodeId; 3]) {
        let mut doc = Document::new_html();
        let div = doc.append_element(Document::ROOT, "div").unwrap();
        let mut texts = [div; 3];
        for (slot, text) in texts.iter_mut().zip(["ab", "cd", "ef"]) {
            let p = doc.append_element(div, "p").unwrap();
            *slot = doc.append_text(p, text).unwrap();
        }
        (doc, div, texts)
    }

    #[test]
    fn text_to_text_across_siblings() {
        let (doc, _, [t1, _, t3]) = paragraphs();
        let range = Range::new(Boundary::new(t1, 1), Boundary::new(t3, 1));
        let (out, depth) = serialize(&doc, range);
        assert_eq!(out, "<p>b</p><p>cd</p><p>e</p>");
        // Text boundaries are not counted, only the paragraphs around them.
        assert_eq!(depth, ContextInfoDepth { start: 1, end: 1 });
    }

    #[test]
    fn child_offsets_select_whole_children() {
        let (doc, div, _) = paragraphs();
        let range = Range::new(Boundary::new(div, 1), Boundary::new(div, 3));
        let (out, depth) = serialize(&doc, range);
        assert_eq!(out, "<p>cd</p><p>ef</p>");
        assert_eq!(depth, ContextInfoDepth::default());
    }

    #[test]
    fn single_text_node() {
        let (doc, _, [t1, _, _]) = paragraphs();
        let (out, _) = serialize(&doc, Range::new(Boundary::new(t1, 0), Boundary::new(t1, 1)));
        assert_eq!(out, "a");
    }

    #[test]
    fn collapsed_range_is_empty() {
        let (doc, div, _) = paragraphs();
        let (out, _) = serialize(&doc, Range::new(Boundary::new(div, 1), Boundary::new(div, 1)));
        assert_eq!(out, "");
    }

    #[test]
    fn end_at_container_start_excludes_its_children() {
        let (doc, div, [t1, _, _]) = paragraphs();
        let p2 = doc.child_at(div, 1).unwrap();
        let range = Range::new(Boundary::new(t1, 0), Boundary::new(p2, 0));
        let (out, _) = serialize(&doc, range);
        assert_eq!(out, "<p>ab</p><p></p>");
    }
}
