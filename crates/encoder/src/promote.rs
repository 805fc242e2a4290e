//! Boundary promotion for copy operations.
//!
//! A copied range is widened so that an element whose significant content is
//! entirely selected is copied with its own tags. Points only climb while the
//! node they leave behind is the first (start) or last (end) significant child
//! of its parent, and never above the common ancestor or a root element.

use crate::error::EncodeError;
use dom::{Boundary, Document, NodeFlags, NodeId, Range, TreeKind};

/// A (container, offset) pair in the promoter's tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Point {
    pub container: NodeId,
    pub offset: u32,
}

impl Point {
    fn new(container: NodeId, offset: u32) -> Self {
        Self { container, offset }
    }
}

impl From<Boundary> for Point {
    fn from(b: Boundary) -> Self {
        Self::new(b.container, b.offset)
    }
}

impl From<Point> for Boundary {
    fn from(p: Point) -> Self {
        Boundary::new(p.container, p.offset)
    }
}

pub(crate) struct Promoter<'d> {
    doc: &'d Document,
    kind: TreeKind,
    is_text_widget: bool,
    include_common_ancestor: bool,
}

impl<'d> Promoter<'d> {
    pub fn new(doc: &'d Document, kind: TreeKind, is_text_widget: bool) -> Self {
        Self {
            doc,
            kind,
            is_text_widget,
            include_common_ancestor: true,
        }
    }

    pub fn include_common_ancestor(mut self, include: bool) -> Self {
        self.include_common_ancestor = include;
        self
    }

    pub fn promote_range(&self, range: &Range) -> Result<Range, EncodeError> {
        let common = range
            .closest_common_inclusive_ancestor(self.doc, self.kind)
            .ok_or(EncodeError::Promotion("range boundaries share no ancestor"))?;

        let mut start = self.promoted_start(range.start.into(), common)?;
        let mut end = self.promoted_end(range.end.into(), common)?;

        if self.include_common_ancestor && start.container == common && end.container == common {
            (start, end) = self.promote_ancestor_chain(common, start.offset, end.offset)?;
        }

        log::trace!(
            target: "encoder.copy",
            "promoted {:?}..{:?} to {:?}..{:?}",
            range.start,
            range.end,
            start,
            end
        );
        Ok(Range {
            start: start.into(),
            end: end.into(),
            tree: range.tree,
        })
    }

    /// Climb one level at a time while both points promote onto the parent
    /// and editability stays the same.
    fn promote_ancestor_chain(
        &self,
        container: NodeId,
        start: u32,
        end: u32,
    ) -> Result<(Point, Point), EncodeError> {
        let editable = self.doc.is_editable(container);
        let (mut container, mut start, mut end) = (container, start, end);
        while let Some(parent) = self.doc.parent_in(container, self.kind) {
            let s = self.promoted_start(Point::new(container, start), parent)?;
            let e = self.promoted_end(Point::new(container, end), parent)?;
            if s.container != parent
                || e.container != parent
                || self.doc.is_editable(parent) != editable
            {
                break;
            }
            container = parent;
            start = s.offset;
            end = e.offset;
        }
        Ok((Point::new(container, start), Point::new(container, end)))
    }

    fn promoted_start(&self, at: Point, common: NodeId) -> Result<Point, EncodeError> {
        if at.container == common {
            return Ok(at);
        }
        let doc = self.doc;
        let mut reset_promotion = false;

        let mut point = if doc.is_text(at.container) {
            if at.offset != 0 {
                if !doc.text_starts_with_only_whitespace(at.container, at.offset) {
                    return Ok(at);
                }
                reset_promotion = true;
            }
            let Some(parent_point) = self.parent_point(at)? else {
                log::warn!(target: "encoder.copy", "text {:?} has no parent point", at.container);
                return Ok(at);
            };
            if parent_point.container == common {
                return Ok(at);
            }
            parent_point
        } else if doc.has_children(at.container) && !self.is_end_of_container(at) {
            at
        } else {
            let Some(parent_point) = self.parent_point(at)? else {
                log::warn!(target: "encoder.copy", "{:?} has no parent point", at.container);
                return Ok(at);
            };
            parent_point
        };

        match self.child_at(point) {
            Some(child) if self.is_root(child) => return Ok(at),
            Some(_) => {}
            None => log::warn!(target: "encoder.copy", "start point {point:?} names no child"),
        }

        while point.container != common
            && !self.is_root(point.container)
            && self.child_is_first_node(point)
        {
            if reset_promotion && doc.is_block_element(point.container) {
                reset_promotion = false;
            }
            match self.parent_point(point)? {
                Some(parent_point) => point = parent_point,
                None => {
                    log::warn!(target: "encoder.copy", "stopped at {:?}", point.container);
                    point = Point::new(point.container, 0);
                    break;
                }
            }
        }

        Ok(if reset_promotion { at } else { point })
    }

    fn promoted_end(&self, at: Point, common: NodeId) -> Result<Point, EncodeError> {
        if at.container == common {
            return Ok(at);
        }
        let doc = self.doc;
        let mut reset_promotion = false;

        let mut point = if doc.is_text(at.container) {
            if at.offset < doc.node_length(at.container) {
                if !doc.text_ends_with_only_whitespace(at.container, at.offset) {
                    return Ok(at);
                }
                reset_promotion = true;
            }
            let Some(parent_point) = self.parent_point(at)? else {
                log::warn!(target: "encoder.copy", "text {:?} has no parent point", at.container);
                return Ok(at);
            };
            if parent_point.container == common {
                return Ok(at);
            }
            parent_point
        } else if doc.has_children(at.container) {
            if at.offset == 0 {
                at
            } else {
                // Climb from the last selected child, not the one after it.
                let previous = at.offset - 1;
                if doc.child_at_in(at.container, previous, self.kind).is_none() {
                    return Err(EncodeError::Promotion("end point is past the last child"));
                }
                Point::new(at.container, previous)
            }
        } else {
            let Some(parent_point) = self
                .parent_point(at)
                .map_err(|_| EncodeError::Promotion("end container has no parent"))?
            else {
                log::warn!(target: "encoder.copy", "{:?} has no parent point", at.container);
                return Ok(at);
            };
            parent_point
        };

        match self.child_at(point) {
            Some(child) if self.is_root(child) => return Ok(at),
            Some(_) => {}
            None => log::warn!(target: "encoder.copy", "end point {point:?} names no child"),
        }

        while point.container != common
            && !self.is_root(point.container)
            && self.child_is_last_node(point)
        {
            if reset_promotion && doc.is_block_element(point.container) {
                reset_promotion = false;
            }
            if let Some(parent_point) = self.parent_point(point)? {
                point = parent_point;
                continue;
            }
            // A shadow root has no index under its host; stay inside it.
            let is_host_shadow_root = doc
                .parent_in(point.container, self.kind)
                .and_then(|parent| doc.shadow_root_for_selection(parent))
                == Some(point.container);
            if !is_host_shadow_root {
                return Err(EncodeError::Promotion("end point lost its parent"));
            }
            point = Point::new(point.container, 0);
            break;
        }

        if reset_promotion {
            return Ok(at);
        }
        // The promoted end sits after the node it reached.
        Ok(match self.child_at(point) {
            Some(_) => Point::new(point.container, point.offset + 1),
            None => Point::new(
                point.container,
                doc.child_count_in(point.container, self.kind),
            ),
        })
    }

    /// The point naming `at`'s container inside its parent. `Ok(None)` when
    /// the container has no index in its parent.
    fn parent_point(&self, at: Point) -> Result<Option<Point>, EncodeError> {
        let doc = self.doc;
        let container = at.container;
        if doc.is_document(container) {
            return Err(EncodeError::Promotion("the document has no parent point"));
        }
        if self.kind == TreeKind::Flat && doc.is_shadow_root(container) {
            let host = doc
                .host(container)
                .ok_or(EncodeError::Promotion("shadow root without host"))?;
            return Ok(self.point_of(host));
        }
        let parent = doc
            .parent_in(container, self.kind)
            .ok_or(EncodeError::Promotion("node has no parent"))?;
        Ok(self
            .index_of(parent, container)
            .map(|index| Point::new(parent, index)))
    }

    fn point_of(&self, child: NodeId) -> Option<Point> {
        let parent = self.doc.parent_in(child, self.kind)?;
        let index = self.index_of(parent, child)?;
        Some(Point::new(parent, index))
    }

    fn index_of(&self, parent: NodeId, child: NodeId) -> Option<u32> {
        let doc = self.doc;
        match self.kind {
            TreeKind::Dom => doc.index_of(parent, child),
            // Widget shadow trees are not entered, so their hosts keep literal
            // child indices.
            TreeKind::Flat
                if doc.shadow_root(parent).is_some()
                    && doc.shadow_root_for_selection(parent).is_none() =>
            {
                doc.index_of(parent, child)
            }
            TreeKind::Flat => doc.flat_tree_index_of(parent, child),
        }
    }

    fn child_at(&self, at: Point) -> Option<NodeId> {
        self.doc.child_at_in(at.container, at.offset, self.kind)
    }

    fn is_end_of_container(&self, at: Point) -> bool {
        at.offset >= self.doc.child_count_in(at.container, self.kind)
    }

    fn is_root(&self, node: NodeId) -> bool {
        if self.is_text_widget {
            return self.doc.is_element_named(node, "div");
        }
        self.doc.is_any_element_of(node, &["body", "td", "th", "slot"])
    }

    fn assigned_nodes_of_slot(&self, container: NodeId) -> Option<&'d [NodeId]> {
        if self.kind != TreeKind::Flat || !self.doc.is_slot(container) {
            return None;
        }
        let assigned = self.doc.assigned_nodes(container);
        (!assigned.is_empty()).then_some(assigned)
    }

    /// No significant sibling precedes the child at `at`.
    fn child_is_first_node(&self, at: Point) -> bool {
        let doc = self.doc;
        let significant = |node: NodeId| !doc.text_is_only_whitespace(node);
        if let Some(assigned) = self.assigned_nodes_of_slot(at.container) {
            let upto = (at.offset as usize).min(assigned.len());
            return !assigned[..upto].iter().any(|&n| significant(n));
        }
        let mut sibling = match self.child_at(at) {
            Some(child) => doc.previous_sibling(child),
            None => doc.last_child(at.container),
        };
        while let Some(node) = sibling {
            if significant(node) {
                return false;
            }
            sibling = doc.previous_sibling(node);
        }
        true
    }

    /// No significant sibling follows the child at `at`. Editor padding
    /// breaks do not count.
    fn child_is_last_node(&self, at: Point) -> bool {
        let doc = self.doc;
        let significant = |node: NodeId| {
            let padding_br = doc.is_element_named(node, "br")
                && doc.flags(node).contains(NodeFlags::PADDING_BR);
            !padding_br && !doc.text_is_only_whitespace(node)
        };
        if let Some(assigned) = self.assigned_nodes_of_slot(at.container) {
            let next = at.offset as usize + 1;
            return assigned
                .get(next..)
                .is_none_or(|rest| !rest.iter().any(|&n| significant(n)));
        }
        let mut sibling = self.child_at(at).and_then(|child| doc.next_sibling(child));
        while let Some(node) = sibling {
            if significant(node) {
                return false;
            }
            sibling = doc.next_sibling(node);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::ShadowRootKind;

    fn promote(doc: &Document, range: Range) -> Range {
        let kind = range.tree;
        Promoter::new(doc, kind, false).promote_range(&range).unwrap()
    }

    /// `<body><div><p>Hello <b>world</b></p>\n</div></body>`
    fn body_doc() -> (Document, NodeId, NodeId, NodeId, NodeId, NodeId) {
        let mut doc = Document::new_html();
        let html = doc.append_element(Document::ROOT, "html").unwrap();
        let body = doc.append_element(html, "body").unwrap();
        let div = doc.append_element(body, "div").unwrap();
        let p = doc.append_element(div, "p").unwrap();
        let hello = doc.append_text(p, "Hello ").unwrap();
        let b = doc.append_element(p, "b").unwrap();
        let world = doc.append_text(b, "world").unwrap();
        doc.append_text(div, "\n").unwrap();
        (doc, body, div, p, hello, world)
    }

    #[test]
    fn fully_selected_paragraph_climbs_to_the_root_element() {
        let (doc, body, _div, p, _hello, _world) = body_doc();
        let promoted = promote(&doc, Range::new(Boundary::new(p, 0), Boundary::new(p, 2)));
        // The trailing newline in the div is insignificant, so the div is
        // taken whole; body stops the climb.
        assert_eq!(promoted.start, Boundary::new(body, 0));
        assert_eq!(promoted.end, Boundary::new(body, 1));
    }

    #[test]
    fn end_climbs_out_of_fully_selected_inline() {
        let (doc, _body, _div, p, hello, world) = body_doc();
        let promoted = promote(&doc, Range::new(Boundary::new(hello, 0), Boundary::new(world, 5)));
        // The start text's parent is the common ancestor, so it stays.
        assert_eq!(promoted.start, Boundary::new(hello, 0));
        assert_eq!(promoted.end, Boundary::new(p, 2));
    }

    #[test]
    fn partial_text_is_not_promoted() {
        let (doc, _body, _div, _p, hello, world) = body_doc();
        let range = Range::new(Boundary::new(hello, 2), Boundary::new(world, 3));
        assert_eq!(promote(&doc, range), range);
    }

    #[test]
    fn text_inside_a_single_element_stays_put() {
        let (doc, _body, _div, _p, _hello, world) = body_doc();
        let range = Range::new(Boundary::new(world, 0), Boundary::new(world, 3));
        assert_eq!(promote(&doc, range), range);
    }

    #[test]
    fn whitespace_prefix_promotes_only_across_a_block() {
        let mut doc = Document::new_html();
        let body = doc.append_element(Document::ROOT, "body").unwrap();
        let p = doc.append_element(body, "p").unwrap();
        let lead = doc.append_text(p, "  lead").unwrap();
        let span = doc.append_element(body, "span").unwrap();
        let tail = doc.append_text(span, "  tail").unwrap();
        let i = doc.append_element(body, "i").unwrap();
        let end = doc.append_text(i, "end").unwrap();

        let across_block = promote(&doc, Range::new(Boundary::new(lead, 2), Boundary::new(tail, 6)));
        assert_eq!(across_block.start, Boundary::new(body, 0));
        assert_eq!(across_block.end, Boundary::new(body, 2));

        // No block crossed before reaching body: the whitespace promotion is
        // undone.
        let inline = promote(&doc, Range::new(Boundary::new(tail, 2), Boundary::new(end, 3)));
        assert_eq!(inline.start, Boundary::new(tail, 2));
    }

    #[test]
    fn trailing_padding_break_is_insignificant() {
        let mut doc = Document::new_html();
        let body = doc.append_element(Document::ROOT, "body").unwrap();
        let div = doc.append_element(body, "div").unwrap();
        doc.append_text(div, "line").unwrap();
        let br = doc.append_element(div, "br").unwrap();

        let range = Range::new(Boundary::new(div, 0), Boundary::new(div, 1));
        assert_eq!(promote(&doc, range), range);

        doc.set_flags(br, NodeFlags::PADDING_BR);
        let promoted = promote(&doc, range);
        assert_eq!(promoted.start, Boundary::new(body, 0));
        assert_eq!(promoted.end, Boundary::new(body, 1));
    }

    #[test]
    fn table_cells_stop_promotion() {
        let mut doc = Document::new_html();
        let table = doc.append_element(Document::ROOT, "table").unwrap();
        let tr = doc.append_element(table, "tr").unwrap();
        let td = doc.append_element(tr, "td").unwrap();
        doc.append_text(td, "cell").unwrap();

        let range = Range::new(Boundary::new(td, 0), Boundary::new(td, 1));
        assert_eq!(promote(&doc, range), range);
    }

    #[test]
    fn editability_change_stops_the_ancestor_chain() {
        let mut doc = Document::new_html();
        let body = doc.append_element(Document::ROOT, "body").unwrap();
        let host = doc.append_element(body, "div").unwrap();
        doc.set_attribute(host, "contenteditable", Some("true"));
        let p = doc.append_element(host, "p").unwrap();
        doc.append_text(p, "edit").unwrap();

        let promoted = promote(&doc, Range::new(Boundary::new(p, 0), Boundary::new(p, 1)));
        assert_eq!(promoted.start, Boundary::new(host, 0));
        assert_eq!(promoted.end, Boundary::new(host, 1));
    }

    #[test]
    fn text_widget_stops_at_div() {
        let mut doc = Document::new_html();
        let input = doc.append_element(Document::ROOT, "input").unwrap();
        let div = doc.append_element(input, "div").unwrap();
        doc.append_text(div, "typed").unwrap();
        let range = Range::new(Boundary::new(div, 0), Boundary::new(div, 1));

        let widget = Promoter::new(&doc, TreeKind::Dom, true)
            .promote_range(&range)
            .unwrap();
        assert_eq!(widget, range);

        let page = promote(&doc, range);
        assert_eq!(page.start, Boundary::new(Document::ROOT, 0));
        assert_eq!(page.end, Boundary::new(Document::ROOT, 1));
    }

    #[test]
    fn ancestor_chain_can_be_switched_off() {
        let (doc, _body, _div, p, _hello, _world) = body_doc();
        let range = Range::new(Boundary::new(p, 0), Boundary::new(p, 2));
        let promoted = Promoter::new(&doc, TreeKind::Dom, false)
            .include_common_ancestor(false)
            .promote_range(&range)
            .unwrap();
        assert_eq!(promoted, range);
    }

    #[test]
    fn slotted_content_stops_at_the_slot() {
        let mut doc = Document::new_html();
        let body = doc.append_element(Document::ROOT, "body").unwrap();
        let host = doc.append_element(body, "div").unwrap();
        let light = doc.append_element(host, "span").unwrap();
        doc.append_text(light, "slotted").unwrap();
        let root = doc.attach_shadow(host, ShadowRootKind::Author).unwrap();
        let slot = doc.append_element(root, "slot").unwrap();
        doc.assign_slot(slot, &[light]).unwrap();

        let promoted = promote(
            &doc,
            Range::in_flat_tree(Boundary::new(light, 0), Boundary::new(light, 1)),
        );
        assert_eq!(promoted.start, Boundary::new(slot, 0));
        assert_eq!(promoted.end, Boundary::new(slot, 1));
        assert_eq!(promoted.tree, TreeKind::Flat);
    }
}
