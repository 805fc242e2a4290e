use crate::{Document, NodeId};

/// Which tree a range's offsets address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TreeKind {
    /// Literal parent/child links.
    #[default]
    Dom,
    /// Flattened tree: slots expose their assigned nodes, shadow roots are
    /// entered.
    Flat,
}

/// One end of a range. `offset` is a UTF-16 position inside character data
/// and a child index inside anything else.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Boundary {
    pub container: NodeId,
    pub offset: u32,
}

impl Boundary {
    pub fn new(container: NodeId, offset: u32) -> Self {
        Self { container, offset }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    pub start: Boundary,
    pub end: Boundary,
    pub tree: TreeKind,
}

impl Range {
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self {
            start,
            end,
            tree: TreeKind::Dom,
        }
    }

    /// A range whose boundaries address the flattened tree and which may
    /// therefore cross shadow boundaries.
    pub fn in_flat_tree(start: Boundary, end: Boundary) -> Self {
        Self {
            start,
            end,
            tree: TreeKind::Flat,
        }
    }

    pub fn collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn may_cross_shadow_boundary(&self) -> bool {
        self.tree == TreeKind::Flat
    }

    /// Range over all of `node`'s content.
    pub fn select_node_contents(doc: &Document, node: NodeId) -> Self {
        Self::new(
            Boundary::new(node, 0),
            Boundary::new(node, doc.node_length(node)),
        )
    }

    /// Range around `node` inside its parent.
    pub fn select_node(doc: &Document, node: NodeId) -> Option<Self> {
        let parent = doc.parent(node)?;
        let index = doc.index_of(parent, node)?;
        Some(Self::new(
            Boundary::new(parent, index),
            Boundary::new(parent, index + 1),
        ))
    }

    pub fn closest_common_inclusive_ancestor(
        &self,
        doc: &Document,
        kind: TreeKind,
    ) -> Option<NodeId> {
        doc.closest_common_inclusive_ancestor(self.start.container, self.end.container, kind)
    }
}

/// Ordered ranges, as produced by table-cell multi-selection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    ranges: Vec<Range>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ranges(ranges: Vec<Range>) -> Self {
        Self { ranges }
    }

    pub fn add_range(&mut self, range: Range) {
        self.ranges.push(range);
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl From<Range> for Selection {
    fn from(range: Range) -> Self {
        Self {
            ranges: vec![range],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_report_collapse_and_common_ancestor() {
        let mut doc = Document::new_html();
        let p = doc.append_element(Document::ROOT, "p").unwrap();
        let a = doc.append_text(p, "hello").unwrap();
        let b = doc.append_element(p, "b").unwrap();
        let t = doc.append_text(b, "x").unwrap();

        let r = Range::new(Boundary::new(a, 1), Boundary::new(t, 1));
        assert!(!r.collapsed());
        assert_eq!(r.closest_common_inclusive_ancestor(&doc, TreeKind::Dom), Some(p));

        let c = Range::new(Boundary::new(a, 2), Boundary::new(a, 2));
        assert!(c.collapsed());

        let around = Range::select_node(&doc, b).unwrap();
        assert_eq!(around.start, Boundary::new(p, 1));
        assert_eq!(around.end, Boundary::new(p, 2));
        assert_eq!(Range::select_node_contents(&doc, a).end.offset, 5);
    }
}
