use dom::{Document, NodeId};

/// Substitution chosen by a [`NodeFixup`] for one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fixup {
    /// Emitted in place of the original node. Must belong to the same
    /// document; it is typically detached.
    pub node: NodeId,
    /// Walk the substitute's children instead of the original's.
    pub serialize_children: bool,
}

/// Lets a caller replace what is emitted for a node without changing which
/// original nodes the traversal visits.
pub trait NodeFixup {
    fn fixup_node(&self, doc: &Document, node: NodeId) -> Option<Fixup>;
}

impl<F> NodeFixup for F
where
    F: Fn(&Document, NodeId) -> Option<Fixup>,
{
    fn fixup_node(&self, doc: &Document, node: NodeId) -> Option<Fixup> {
        self(doc, node)
    }
}
