//! Flattened-tree (composed tree) addressing.
//!
//! In the flattened tree a `<slot>` with assigned nodes has those nodes as its
//! children, an assigned node has its slot as parent and a shadow root sits
//! between its host and the shadow children. Only author shadow roots are
//! entered; user-agent widget trees stay opaque.

use crate::types::{NodeData, ShadowRootKind};
use crate::{Document, NodeId, TreeKind};

impl Document {
    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.element(host).and_then(|data| data.shadow_root)
    }

    pub fn shadow_root_kind(&self, root: NodeId) -> Option<ShadowRootKind> {
        match self.data(root) {
            NodeData::ShadowRoot { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The shadow root of `host` if selection may enter it.
    pub fn shadow_root_for_selection(&self, host: NodeId) -> Option<NodeId> {
        self.shadow_root(host)
            .filter(|&root| self.shadow_root_kind(root) == Some(ShadowRootKind::Author))
    }

    pub fn is_slot(&self, id: NodeId) -> bool {
        self.is_element_named(id, "slot")
    }

    pub fn assigned_nodes(&self, slot: NodeId) -> &[NodeId] {
        self.element(slot)
            .map(|data| data.assigned_nodes.as_slice())
            .unwrap_or(&[])
    }

    pub fn assigned_slot(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).assigned_slot
    }

    fn uses_assigned_nodes(&self, id: NodeId) -> bool {
        self.is_slot(id) && !self.assigned_nodes(id).is_empty()
    }

    pub fn flat_tree_parent_for_selection(&self, node: NodeId) -> Option<NodeId> {
        if let Some(slot) = self.assigned_slot(node) {
            return Some(slot);
        }
        match self.data(node) {
            NodeData::ShadowRoot {
                host,
                kind: ShadowRootKind::Author,
            } => Some(*host),
            NodeData::ShadowRoot { .. } => None,
            _ => self.parent(node),
        }
    }

    pub fn flat_child_count(&self, node: NodeId) -> u32 {
        if self.uses_assigned_nodes(node) {
            self.assigned_nodes(node).len() as u32
        } else {
            self.child_count(node)
        }
    }

    pub fn child_at_in_flat_tree(&self, node: NodeId, index: u32) -> Option<NodeId> {
        if self.uses_assigned_nodes(node) {
            self.assigned_nodes(node).get(index as usize).copied()
        } else {
            self.child_at(node, index)
        }
    }

    /// Index of `child` under `parent` in the flattened tree. A shadow root has
    /// no index under its host.
    pub fn flat_tree_index_of(&self, parent: NodeId, child: NodeId) -> Option<u32> {
        if self.uses_assigned_nodes(parent) {
            return self
                .assigned_nodes(parent)
                .iter()
                .position(|&n| n == child)
                .map(|i| i as u32);
        }
        self.index_of(parent, child)
    }

    /// Next sibling in the flattened tree: the following assigned node inside a
    /// slot, the literal next sibling otherwise.
    pub fn flat_next_sibling(&self, node: NodeId) -> Option<NodeId> {
        if let Some(slot) = self.assigned_slot(node) {
            let assigned = self.assigned_nodes(slot);
            let at = assigned.iter().position(|&n| n == node)?;
            return assigned.get(at + 1).copied();
        }
        self.next_sibling(node)
    }

    pub fn flat_previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        if let Some(slot) = self.assigned_slot(node) {
            let assigned = self.assigned_nodes(slot);
            let at = assigned.iter().position(|&n| n == node)?;
            return at.checked_sub(1).map(|i| assigned[i]);
        }
        self.previous_sibling(node)
    }

    // Dispatch helpers used by code that is generic over the addressing mode.

    pub fn parent_in(&self, node: NodeId, kind: TreeKind) -> Option<NodeId> {
        match kind {
            TreeKind::Dom => self.parent(node),
            TreeKind::Flat => self.flat_tree_parent_for_selection(node),
        }
    }

    pub fn index_in(&self, parent: NodeId, child: NodeId, kind: TreeKind) -> Option<u32> {
        match kind {
            TreeKind::Dom => self.index_of(parent, child),
            TreeKind::Flat => self.flat_tree_index_of(parent, child),
        }
    }

    pub fn child_at_in(&self, parent: NodeId, index: u32, kind: TreeKind) -> Option<NodeId> {
        match kind {
            TreeKind::Dom => self.child_at(parent, index),
            TreeKind::Flat => self.child_at_in_flat_tree(parent, index),
        }
    }

    pub fn child_count_in(&self, node: NodeId, kind: TreeKind) -> u32 {
        match kind {
            TreeKind::Dom => self.child_count(node),
            TreeKind::Flat => self.flat_child_count(node),
        }
    }

    pub fn next_sibling_in(&self, node: NodeId, kind: TreeKind) -> Option<NodeId> {
        match kind {
            TreeKind::Dom => self.next_sibling(node),
            TreeKind::Flat => self.flat_next_sibling(node),
        }
    }

    pub fn previous_sibling_in(&self, node: NodeId, kind: TreeKind) -> Option<NodeId> {
        match kind {
            TreeKind::Dom => self.previous_sibling(node),
            TreeKind::Flat => self.flat_previous_sibling(node),
        }
    }

    /// `[node, parent, ...]` up to and including the document or a parentless
    /// root, following `kind` parents.
    pub fn inclusive_ancestors_in(&self, node: NodeId, kind: TreeKind) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(8);
        let mut cur = Some(node);
        while let Some(id) = cur {
            out.push(id);
            cur = self.parent_in(id, kind);
        }
        out
    }

    /// Inclusive ancestors of a boundary together with the offset at which the
    /// chain continues downward: `offsets[0]` is the boundary offset itself,
    /// `offsets[k]` the index of `ancestors[k - 1]` inside `ancestors[k]`.
    pub fn inclusive_ancestors_and_offsets(
        &self,
        node: NodeId,
        offset: u32,
        kind: TreeKind,
    ) -> (Vec<NodeId>, Vec<Option<u32>>) {
        let mut ancestors = Vec::with_capacity(8);
        let mut offsets = Vec::with_capacity(8);
        ancestors.push(node);
        offsets.push(Some(offset));
        let mut child = node;
        while let Some(parent) = self.parent_in(child, kind) {
            ancestors.push(parent);
            offsets.push(self.index_in(parent, child, kind));
            child = parent;
        }
        (ancestors, offsets)
    }

    pub fn closest_common_inclusive_ancestor(
        &self,
        a: NodeId,
        b: NodeId,
        kind: TreeKind,
    ) -> Option<NodeId> {
        let of_a = self.inclusive_ancestors_in(a, kind);
        let mut cur = Some(b);
        while let Some(id) = cur {
            if of_a.contains(&id) {
                return Some(id);
            }
            cur = self.parent_in(id, kind);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `<div id=host>[#shadow: <p><slot/></p>] <span>light</span></div>`
    fn shadow_doc() -> (Document, NodeId, NodeId, NodeId, NodeId, NodeId) {
        let mut doc = Document::new_html();
        let host = doc.append_element(Document::ROOT, "div").unwrap();
        let light = doc.append_element(host, "span").unwrap();
        let root = doc.attach_shadow(host, ShadowRootKind::Author).unwrap();
        let p = doc.append_element(root, "p").unwrap();
        let slot = doc.append_element(p, "slot").unwrap();
        doc.assign_slot(slot, &[light]).unwrap();
        (doc, host, light, root, p, slot)
    }

    #[test]
    fn flat_parents_route_through_slots_and_shadow_roots() {
        let (doc, host, light, root, p, slot) = shadow_doc();
        assert_eq!(doc.flat_tree_parent_for_selection(light), Some(slot));
        assert_eq!(doc.flat_tree_parent_for_selection(p), Some(root));
        assert_eq!(doc.flat_tree_parent_for_selection(root), Some(host));
        assert_eq!(doc.parent(light), Some(host));
        assert_eq!(
            doc.inclusive_ancestors_in(light, TreeKind::Flat),
            vec![light, slot, p, root, host, Document::ROOT]
        );
    }

    #[test]
    fn flat_offsets_use_assigned_nodes() {
        let (doc, host, light, _root, _p, slot) = shadow_doc();
        assert_eq!(doc.child_at_in_flat_tree(slot, 0), Some(light));
        assert_eq!(doc.flat_child_count(slot), 1);
        let (ancestors, offsets) = doc.inclusive_ancestors_and_offsets(light, 0, TreeKind::Flat);
        assert_eq!(ancestors[1], slot);
        assert_eq!(offsets[0], Some(0));
        assert_eq!(offsets[1], Some(0));
        // The shadow root has no index under its host.
        assert_eq!(offsets[4], None);
        assert_eq!(
            doc.closest_common_inclusive_ancestor(light, host, TreeKind::Flat),
            Some(host)
        );
    }

    #[test]
    fn user_agent_roots_are_opaque() {
        let mut doc = Document::new_html();
        let input = doc.append_element(Document::ROOT, "input").unwrap();
        let root = doc.attach_shadow(input, ShadowRootKind::UserAgent).unwrap();
        assert_eq!(doc.shadow_root(input), Some(root));
        assert_eq!(doc.shadow_root_for_selection(input), None);
        assert_eq!(doc.flat_tree_parent_for_selection(root), None);
    }
}
