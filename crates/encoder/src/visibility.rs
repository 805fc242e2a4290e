use dom::{Document, NodeFlags, NodeId};

/// Rendering facts the engine consults when `SKIP_INVISIBLE_CONTENT` is set.
pub trait Visibility {
    /// Whether layout produced a box for `node`.
    fn has_frame(&self, doc: &Document, node: NodeId) -> bool {
        !doc.flags(node).contains(NodeFlags::NO_FRAME)
    }

    fn is_visible(&self, doc: &Document, node: NodeId) -> bool;

    /// Unselectable nodes keep their children but lose their own markers.
    fn is_selectable(&self, doc: &Document, node: NodeId) -> bool;
}

/// Reads the rendering flags stored on the dom nodes.
#[derive(Clone, Copy, Debug, Default)]
pub struct DomVisibility;

impl Visibility for DomVisibility {
    fn is_visible(&self, doc: &Document, node: NodeId) -> bool {
        if doc.is_document(node) {
            return true;
        }
        // A shadow root has no box of its own.
        let node = if doc.is_shadow_root(node) {
            match doc.host(node) {
                Some(host) => host,
                None => return true,
            }
        } else {
            node
        };

        if !self.has_frame(doc, node) {
            return doc.is_text(node)
                || (doc.is_element(node) && doc.flags(node).contains(NodeFlags::DISPLAY_CONTENTS))
                || doc.is_element_named(node, "rp");
        }
        !(doc.is_text(node) && doc.flags(node).contains(NodeFlags::VISIBILITY_HIDDEN))
    }

    fn is_selectable(&self, doc: &Document, node: NodeId) -> bool {
        !(self.has_frame(doc, node) && doc.flags(node).contains(NodeFlags::UNSELECTABLE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::ShadowRootKind;

    #[test]
    fn frameless_nodes() {
        let mut doc = Document::new_html();
        let div = doc.append_element(Document::ROOT, "div").unwrap();
        let text = doc.append_text(div, "x").unwrap();
        let rp = doc.append_element(div, "rp").unwrap();
        let contents = doc.append_element(div, "span").unwrap();
        for id in [div, text, rp, contents] {
            doc.set_flags(id, NodeFlags::NO_FRAME);
        }
        doc.set_flags(contents, NodeFlags::DISPLAY_CONTENTS);

        let v = DomVisibility;
        assert!(!v.is_visible(&doc, div));
        assert!(v.is_visible(&doc, text));
        assert!(v.is_visible(&doc, rp));
        assert!(v.is_visible(&doc, contents));
        assert!(v.is_visible(&doc, Document::ROOT));
    }

    #[test]
    fn hidden_text_and_shadow_roots() {
        let mut doc = Document::new_html();
        let host = doc.append_element(Document::ROOT, "div").unwrap();
        let root = doc.attach_shadow(host, ShadowRootKind::Author).unwrap();
        let text = doc.append_text(host, "x").unwrap();
        doc.set_flags(text, NodeFlags::VISIBILITY_HIDDEN);

        let v = DomVisibility;
        assert!(!v.is_visible(&doc, text));
        assert!(v.is_visible(&doc, root));
        doc.set_flags(host, NodeFlags::NO_FRAME);
        assert!(!v.is_visible(&doc, root));
    }

    #[test]
    fn unselectable_only_counts_with_a_frame() {
        let mut doc = Document::new_html();
        let a = doc.append_element(Document::ROOT, "span").unwrap();
        let b = doc.append_element(Document::ROOT, "span").unwrap();
        doc.set_flags(a, NodeFlags::UNSELECTABLE);
        doc.set_flags(b, NodeFlags::UNSELECTABLE | NodeFlags::NO_FRAME);
        assert!(!DomVisibility.is_selectable(&doc, a));
        assert!(DomVisibility.is_selectable(&doc, b));
    }
}
