use crate::{Document, NodeId};

/// Pre-order walk over `root` and its literal descendants (template content
/// and shadow trees are not entered).
pub fn descendants(doc: &Document, root: NodeId) -> Descendants<'_> {
    Descendants {
        doc,
        root,
        next: Some(root),
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.first_child(current).or_else(|| {
            let mut cur = current;
            loop {
                if cur == self.root {
                    return None;
                }
                if let Some(sibling) = self.doc.next_sibling(cur) {
                    return Some(sibling);
                }
                cur = self.doc.parent(cur)?;
            }
        });
        Some(current)
    }
}

pub fn find_first_element(doc: &Document, root: NodeId, name: &str) -> Option<NodeId> {
    descendants(doc, root).find(|&id| doc.is_element_named(id, name))
}

pub fn find_first_text(doc: &Document, root: NodeId, needle: &str) -> Option<NodeId> {
    descendants(doc, root).find(|&id| {
        doc.is_text(id)
            && doc
                .character_data(id)
                .is_some_and(|text| text.contains(needle))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preorder_stays_inside_root() {
        let mut doc = Document::new_html();
        let a = doc.append_element(Document::ROOT, "a").unwrap();
        let b = doc.append_element(a, "b").unwrap();
        let t = doc.append_text(b, "x").unwrap();
        let c = doc.append_element(a, "c").unwrap();
        let after = doc.append_element(Document::ROOT, "d").unwrap();

        let order: Vec<_> = descendants(&doc, a).collect();
        assert_eq!(order, vec![a, b, t, c]);
        assert!(!order.contains(&after));
        assert_eq!(find_first_element(&doc, Document::ROOT, "C"), Some(c));
        assert_eq!(find_first_text(&doc, Document::ROOT, "x"), Some(t));
    }
}
