//! Arena-backed document tree.
//!
//! Invariants:
//! - Every node lives in exactly one arena slot for the lifetime of the document;
//!   removal is not supported, so `NodeId`s never dangle.
//! - Parent/child/sibling links are kept consistent by `append_child`; a node has
//!   at most one parent.
//! - Shadow roots and template content fragments are parentless roots linked to
//!   their host through their node data, never through `parent`.
//! - Element and attribute names are stored ASCII-lowercase.

use crate::types::{ElementData, Node, NodeData, NodeFlags, NodeId, NodeType, ShadowRootKind};
use url::Url;

#[derive(Debug)]
pub enum TreeError {
    /// The parent cannot hold children (text, comment, doctype, ...).
    NotAContainer(NodeId),
    /// The child already has a parent or is an ancestor of the parent.
    HierarchyRequest { parent: NodeId, child: NodeId },
    NotAnElement(NodeId),
    AlreadyAHost(NodeId),
}

impl std::fmt::Display for TreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeError::NotAContainer(id) => write!(f, "node {id:?} cannot have children"),
            TreeError::HierarchyRequest { parent, child } => {
                write!(f, "cannot append {child:?} to {parent:?}")
            }
            TreeError::NotAnElement(id) => write!(f, "node {id:?} is not an element"),
            TreeError::AlreadyAHost(id) => write!(f, "element {id:?} already hosts a shadow root"),
        }
    }
}

impl std::error::Error for TreeError {}

#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    is_html: bool,
    script_enabled: bool,
    design_mode: bool,
    base_url: Option<Url>,
}

impl Document {
    pub const ROOT: NodeId = NodeId(0);

    /// New HTML document containing only the document node.
    pub fn new_html() -> Self {
        Self::with_kind(true)
    }

    /// New XML document containing only the document node.
    pub fn new_xml() -> Self {
        Self::with_kind(false)
    }

    fn with_kind(is_html: bool) -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
            is_html,
            script_enabled: true,
            design_mode: false,
            base_url: None,
        }
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    pub fn is_html(&self) -> bool {
        self.is_html
    }

    pub fn script_enabled(&self) -> bool {
        self.script_enabled
    }

    pub fn set_script_enabled(&mut self, enabled: bool) {
        self.script_enabled = enabled;
    }

    pub fn design_mode(&self) -> bool {
        self.design_mode
    }

    pub fn set_design_mode(&mut self, on: bool) {
        self.design_mode = on;
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn set_base_url(&mut self, url: Option<Url>) {
        self.base_url = url;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // The document node itself is always present.
        false
    }

    // ---------------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------------

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element(ElementData::new(name)))
    }

    pub fn create_element_with_attributes(
        &mut self,
        name: &str,
        attributes: Vec<(String, Option<String>)>,
    ) -> NodeId {
        let mut data = ElementData::new(name);
        data.attributes = attributes
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        self.push(NodeData::Element(data))
    }

    /// Creates a `<template>` element together with its content fragment.
    pub fn create_template(&mut self) -> NodeId {
        let template = self.create_element("template");
        let content = self.push(NodeData::DocumentFragment {
            host: Some(template),
        });
        if let NodeData::Element(data) = &mut self.nodes[template.index()].data {
            data.template_content = Some(content);
        }
        template
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub fn create_cdata_section(&mut self, text: &str) -> NodeId {
        self.push(NodeData::CDataSection(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Comment(text.to_string()))
    }

    pub fn create_processing_instruction(&mut self, target: &str, data: &str) -> NodeId {
        self.push(NodeData::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        })
    }

    pub fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> NodeId {
        self.push(NodeData::DocumentType {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        })
    }

    pub fn create_document_fragment(&mut self) -> NodeId {
        self.push(NodeData::DocumentFragment { host: None })
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if !self.can_have_children(parent) {
            return Err(TreeError::NotAContainer(parent));
        }
        let hierarchy_error = TreeError::HierarchyRequest { parent, child };
        if child == Self::ROOT
            || self.nodes[child.index()].parent.is_some()
            || matches!(self.nodes[child.index()].data, NodeData::ShadowRoot { .. })
            || self.is_inclusive_ancestor(child, parent)
        {
            return Err(hierarchy_error);
        }

        let prev_last = self.nodes[parent.index()].last_child;
        {
            let node = &mut self.nodes[child.index()];
            node.parent = Some(parent);
            node.prev_sibling = prev_last;
            node.next_sibling = None;
        }
        match prev_last {
            Some(last) => self.nodes[last.index()].next_sibling = Some(child),
            None => self.nodes[parent.index()].first_child = Some(child),
        }
        let parent_node = &mut self.nodes[parent.index()];
        parent_node.last_child = Some(child);
        parent_node.child_count += 1;
        Ok(())
    }

    /// Convenience: create an element and append it in one step.
    pub fn append_element(&mut self, parent: NodeId, name: &str) -> Result<NodeId, TreeError> {
        let id = self.create_element(name);
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Convenience: create a text node and append it in one step.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, TreeError> {
        let id = self.create_text(text);
        self.append_child(parent, id)?;
        Ok(id)
    }

    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: Option<&str>) {
        let NodeData::Element(data) = &mut self.nodes[element.index()].data else {
            return;
        };
        let name = name.to_ascii_lowercase();
        let value = value.map(str::to_string);
        match data.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => data.attributes.push((name, value)),
        }
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) {
        match &mut self.nodes[node.index()].data {
            NodeData::Text(t) | NodeData::CDataSection(t) | NodeData::Comment(t) => {
                *t = text.to_string();
            }
            NodeData::ProcessingInstruction { data, .. } => *data = text.to_string(),
            _ => {}
        }
    }

    pub fn set_flags(&mut self, node: NodeId, flags: NodeFlags) {
        self.nodes[node.index()].flags |= flags;
    }

    pub fn flags(&self, node: NodeId) -> NodeFlags {
        self.nodes[node.index()].flags
    }

    pub fn attach_shadow(&mut self, host: NodeId, kind: ShadowRootKind) -> Result<NodeId, TreeError> {
        match &self.nodes[host.index()].data {
            NodeData::Element(data) if data.shadow_root.is_some() => {
                return Err(TreeError::AlreadyAHost(host));
            }
            NodeData::Element(_) => {}
            _ => return Err(TreeError::NotAnElement(host)),
        }
        let root = self.push(NodeData::ShadowRoot { host, kind });
        if let NodeData::Element(data) = &mut self.nodes[host.index()].data {
            data.shadow_root = Some(root);
        }
        Ok(root)
    }

    /// Assign `nodes` to `slot`, replacing any previous assignment.
    pub fn assign_slot(&mut self, slot: NodeId, nodes: &[NodeId]) -> Result<(), TreeError> {
        let previous = match &mut self.nodes[slot.index()].data {
            NodeData::Element(data) => std::mem::take(&mut data.assigned_nodes),
            _ => return Err(TreeError::NotAnElement(slot)),
        };
        for id in previous {
            self.nodes[id.index()].assigned_slot = None;
        }
        for &id in nodes {
            self.nodes[id.index()].assigned_slot = Some(slot);
        }
        if let NodeData::Element(data) = &mut self.nodes[slot.index()].data {
            data.assigned_nodes = nodes.to_vec();
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Structure queries
    // ---------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()].data
    }

    pub fn node_type(&self, id: NodeId) -> NodeType {
        self.data(id).node_type()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&p| self.is_element(p))
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].last_child
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].next_sibling
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].prev_sibling
    }

    pub fn child_count(&self, id: NodeId) -> u32 {
        self.nodes[id.index()].child_count
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        self.first_child(id).is_some()
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.first_child(id),
        }
    }

    pub fn child_at(&self, id: NodeId, index: u32) -> Option<NodeId> {
        self.children(id).nth(index as usize)
    }

    pub fn index_of(&self, parent: NodeId, child: NodeId) -> Option<u32> {
        if self.parent(child) != Some(parent) {
            return None;
        }
        self.children(parent)
            .position(|c| c == child)
            .map(|i| i as u32)
    }

    /// First child, or for a `<template>` the first child of its content.
    pub fn first_child_of_template_or_node(&self, id: NodeId) -> Option<NodeId> {
        match self.template_content(id) {
            Some(content) => self.first_child(content),
            None => self.first_child(id),
        }
    }

    pub fn template_content(&self, id: NodeId) -> Option<NodeId> {
        self.element(id).and_then(|data| data.template_content)
    }

    /// Host of a shadow root or of a template content fragment.
    pub fn host(&self, id: NodeId) -> Option<NodeId> {
        match self.data(id) {
            NodeData::ShadowRoot { host, .. } => Some(*host),
            NodeData::DocumentFragment { host } => *host,
            _ => None,
        }
    }

    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.parent(id);
        }
        false
    }

    /// `[node, parent, grandparent, ...]` following literal parents.
    pub fn inclusive_ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(8);
        let mut cur = Some(node);
        while let Some(id) = cur {
            out.push(id);
            cur = self.parent(id);
        }
        out
    }

    fn can_have_children(&self, id: NodeId) -> bool {
        matches!(
            self.data(id),
            NodeData::Document
                | NodeData::Element(_)
                | NodeData::DocumentFragment { .. }
                | NodeData::ShadowRoot { .. }
        )
    }

    // ---------------------------------------------------------------------
    // Node-kind queries
    // ---------------------------------------------------------------------

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.nodes[id.index()].element()
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// Text or CDATA section.
    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(
            self.data(id),
            NodeData::Text(_) | NodeData::CDataSection(_)
        )
    }

    pub fn is_shadow_root(&self, id: NodeId) -> bool {
        matches!(self.data(id), NodeData::ShadowRoot { .. })
    }

    pub fn is_document(&self, id: NodeId) -> bool {
        matches!(self.data(id), NodeData::Document)
    }

    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|data| data.name.as_str())
    }

    pub fn is_element_named(&self, id: NodeId, name: &str) -> bool {
        self.element_name(id)
            .is_some_and(|n| n.eq_ignore_ascii_case(name))
    }

    pub fn is_any_element_of(&self, id: NodeId, names: &[&str]) -> bool {
        self.element_name(id)
            .is_some_and(|n| names.iter().any(|c| n.eq_ignore_ascii_case(c)))
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|data| data.attribute(name))
    }

    pub fn character_data(&self, id: NodeId) -> Option<&str> {
        self.data(id).character_data()
    }

    /// Length in DOM units: UTF-16 code units for character data, child count
    /// otherwise.
    pub fn node_length(&self, id: NodeId) -> u32 {
        match self.character_data(id) {
            Some(text) => tools::utf16::utf16_len(text) as u32,
            None => self.child_count(id),
        }
    }

    /// Whitespace-only character data. Elements and other nodes are never
    /// whitespace-only.
    pub fn text_is_only_whitespace(&self, id: NodeId) -> bool {
        match self.data(id) {
            NodeData::Text(text) | NodeData::CDataSection(text) => {
                tools::whitespace::is_only_whitespace(text)
            }
            _ => false,
        }
    }

    /// Everything before UTF-16 `offset` is whitespace.
    pub fn text_starts_with_only_whitespace(&self, id: NodeId, offset: u32) -> bool {
        self.character_data(id).is_some_and(|text| {
            let prefix = tools::utf16::slice(text, 0, Some(offset as usize));
            tools::whitespace::is_only_whitespace(prefix)
        })
    }

    /// Everything from UTF-16 `offset` on is whitespace.
    pub fn text_ends_with_only_whitespace(&self, id: NodeId, offset: u32) -> bool {
        self.character_data(id).is_some_and(|text| {
            let suffix = tools::utf16::slice(text, offset as usize, None);
            tools::whitespace::is_only_whitespace(suffix)
        })
    }

    // ---------------------------------------------------------------------
    // Editing and rendering
    // ---------------------------------------------------------------------

    fn contenteditable_state(&self, id: NodeId) -> Option<bool> {
        let value = self.attribute(id, "contenteditable")?;
        if value.eq_ignore_ascii_case("false") {
            Some(false)
        } else if value.is_empty()
            || value.eq_ignore_ascii_case("true")
            || value.eq_ignore_ascii_case("plaintext-only")
        {
            Some(true)
        } else {
            None
        }
    }

    /// The nearest `contenteditable` state wins; design mode makes everything
    /// editable.
    pub fn is_editable(&self, id: NodeId) -> bool {
        if self.design_mode {
            return true;
        }
        let mut cur = Some(id);
        while let Some(node) = cur {
            if let Some(state) = self.contenteditable_state(node) {
                return state;
            }
            cur = self.parent(node);
        }
        false
    }

    /// An editable element whose parent is not editable.
    pub fn is_editing_host(&self, id: NodeId) -> bool {
        if !self.is_element(id) {
            return false;
        }
        if self.design_mode {
            return self.is_element_named(id, "html") || self.parent(id) == Some(Self::ROOT);
        }
        self.contenteditable_state(id) == Some(true)
            && !self.parent(id).is_some_and(|p| self.is_editable(p))
    }

    pub fn is_block_element(&self, id: NodeId) -> bool {
        self.element_name(id).is_some_and(is_block_name)
    }

    /// A `<br>` that does not produce a visible line: an editor padding break,
    /// or the last significant thing in its block.
    pub fn is_invisible_break(&self, id: NodeId) -> bool {
        if !self.is_element_named(id, "br") {
            return false;
        }
        if self.flags(id).contains(NodeFlags::PADDING_BR) {
            return true;
        }
        let mut cur = id;
        loop {
            let mut sibling = self.next_sibling(cur);
            while let Some(next) = sibling {
                if self.is_block_element(next) {
                    return true;
                }
                if !self.text_is_only_whitespace(next)
                    && !matches!(self.data(next), NodeData::Comment(_))
                {
                    return false;
                }
                sibling = self.next_sibling(next);
            }
            match self.parent(cur) {
                Some(parent) if self.is_element(parent) && !self.is_block_element(parent) => {
                    cur = parent;
                }
                _ => return true,
            }
        }
    }
}

pub(crate) fn is_block_name(name: &str) -> bool {
    const BLOCKS: &[&str] = &[
        "address", "article", "aside", "blockquote", "body", "center", "dd", "details", "dialog",
        "dir", "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2",
        "h3", "h4", "h5", "h6", "header", "hgroup", "hr", "html", "li", "listing", "main", "menu",
        "nav", "ol", "p", "plaintext", "pre", "section", "summary", "table", "tbody", "td", "tfoot",
        "th", "thead", "tr", "ul", "xmp",
    ];
    BLOCKS.iter().any(|b| name.eq_ignore_ascii_case(b))
}

pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.doc.next_sibling(id);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new_html();
        let div = doc.append_element(Document::ROOT, "DIV").unwrap();
        let a = doc.append_text(div, "a").unwrap();
        let b = doc.append_element(div, "b").unwrap();
        (doc, div, a, b)
    }

    #[test]
    fn append_keeps_links_consistent() {
        let (doc, div, a, b) = sample();
        assert_eq!(doc.first_child(div), Some(a));
        assert_eq!(doc.last_child(div), Some(b));
        assert_eq!(doc.next_sibling(a), Some(b));
        assert_eq!(doc.previous_sibling(b), Some(a));
        assert_eq!(doc.child_count(div), 2);
        assert_eq!(doc.index_of(div, b), Some(1));
        assert_eq!(doc.element_name(div), Some("div"));
    }

    #[test]
    fn append_rejects_cycles_and_reparenting() {
        let (mut doc, div, a, b) = sample();
        assert!(matches!(
            doc.append_child(b, div),
            Err(TreeError::HierarchyRequest { .. })
        ));
        assert!(matches!(
            doc.append_child(b, a),
            Err(TreeError::HierarchyRequest { .. })
        ));
        assert!(matches!(doc.append_child(a, b), Err(TreeError::NotAContainer(_))));
    }

    #[test]
    fn template_children_live_in_content() {
        let mut doc = Document::new_html();
        let template = doc.create_template();
        doc.append_child(Document::ROOT, template).unwrap();
        let content = doc.template_content(template).unwrap();
        let text = doc.append_text(content, "x").unwrap();
        assert_eq!(doc.first_child(template), None);
        assert_eq!(doc.first_child_of_template_or_node(template), Some(text));
        assert_eq!(doc.host(content), Some(template));
    }

    #[test]
    fn editability_follows_nearest_contenteditable() {
        let mut doc = Document::new_html();
        let host = doc.append_element(Document::ROOT, "div").unwrap();
        doc.set_attribute(host, "contenteditable", Some("true"));
        let inner = doc.append_element(host, "span").unwrap();
        let frozen = doc.append_element(host, "span").unwrap();
        doc.set_attribute(frozen, "contenteditable", Some("false"));
        assert!(doc.is_editable(inner));
        assert!(!doc.is_editable(frozen));
        assert!(doc.is_editing_host(host));
        assert!(!doc.is_editing_host(inner));
    }

    #[test]
    fn trailing_break_in_block_is_invisible() {
        let mut doc = Document::new_html();
        let p = doc.append_element(Document::ROOT, "p").unwrap();
        doc.append_text(p, "a").unwrap();
        let mid = doc.append_element(p, "br").unwrap();
        doc.append_text(p, "b").unwrap();
        let b = doc.append_element(p, "b").unwrap();
        let last = doc.append_element(b, "br").unwrap();
        doc.append_text(p, "  ").unwrap();
        assert!(!doc.is_invisible_break(mid));
        assert!(doc.is_invisible_break(last));
    }

    #[test]
    fn whitespace_edges_use_utf16_offsets() {
        let mut doc = Document::new_html();
        let t = doc.append_text(Document::ROOT, "  \u{1F600} ").unwrap();
        assert!(doc.text_starts_with_only_whitespace(t, 2));
        assert!(!doc.text_starts_with_only_whitespace(t, 4));
        assert!(doc.text_ends_with_only_whitespace(t, 4));
        assert_eq!(doc.node_length(t), 5);
    }
}
