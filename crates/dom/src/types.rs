use bitflags::bitflags;

/// Index of a node inside its [`Document`](crate::Document) arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    Element,
    Text,
    CDataSection,
    ProcessingInstruction,
    Comment,
    Document,
    DocumentType,
    DocumentFragment,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShadowRootKind {
    /// Attached by page content; selection and serialization may enter it.
    Author,
    /// Internal widget tree (form controls, media controls). Never entered.
    UserAgent,
}

bitflags! {
    /// Rendering facts about a node, filled in by whoever owns layout.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// The node has no layout box (`display: none`, detached, not rendered).
        const NO_FRAME = 1 << 0;
        /// The node is rendered but `visibility: hidden` (or hidden by
        /// `content-visibility` on an ancestor).
        const VISIBILITY_HIDDEN = 1 << 1;
        /// `display: contents`: no box of its own, children still render.
        const DISPLAY_CONTENTS = 1 << 2;
        /// `user-select: none`.
        const UNSELECTABLE = 1 << 3;
        /// A `<br>` an editor inserted to keep an empty last line visible.
        const PADDING_BR = 1 << 4;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementData {
    /// ASCII-lowercase tag name.
    pub name: String,
    /// Attribute order and duplicates are preserved.
    pub attributes: Vec<(String, Option<String>)>,
    pub shadow_root: Option<crate::NodeId>,
    /// Content fragment of a `<template>`.
    pub template_content: Option<crate::NodeId>,
    /// Nodes assigned to this element when it is a `<slot>`.
    pub assigned_nodes: Vec<crate::NodeId>,
}

impl ElementData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Document,
    DocumentType {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element(ElementData),
    Text(String),
    CDataSection(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        data: String,
    },
    /// A free-standing fragment; `host` is set for template content.
    DocumentFragment {
        host: Option<crate::NodeId>,
    },
    ShadowRoot {
        host: crate::NodeId,
        kind: ShadowRootKind,
    },
}

impl NodeData {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeData::Document => NodeType::Document,
            NodeData::DocumentType { .. } => NodeType::DocumentType,
            NodeData::Element(_) => NodeType::Element,
            NodeData::Text(_) => NodeType::Text,
            NodeData::CDataSection(_) => NodeType::CDataSection,
            NodeData::Comment(_) => NodeType::Comment,
            NodeData::ProcessingInstruction { .. } => NodeType::ProcessingInstruction,
            NodeData::DocumentFragment { .. } | NodeData::ShadowRoot { .. } => {
                NodeType::DocumentFragment
            }
        }
    }

    /// Character data of text-like nodes (text, CDATA, comment, PI data).
    pub fn character_data(&self) -> Option<&str> {
        match self {
            NodeData::Text(text) | NodeData::CDataSection(text) | NodeData::Comment(text) => {
                Some(text)
            }
            NodeData::ProcessingInstruction { data, .. } => Some(data),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub data: NodeData,
    pub flags: NodeFlags,
    pub(crate) parent: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,
    pub(crate) last_child: Option<NodeId>,
    pub(crate) prev_sibling: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,
    pub(crate) child_count: u32,
    pub(crate) assigned_slot: Option<NodeId>,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            data,
            flags: NodeFlags::empty(),
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            child_count: 0,
            assigned_slot: None,
        }
    }

    pub fn element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(data) => Some(data),
            _ => None,
        }
    }
}
