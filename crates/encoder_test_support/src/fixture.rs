//! Bracket-marker fixtures.
//!
//! A fixture is a small markup string that builds a [`Document`] and,
//! optionally, a range:
//!
//! - `[` and `]` inside text mark the range start and end at that character
//!   offset of the text node.
//! - `{` and `}` between nodes mark the range start and end as a child offset
//!   of the enclosing container.
//! - `<shadowroot>` (or `<shadowroot mode=ua>`) attaches a shadow root to the
//!   enclosing element; its children form the shadow tree. Light children are
//!   assigned to `<slot>`s by their `slot` attribute, the rest to the unnamed
//!   slot.
//! - `<template>` children go into the template's content fragment.
//! - `data-render="no-frame hidden contents unselectable padding-br"` sets
//!   rendering flags and is not kept as an attribute.
//! - `&amp; &lt; &gt; &quot; &nbsp; &#91; &#93; &#123; &#125;` are decoded in
//!   text and attribute values.
//!
//! Malformed fixtures panic with a message naming the problem.

use dom::{Boundary, Document, NodeFlags, NodeId, Range, ShadowRootKind};
use std::collections::BTreeMap;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub struct Fixture {
    pub doc: Document,
    pub start: Option<Boundary>,
    pub end: Option<Boundary>,
    ids: BTreeMap<String, NodeId>,
}

impl Fixture {
    pub fn parse(src: &str) -> Self {
        Parser::new(src, Document::new_html()).run()
    }

    pub fn parse_xml(src: &str) -> Self {
        Parser::new(src, Document::new_xml()).run()
    }

    /// The marked range in the literal tree.
    pub fn range(&self) -> Range {
        let (start, end) = self.boundaries();
        Range::new(start, end)
    }

    /// The marked range, flagged to be walked in the flattened tree.
    pub fn flat_range(&self) -> Range {
        let (start, end) = self.boundaries();
        Range::in_flat_tree(start, end)
    }

    fn boundaries(&self) -> (Boundary, Boundary) {
        let start = self.start.expect("fixture has no start marker");
        let end = self.end.expect("fixture has no end marker");
        (start, end)
    }

    pub fn element_by_id(&self, id: &str) -> NodeId {
        *self
            .ids
            .get(id)
            .unwrap_or_else(|| panic!("fixture has no element with id '{id}'"))
    }

    /// First text node (in document order, shadow trees included) containing
    /// `needle`.
    pub fn text_containing(&self, needle: &str) -> NodeId {
        (0..self.doc.len() as u32)
            .map(NodeId)
            .find(|&id| {
                self.doc.is_text(id)
                    && self
                        .doc
                        .character_data(id)
                        .is_some_and(|text| text.contains(needle))
            })
            .unwrap_or_else(|| panic!("fixture has no text containing '{needle}'"))
    }
}

#[derive(Clone, Copy)]
enum Marker {
    Start,
    End,
}

struct Open {
    name: String,
    /// Where children of this element are appended.
    container: NodeId,
}

struct Parser<'s> {
    src: &'s str,
    pos: usize,
    doc: Document,
    stack: Vec<Open>,
    text: String,
    pending: Vec<(Marker, u32)>,
    start: Option<Boundary>,
    end: Option<Boundary>,
    ids: BTreeMap<String, NodeId>,
    hosts: Vec<NodeId>,
}

impl<'s> Parser<'s> {
    fn new(src: &'s str, doc: Document) -> Self {
        Self {
            src,
            pos: 0,
            doc,
            stack: Vec::new(),
            text: String::new(),
            pending: Vec::new(),
            start: None,
            end: None,
            ids: BTreeMap::new(),
            hosts: Vec::new(),
        }
    }

    fn container(&self) -> NodeId {
        self.stack
            .last()
            .map(|open| open.container)
            .unwrap_or(Document::ROOT)
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn run(mut self) -> Fixture {
        while let Some(ch) = self.rest().chars().next() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.flush_text();
                self.comment();
            } else if rest.starts_with("</") {
                self.flush_text();
                self.end_tag();
            } else if ch == '<' {
                self.flush_text();
                self.start_tag();
            } else if ch == '[' || ch == ']' {
                let marker = if ch == '[' { Marker::Start } else { Marker::End };
                self.pending.push((marker, utf16_len(&self.text)));
                self.pos += 1;
            } else if ch == '{' || ch == '}' {
                self.flush_text();
                let container = self.container();
                let offset = self.doc.child_count(container);
                let marker = if ch == '{' { Marker::Start } else { Marker::End };
                self.set_marker(marker, Boundary::new(container, offset));
                self.pos += 1;
            } else if ch == '&' {
                let decoded = self.entity();
                self.text.push(decoded);
            } else {
                self.text.push(ch);
                self.pos += ch.len_utf8();
            }
        }
        self.flush_text();
        if let Some(open) = self.stack.last() {
            panic!("fixture leaves <{}> open", open.name);
        }
        self.assign_slots();
        Fixture {
            doc: self.doc,
            start: self.start,
            end: self.end,
            ids: self.ids,
        }
    }

    fn set_marker(&mut self, marker: Marker, at: Boundary) {
        let slot = match marker {
            Marker::Start => &mut self.start,
            Marker::End => &mut self.end,
        };
        assert!(slot.is_none(), "fixture marks the same boundary twice");
        *slot = Some(at);
    }

    fn flush_text(&mut self) {
        let container = self.container();
        if self.text.is_empty() {
            // `[` with no text around it falls back to a child offset.
            let offset = self.doc.child_count(container);
            for (marker, _) in std::mem::take(&mut self.pending) {
                self.set_marker(marker, Boundary::new(container, offset));
            }
            return;
        }
        let text = std::mem::take(&mut self.text);
        let node = self
            .doc
            .append_text(container, &text)
            .unwrap_or_else(|err| panic!("cannot place text {text:?}: {err}"));
        for (marker, offset) in std::mem::take(&mut self.pending) {
            self.set_marker(marker, Boundary::new(node, offset));
        }
    }

    fn comment(&mut self) {
        let body_start = self.pos + "<!--".len();
        let len = self.src[body_start..]
            .find("-->")
            .expect("unterminated comment in fixture");
        let comment = self.doc.create_comment(&self.src[body_start..body_start + len]);
        self.append(comment);
        self.pos = body_start + len + "-->".len();
    }

    fn end_tag(&mut self) {
        let close = self.rest().find('>').expect("unterminated end tag in fixture");
        let name = self.rest()[2..close].trim().to_ascii_lowercase();
        self.pos += close + 1;
        let open = self
            .stack
            .pop()
            .unwrap_or_else(|| panic!("</{name}> closes nothing"));
        assert_eq!(open.name, name, "</{name}> closes <{}>", open.name);
    }

    fn start_tag(&mut self) {
        self.pos += 1;
        let name = self.take_while(|c| !c.is_whitespace() && c != '>' && c != '/');
        let name = name.to_ascii_lowercase();
        let mut attributes = Vec::new();
        let mut self_closing = false;
        loop {
            self.skip_whitespace();
            let Some(ch) = self.rest().chars().next() else {
                panic!("unterminated <{name}> in fixture");
            };
            match ch {
                '>' => {
                    self.pos += 1;
                    break;
                }
                '/' => {
                    self_closing = true;
                    self.pos += 1;
                }
                _ => attributes.push(self.attribute()),
            }
        }

        if name == "shadowroot" {
            self.shadow_root(&attributes);
            return;
        }

        let mut flags = NodeFlags::empty();
        let mut id = None;
        attributes.retain(|(key, value)| {
            if key == "data-render" {
                flags |= render_flags(value.as_deref().unwrap_or(""));
                return false;
            }
            if key == "id" {
                id = value.clone();
            }
            true
        });

        let element = if name == "template" {
            let template = self.doc.create_template();
            for (key, value) in &attributes {
                self.doc.set_attribute(template, key, value.as_deref());
            }
            template
        } else {
            self.doc.create_element_with_attributes(&name, attributes)
        };
        self.doc.set_flags(element, flags);
        if let Some(id) = id {
            self.ids.insert(id, element);
        }
        self.append(element);

        if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
            return;
        }
        let container = self.doc.template_content(element).unwrap_or(element);
        self.stack.push(Open { name, container });
    }

    fn shadow_root(&mut self, attributes: &[(String, Option<String>)]) {
        let host = self.container();
        let kind = match attributes
            .iter()
            .find(|(key, _)| key == "mode")
            .and_then(|(_, value)| value.as_deref())
        {
            Some("ua") => ShadowRootKind::UserAgent,
            _ => ShadowRootKind::Author,
        };
        let root = self
            .doc
            .attach_shadow(host, kind)
            .unwrap_or_else(|err| panic!("cannot attach shadow root: {err}"));
        if kind == ShadowRootKind::Author {
            self.hosts.push(host);
        }
        self.stack.push(Open {
            name: "shadowroot".to_string(),
            container: root,
        });
    }

    fn append(&mut self, node: NodeId) {
        let container = self.container();
        self.doc
            .append_child(container, node)
            .unwrap_or_else(|err| panic!("cannot append fixture node: {err}"));
    }

    fn attribute(&mut self) -> (String, Option<String>) {
        let name = self
            .take_while(|c| !c.is_whitespace() && c != '=' && c != '>' && c != '/')
            .to_ascii_lowercase();
        assert!(!name.is_empty(), "empty attribute name in fixture");
        if !self.rest().starts_with('=') {
            return (name, None);
        }
        self.pos += 1;
        let value = match self.rest().chars().next() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let raw = self.take_while(|c| c != quote);
                self.pos += 1;
                raw
            }
            _ => self.take_while(|c| !c.is_whitespace() && c != '>'),
        };
        (name, Some(decode_entities(&value)))
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let rest = self.rest();
        let len = rest.find(|c: char| !keep(c)).unwrap_or(rest.len());
        self.pos += len;
        rest[..len].to_string()
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    fn entity(&mut self) -> char {
        let rest = self.rest();
        let Some(semi) = rest.find(';') else {
            self.pos += 1;
            return '&';
        };
        match entity_char(&rest[1..semi]) {
            Some(ch) => {
                self.pos += semi + 1;
                ch
            }
            None => {
                self.pos += 1;
                '&'
            }
        }
    }

    /// Light children go to the slot named by their `slot` attribute; the
    /// unnamed slot takes the rest, whitespace-only text excepted.
    fn assign_slots(&mut self) {
        for host in std::mem::take(&mut self.hosts) {
            let Some(root) = self.doc.shadow_root(host) else {
                continue;
            };
            let slots: Vec<NodeId> = dom::traverse::descendants(&self.doc, root)
                .filter(|&id| self.doc.is_slot(id))
                .collect();
            let light: Vec<NodeId> = self.doc.children(host).collect();
            for slot in slots {
                let name = self.doc.attribute(slot, "name").unwrap_or("").to_string();
                let assigned: Vec<NodeId> = light
                    .iter()
                    .copied()
                    .filter(|&child| {
                        let target = self.doc.attribute(child, "slot").unwrap_or("");
                        target == name && !self.doc.text_is_only_whitespace(child)
                    })
                    .collect();
                self.doc
                    .assign_slot(slot, &assigned)
                    .unwrap_or_else(|err| panic!("cannot assign slot: {err}"));
            }
        }
    }
}

fn render_flags(value: &str) -> NodeFlags {
    value
        .split_whitespace()
        .map(|word| match word {
            "no-frame" => NodeFlags::NO_FRAME,
            "hidden" => NodeFlags::VISIBILITY_HIDDEN,
            "contents" => NodeFlags::DISPLAY_CONTENTS,
            "unselectable" => NodeFlags::UNSELECTABLE,
            "padding-br" => NodeFlags::PADDING_BR,
            other => panic!("unknown data-render word '{other}'"),
        })
        .fold(NodeFlags::empty(), |acc, flag| acc | flag)
}

fn entity_char(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "nbsp" => '\u{A0}',
        "#91" => '[',
        "#93" => ']',
        "#123" => '{',
        "#125" => '}',
        _ => return None,
    })
}

fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match rest.find(';').and_then(|semi| Some((semi, entity_char(&rest[1..semi])?))) {
            Some((semi, ch)) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn utf16_len(text: &str) -> u32 {
    text.chars().map(char::len_utf16).sum::<usize>() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_markers_become_character_offsets() {
        let fx = Fixture::parse("<p id=p>a[bc</p><p>d]e</p>");
        let p = fx.element_by_id("p");
        let first = fx.doc.first_child(p).unwrap();
        assert_eq!(fx.doc.character_data(first), Some("abc"));
        assert_eq!(fx.start, Some(Boundary::new(first, 1)));
        let second = fx.text_containing("de");
        assert_eq!(fx.end, Some(Boundary::new(second, 1)));
    }

    #[test]
    fn brace_markers_become_child_offsets() {
        let fx = Fixture::parse("<ul id=l>{<li>a</li><li>b</li>}</ul>");
        let ul = fx.element_by_id("l");
        assert_eq!(fx.range(), Range::new(Boundary::new(ul, 0), Boundary::new(ul, 2)));
    }

    #[test]
    fn shadow_roots_slots_and_flags() {
        let fx = Fixture::parse(
            "<div id=host><shadowroot><p><slot></slot></p></shadowroot>\
             <span id=light data-render=\"no-frame\">x</span></div>",
        );
        let host = fx.element_by_id("host");
        let light = fx.element_by_id("light");
        let root = fx.doc.shadow_root_for_selection(host).unwrap();
        let slot = fx.doc.assigned_slot(light).unwrap();
        assert!(fx.doc.is_inclusive_ancestor(root, slot));
        assert!(fx.doc.flags(light).contains(NodeFlags::NO_FRAME));
        assert_eq!(fx.doc.attribute(light, "data-render"), None);
    }

    #[test]
    fn template_children_go_to_content() {
        let fx = Fixture::parse("<template id=t><b>x</b></template>");
        let template = fx.element_by_id("t");
        assert!(!fx.doc.has_children(template));
        let content = fx.doc.template_content(template).unwrap();
        assert_eq!(fx.doc.child_count(content), 1);
    }

    #[test]
    fn entities_and_void_elements() {
        let fx = Fixture::parse("<p id=p>a&amp;b&#91;<br>c</p>");
        let p = fx.element_by_id("p");
        assert_eq!(fx.doc.child_count(p), 3);
        let first = fx.doc.first_child(p).unwrap();
        assert_eq!(fx.doc.character_data(first), Some("a&b["));
        assert_eq!(fx.start, None);
    }

    #[test]
    #[should_panic(expected = "</p> closes <b>")]
    fn mismatched_end_tag_panics() {
        Fixture::parse("<p><b></p>");
    }
}
