//! In-memory document tree.
//!
//! A slab-backed node arena implementing [`Dom`], with mutation recording
//! that follows `MutationObserver` semantics: once [`Document::observe`] has
//! been called, every child-list and character-data change inside the
//! observed subtree is queued until [`Document::take_records`] drains it.
//!
//! Detached nodes stay in the arena so handles held by a caller keep
//! resolving, the same way a removed DOM node stays alive while referenced.
//! [`Document::sweep_detached`] frees them once no caller needs them; every
//! wrap detaches the text node it replaces.
//!
//! Siblings are linked in both directions, so sibling navigation and the
//! document-order walk are O(1) per step. Inserting before a reference node
//! still locates it in the parent's child list.

use slab::Slab;

use crate::platform::{Dom, NodeKind, PlatformError};
use crate::watch::Mutation;

/// Handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone)]
struct ElementData {
    /// Lowercase local name.
    tag: String,
    attrs: Vec<(String, String)>,
    /// Inline style declarations, serialized as the `style` attribute.
    style: Vec<(String, String)>,
}

impl ElementData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            style: Vec::new(),
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        if name == "style" {
            return None;
        }
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        if name == "style" {
            self.style = parse_declarations(value);
            return;
        }
        match self.attrs.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    fn set_style(&mut self, property: &str, value: &str) {
        match self.style.iter_mut().find(|(p, _)| p == property) {
            Some((_, v)) => *v = value.to_string(),
            None => self.style.push((property.to_string(), value.to_string())),
        }
    }

    fn css_text(&self) -> String {
        self.style
            .iter()
            .map(|(p, v)| format!("{p}:{v};"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn parse_declarations(css: &str) -> Vec<(String, String)> {
    css.split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim();
            (!property.is_empty()).then(|| (property.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[derive(Debug, Clone)]
enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            parent: None,
            prev_sibling: None,
            next_sibling: None,
            children: Vec::new(),
            data,
        }
    }
}

#[derive(Debug)]
struct Observer {
    root: NodeId,
    records: Vec<Mutation<NodeId>>,
}

/// A mutable document with an `html > (head, body)` skeleton.
#[derive(Debug)]
pub struct Document {
    nodes: Slab<Node>,
    root: NodeId,
    body: Option<NodeId>,
    observer: Option<Observer>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document with `<html><head></head><body></body></html>`.
    pub fn new() -> Self {
        let mut doc = Self::without_body();
        let html = doc.create_node(NodeData::Element(ElementData::new("html")));
        let head = doc.create_node(NodeData::Element(ElementData::new("head")));
        let body = doc.create_node(NodeData::Element(ElementData::new("body")));
        doc.link(doc.root, html, None);
        doc.link(html, head, None);
        doc.link(html, body, None);
        doc.body = Some(body);
        doc
    }

    /// A bare document node, as seen before the parser reaches `<body>`.
    pub fn without_body() -> Self {
        let mut nodes = Slab::new();
        let root = NodeId(nodes.insert(Node::new(NodeData::Document)));
        Self {
            nodes,
            root,
            body: None,
            observer: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn create_node(&mut self, data: NodeData) -> NodeId {
        NodeId(self.nodes.insert(Node::new(data)))
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id)?.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, PlatformError> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.data) {
            Some(NodeData::Element(el)) => Ok(el),
            Some(_) => Err(format!("node {} is not an element", id.0).into()),
            None => Err(format!("no such node {}", id.0).into()),
        }
    }

    /// Raw link without validation or recording.
    fn link(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let siblings = &mut self.nodes[parent.0].children;
        let at = reference
            .and_then(|r| siblings.iter().position(|&c| c == r))
            .unwrap_or(siblings.len());
        siblings.insert(at, child);
        let prev = at.checked_sub(1).map(|i| siblings[i]);
        let next = siblings.get(at + 1).copied();

        let node = &mut self.nodes[child.0];
        node.parent = Some(parent);
        node.prev_sibling = prev;
        node.next_sibling = next;
        if let Some(prev) = prev {
            self.nodes[prev.0].next_sibling = Some(child);
        }
        if let Some(next) = next {
            self.nodes[next.0].prev_sibling = Some(child);
        }
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        let node = &mut self.nodes[child.0];
        let (prev, next) = (node.prev_sibling.take(), node.next_sibling.take());
        node.parent = None;
        if let Some(prev) = prev {
            self.nodes[prev.0].next_sibling = next;
        }
        if let Some(next) = next {
            self.nodes[next.0].prev_sibling = prev;
        }
        self.nodes[parent.0].children.retain(|&c| c != child);
    }

    /// Whether `node` is `ancestor` or lies beneath it.
    pub fn is_inclusive_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node(id).and_then(|n| n.parent);
        }
        false
    }

    /// Whether `node` is connected to the document root.
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.is_inclusive_descendant(node, self.root)
    }

    /// Free every node that is not connected to the document, along with its
    /// subtree. Nodes referenced by queued mutation records are kept until
    /// the records are taken.
    ///
    /// Handles to freed nodes become invalid and their slots are reused, so
    /// callers must not hold on to detached handles across a sweep.
    pub fn sweep_detached(&mut self) -> usize {
        let mut pinned = Vec::new();
        if let Some(observer) = &self.observer {
            for record in &observer.records {
                pinned.push(*record.target());
                if let Mutation::ChildList { added, removed, .. } = record {
                    pinned.extend(added.iter().chain(removed).copied());
                }
            }
        }
        let detached_roots: Vec<NodeId> = self
            .nodes
            .iter()
            .map(|(index, node)| (NodeId(index), node))
            .filter(|&(id, node)| node.parent.is_none() && id != self.root)
            .map(|(id, _)| id)
            .filter(|&id| !pinned.iter().any(|&p| self.is_inclusive_descendant(p, id)))
            .collect();

        let mut freed = 0;
        let mut stack = detached_roots;
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.try_remove(id.0) {
                stack.extend(node.children);
                freed += 1;
            }
        }
        if self.body.is_some_and(|body| !self.nodes.contains(body.0)) {
            self.body = None;
        }
        freed
    }

    fn record(&mut self, target: NodeId, mutation: Mutation<NodeId>) {
        let observed = match &self.observer {
            Some(observer) => self.is_inclusive_descendant(target, observer.root),
            None => false,
        };
        if observed && let Some(observer) = self.observer.as_mut() {
            observer.records.push(mutation);
        }
    }

    // === Observation ===

    /// Start recording mutations in the subtree rooted at `root`.
    ///
    /// Replaces any previous observation target, keeping queued records.
    pub fn observe(&mut self, root: NodeId) {
        match self.observer.as_mut() {
            Some(observer) => observer.root = root,
            None => {
                self.observer = Some(Observer {
                    root,
                    records: Vec::new(),
                })
            }
        }
    }

    pub fn is_observing(&self) -> bool {
        self.observer.is_some()
    }

    /// Stop recording and drop anything still queued.
    pub fn disconnect(&mut self) {
        self.observer = None;
    }

    /// Drain the queued mutation records, oldest first.
    pub fn take_records(&mut self) -> Vec<Mutation<NodeId>> {
        self.observer
            .as_mut()
            .map(|o| std::mem::take(&mut o.records))
            .unwrap_or_default()
    }

    // === Convenience construction ===

    /// Create an element and append it to `parent`.
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> Result<NodeId, PlatformError> {
        let element = Dom::create_element(self, tag)?;
        self.append_child(&parent, &element)?;
        Ok(element)
    }

    /// Create a text node and append it to `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, PlatformError> {
        let node = Dom::create_text(self, text)?;
        self.append_child(&parent, &node)?;
        Ok(node)
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.create_node(NodeData::Comment(text.to_string()))
    }

    /// Replace the character data of a text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), PlatformError> {
        match self.nodes.get_mut(node.0).map(|n| &mut n.data) {
            Some(NodeData::Text(data)) | Some(NodeData::Comment(data)) => {
                *data = text.to_string();
            }
            _ => return Err(format!("node {} has no character data", node.0).into()),
        }
        self.record(node, Mutation::CharacterData { target: node });
        Ok(())
    }

    // === Inspection ===

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Value of one inline style property.
    pub fn style_property(&self, node: NodeId, property: &str) -> Option<&str> {
        self.element(node)?
            .style
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.node(node) else {
            return;
        };
        match &n.data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Comment(_) => {}
            _ => {
                for &child in &n.children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Serialized markup of `node`'s children.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(node) {
            self.write_html(child, &mut out);
        }
        out
    }

    /// Serialized markup of `node` itself.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.node(node) else {
            return;
        };
        match &n.data {
            NodeData::Document => {
                for &child in &n.children {
                    self.write_html(child, out);
                }
            }
            NodeData::Text(text) => {
                // Raw text elements keep their content verbatim.
                let raw = n
                    .parent
                    .and_then(|p| self.element(p))
                    .is_some_and(|el| matches!(el.tag.as_str(), "script" | "style"));
                if raw {
                    out.push_str(text);
                } else {
                    out.push_str(&htmlize::escape_text(text.as_str()));
                }
            }
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&htmlize::escape_attribute(value.as_str()));
                    out.push('"');
                }
                if !el.style.is_empty() {
                    out.push_str(" style=\"");
                    out.push_str(&htmlize::escape_attribute(el.css_text()));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&el.tag.as_str()) {
                    return;
                }
                for &child in &n.children {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }
}

impl Dom for Document {
    type Node = NodeId;

    fn body(&self) -> Option<NodeId> {
        self.body.filter(|&body| self.is_inclusive_descendant(body, self.root))
    }

    fn kind(&self, node: &NodeId) -> NodeKind {
        match self.node(*node).map(|n| &n.data) {
            Some(NodeData::Element(_)) => NodeKind::Element,
            Some(NodeData::Text(_)) => NodeKind::Text,
            _ => NodeKind::Other,
        }
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.node(*node)?.parent
    }

    fn first_child(&self, node: &NodeId) -> Option<NodeId> {
        self.node(*node)?.children.first().copied()
    }

    fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
        self.node(*node)?.next_sibling
    }

    fn tag_name(&self, node: &NodeId) -> Option<String> {
        self.element(*node).map(|el| el.tag.to_ascii_uppercase())
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        if name == "style" {
            return self.element(*node).map(|el| el.css_text());
        }
        self.element(*node)?.attribute(name).map(str::to_string)
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        self.element(*node)
            .and_then(|el| el.attribute("class"))
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }

    fn text(&self, node: &NodeId) -> Option<String> {
        match &self.node(*node)?.data {
            NodeData::Text(text) => Some(text.clone()),
            _ => None,
        }
    }

    fn create_text(&mut self, text: &str) -> Result<NodeId, PlatformError> {
        Ok(self.create_node(NodeData::Text(text.to_string())))
    }

    fn create_element(&mut self, tag: &str) -> Result<NodeId, PlatformError> {
        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(format!("invalid tag name {tag:?}").into());
        }
        Ok(self.create_node(NodeData::Element(ElementData::new(tag))))
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) -> Result<(), PlatformError> {
        self.element_mut(*node)?.set_attribute(name, value);
        Ok(())
    }

    fn set_style(&mut self, node: &NodeId, property: &str, value: &str) -> Result<(), PlatformError> {
        self.element_mut(*node)?.set_style(property, value);
        Ok(())
    }

    fn insert_before(
        &mut self,
        parent: &NodeId,
        child: &NodeId,
        reference: Option<&NodeId>,
    ) -> Result<(), PlatformError> {
        let (parent, child) = (*parent, *child);
        match self.node(parent).map(|n| &n.data) {
            Some(NodeData::Element(_)) | Some(NodeData::Document) => {}
            Some(_) => return Err(format!("node {} cannot have children", parent.0).into()),
            None => return Err(format!("no such node {}", parent.0).into()),
        }
        if self.node(child).is_none() {
            return Err(format!("no such node {}", child.0).into());
        }
        if self.is_inclusive_descendant(parent, child) {
            return Err("cannot insert a node into its own subtree".into());
        }
        if let Some(reference) = reference
            && self.parent(reference) != Some(parent)
        {
            return Err(format!("node {} is not a child of {}", reference.0, parent.0).into());
        }

        if let Some(old_parent) = self.parent(&child) {
            self.unlink(old_parent, child);
            self.record(
                old_parent,
                Mutation::ChildList {
                    target: old_parent,
                    added: Vec::new(),
                    removed: vec![child],
                },
            );
        }
        self.link(parent, child, reference.copied());
        self.record(
            parent,
            Mutation::ChildList {
                target: parent,
                added: vec![child],
                removed: Vec::new(),
            },
        );
        Ok(())
    }

    fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), PlatformError> {
        let (parent, child) = (*parent, *child);
        if self.parent(&child) != Some(parent) {
            return Err(format!("node {} is not a child of {}", child.0, parent.0).into());
        }
        // Record before unlinking so the target is still inside the observed subtree.
        self.record(
            parent,
            Mutation::ChildList {
                target: parent,
                added: Vec::new(),
                removed: vec![child],
            },
        );
        self.unlink(parent, child);
        Ok(())
    }
}
