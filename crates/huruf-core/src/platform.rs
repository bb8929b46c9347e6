//! Platform abstraction traits.
//!
//! These traits define the interface between the scan/wrap logic and a
//! concrete document: the browser DOM in `huruf-browser`, or the in-memory
//! [`Document`](crate::document::Document) for native hosts and tests.

use std::fmt;

/// Error type for platform operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl From<&str> for PlatformError {
    fn from(s: &str) -> Self {
        PlatformError(s.to_string())
    }
}

impl From<String> for PlatformError {
    fn from(s: String) -> Self {
        PlatformError(s)
    }
}

/// The node types the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    /// Comments, the document itself, doctype, fragments.
    Other,
}

/// A live, mutable document tree.
///
/// Node handles are cheap clones that keep identifying the same node after
/// it has been moved or detached. Read operations never fail; a node that has
/// been detached simply reports no parent.
pub trait Dom {
    type Node: Clone + PartialEq + fmt::Debug;

    // === Required: navigation ===

    /// The body element, if the document has one yet.
    fn body(&self) -> Option<Self::Node>;

    fn kind(&self, node: &Self::Node) -> NodeKind;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn first_child(&self, node: &Self::Node) -> Option<Self::Node>;

    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

    // === Required: inspection ===

    /// Tag name of an element, `None` for other node kinds.
    fn tag_name(&self, node: &Self::Node) -> Option<String>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn has_class(&self, node: &Self::Node, class: &str) -> bool;

    /// Character data of a text node, `None` for other node kinds.
    fn text(&self, node: &Self::Node) -> Option<String>;

    // === Required: mutation ===

    fn create_text(&mut self, text: &str) -> Result<Self::Node, PlatformError>;

    fn create_element(&mut self, tag: &str) -> Result<Self::Node, PlatformError>;

    fn set_attribute(
        &mut self,
        node: &Self::Node,
        name: &str,
        value: &str,
    ) -> Result<(), PlatformError>;

    /// Set one inline style property, replacing any previous value for it.
    fn set_style(
        &mut self,
        node: &Self::Node,
        property: &str,
        value: &str,
    ) -> Result<(), PlatformError>;

    /// Insert `child` into `parent` before `reference`, or at the end when
    /// `reference` is `None`.
    fn insert_before(
        &mut self,
        parent: &Self::Node,
        child: &Self::Node,
        reference: Option<&Self::Node>,
    ) -> Result<(), PlatformError>;

    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node)
    -> Result<(), PlatformError>;

    // === Provided: traversal ===

    fn append_child(
        &mut self,
        parent: &Self::Node,
        child: &Self::Node,
    ) -> Result<(), PlatformError> {
        self.insert_before(parent, child, None)
    }

    /// Next node after `current` in document order, staying inside `root`.
    ///
    /// Passing `None` starts the walk at `root`'s first child.
    fn next_in_order(&self, root: &Self::Node, current: Option<&Self::Node>) -> Option<Self::Node> {
        let Some(current) = current else {
            return self.first_child(root);
        };
        if let Some(child) = self.first_child(current) {
            return Some(child);
        }
        let mut node = current.clone();
        loop {
            if &node == root {
                return None;
            }
            if let Some(sibling) = self.next_sibling(&node) {
                return Some(sibling);
            }
            node = self.parent(&node)?;
        }
    }

    /// Next text node after `current` in document order, inside `root`.
    fn next_text_node(
        &self,
        root: &Self::Node,
        current: Option<&Self::Node>,
    ) -> Option<Self::Node> {
        let mut node = self.next_in_order(root, current)?;
        loop {
            if self.kind(&node) == NodeKind::Text {
                return Some(node);
            }
            node = self.next_in_order(root, Some(&node))?;
        }
    }

    /// Nearest inclusive ancestor carrying `name="value"`.
    fn closest_with_attribute(
        &self,
        node: &Self::Node,
        name: &str,
        value: &str,
    ) -> Option<Self::Node> {
        let mut current = Some(node.clone());
        while let Some(node) = current {
            if self.kind(&node) == NodeKind::Element
                && self.attribute(&node, name).as_deref() == Some(value)
            {
                return Some(node);
            }
            current = self.parent(&node);
        }
        None
    }

    /// Every managed marker element under the body, in document order.
    fn markers(&self) -> Vec<Self::Node> {
        let Some(body) = self.body() else {
            return Vec::new();
        };
        let mut found = Vec::new();
        let mut cursor = self.next_in_order(&body, None);
        while let Some(node) = cursor {
            if crate::wrap::is_marker(self, &node) {
                found.push(node.clone());
            }
            cursor = self.next_in_order(&body, Some(&node));
        }
        found
    }
}

/// Defers work until the current burst of changes has settled.
///
/// In a browser this is the microtask queue. Tasks run in the order they
/// were deferred, each to completion.
pub trait TaskQueue {
    fn defer(&self, task: Box<dyn FnOnce() + 'static>);
}
