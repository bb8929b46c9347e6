//! `Dom` implementation over the live browser document.

use huruf_core::wrap::{MANAGED_ATTR, MANAGED_VALUE, MARKER_CLASS, MARKER_TAG};
use huruf_core::{Dom, NodeKind, PlatformError};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, HtmlElement, Node};

/// Convert a thrown JS value into a [`PlatformError`].
pub(crate) fn platform_error(err: JsValue) -> PlatformError {
    match err.as_string() {
        Some(message) => PlatformError(message),
        None => PlatformError(format!("{err:?}")),
    }
}

/// The page document, addressed through `web_sys::Node` handles.
#[derive(Debug, Clone)]
pub struct BrowserDom {
    document: web_sys::Document,
}

impl BrowserDom {
    pub fn new(document: web_sys::Document) -> Self {
        Self { document }
    }

    /// The current window's document.
    pub fn from_window() -> Self {
        Self::new(gloo_utils::document())
    }

    pub fn document(&self) -> &web_sys::Document {
        &self.document
    }
}

impl Dom for BrowserDom {
    type Node = Node;

    fn body(&self) -> Option<Node> {
        self.document.body().map(Node::from)
    }

    fn kind(&self, node: &Node) -> NodeKind {
        match node.node_type() {
            Node::ELEMENT_NODE => NodeKind::Element,
            Node::TEXT_NODE => NodeKind::Text,
            _ => NodeKind::Other,
        }
    }

    fn parent(&self, node: &Node) -> Option<Node> {
        node.parent_node()
    }

    fn first_child(&self, node: &Node) -> Option<Node> {
        node.first_child()
    }

    fn next_sibling(&self, node: &Node) -> Option<Node> {
        node.next_sibling()
    }

    fn tag_name(&self, node: &Node) -> Option<String> {
        node.dyn_ref::<Element>().map(Element::tag_name)
    }

    fn attribute(&self, node: &Node, name: &str) -> Option<String> {
        node.dyn_ref::<Element>()?.get_attribute(name)
    }

    fn has_class(&self, node: &Node, class: &str) -> bool {
        node.dyn_ref::<Element>()
            .is_some_and(|el| el.class_list().contains(class))
    }

    fn text(&self, node: &Node) -> Option<String> {
        if node.node_type() != Node::TEXT_NODE {
            return None;
        }
        node.node_value()
    }

    fn create_text(&mut self, text: &str) -> Result<Node, PlatformError> {
        Ok(self.document.create_text_node(text).into())
    }

    fn create_element(&mut self, tag: &str) -> Result<Node, PlatformError> {
        self.document
            .create_element(tag)
            .map(Node::from)
            .map_err(platform_error)
    }

    fn set_attribute(&mut self, node: &Node, name: &str, value: &str) -> Result<(), PlatformError> {
        let Some(element) = node.dyn_ref::<Element>() else {
            return Err(PlatformError::from("set_attribute on a non-element node"));
        };
        element.set_attribute(name, value).map_err(platform_error)
    }

    fn set_style(&mut self, node: &Node, property: &str, value: &str) -> Result<(), PlatformError> {
        let Some(element) = node.dyn_ref::<HtmlElement>() else {
            return Err(PlatformError::from("set_style on a non-HTML element"));
        };
        element
            .style()
            .set_property(property, value)
            .map_err(platform_error)
    }

    fn insert_before(
        &mut self,
        parent: &Node,
        child: &Node,
        reference: Option<&Node>,
    ) -> Result<(), PlatformError> {
        parent
            .insert_before(child, reference)
            .map(|_| ())
            .map_err(platform_error)
    }

    fn remove_child(&mut self, parent: &Node, child: &Node) -> Result<(), PlatformError> {
        parent.remove_child(child).map(|_| ()).map_err(platform_error)
    }

    fn markers(&self) -> Vec<Node> {
        let selector = format!("{MARKER_TAG}.{MARKER_CLASS}[{MANAGED_ATTR}=\"{MANAGED_VALUE}\"]");
        let list = match self.document.query_selector_all(&selector) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!("marker query failed: {:?}", e);
                return Vec::new();
            }
        };
        (0..list.length()).filter_map(|i| list.get(i)).collect()
    }
}
