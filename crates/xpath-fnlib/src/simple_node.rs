//! In-memory tree implementing [`XdmNode`], used by tests and small hosts.
//!
//! Trees are built bottom-up with builders and are immutable afterwards.
//!
//! ```
//! use xpath_fnlib::simple_node::{attr, doc, elem, text};
//! use xpath_fnlib::XdmNode;
//!
//! // <root id="r"><child>Hello</child></root>
//! let document = doc()
//!     .child(elem("root").attr(attr("id", "r")).child(elem("child").child(text("Hello"))))
//!     .build();
//! let root = document.children()[0].clone();
//! assert_eq!(root.name().unwrap().local, "root");
//! assert_eq!(document.string_value(), "Hello");
//! ```
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use crate::consts::XML_URI;
use crate::model::{NodeKind, QName, XdmNode};

struct Inner {
    kind: NodeKind,
    name: Option<QName>,
    value: Option<String>,
    parent: OnceLock<Weak<Inner>>,
    attributes: Vec<SimpleNode>,
    namespaces: Vec<SimpleNode>,
    children: Vec<SimpleNode>,
    base_uri: Option<String>,
    document_uri: Option<String>,
    id: bool,
    idrefs: bool,
    cached_text: OnceLock<String>,
}

#[derive(Clone)]
pub struct SimpleNode(Arc<Inner>);

impl PartialEq for SimpleNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for SimpleNode {}

impl std::hash::Hash for SimpleNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Debug for SimpleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleNode")
            .field("kind", &self.0.kind)
            .field("name", &self.0.name)
            .field("value", &self.0.value)
            .finish()
    }
}

fn qname(prefix: Option<&str>, ns_uri: Option<&str>, local: &str) -> QName {
    QName {
        prefix: prefix.map(str::to_string),
        local: local.to_string(),
        ns_uri: ns_uri.map(str::to_string),
    }
}

/// Split `p:local` and bind the well-known `xml` prefix.
fn attr_name(name: &str) -> QName {
    match name.split_once(':') {
        Some(("xml", local)) => qname(Some("xml"), Some(XML_URI), local),
        Some((p, local)) => qname(Some(p), None, local),
        None => qname(None, None, name),
    }
}

impl SimpleNode {
    fn leaf(kind: NodeKind, name: Option<QName>, value: &str) -> SimpleNodeBuilder {
        let mut b = SimpleNodeBuilder::new(kind, name);
        b.value = Some(value.to_string());
        b
    }

    pub fn document() -> SimpleNodeBuilder {
        SimpleNodeBuilder::new(NodeKind::Document, None)
    }
    pub fn element(name: &str) -> SimpleNodeBuilder {
        SimpleNodeBuilder::new(NodeKind::Element, Some(attr_name(name)))
    }
    pub fn element_ns(prefix: &str, ns_uri: &str, local: &str) -> SimpleNodeBuilder {
        let p = (!prefix.is_empty()).then_some(prefix);
        SimpleNodeBuilder::new(NodeKind::Element, Some(qname(p, Some(ns_uri), local)))
    }
    pub fn attribute(name: &str, value: &str) -> SimpleNode {
        Self::leaf(NodeKind::Attribute, Some(attr_name(name)), value).build()
    }
    /// An attribute whose value is an ID.
    pub fn id_attribute(name: &str, value: &str) -> SimpleNode {
        let mut b = Self::leaf(NodeKind::Attribute, Some(attr_name(name)), value);
        b.id = true;
        b.build()
    }
    /// An attribute whose value is a list of IDREFs.
    pub fn idrefs_attribute(name: &str, value: &str) -> SimpleNode {
        let mut b = Self::leaf(NodeKind::Attribute, Some(attr_name(name)), value);
        b.idrefs = true;
        b.build()
    }
    pub fn text(value: &str) -> SimpleNode {
        Self::leaf(NodeKind::Text, None, value).build()
    }
    pub fn comment(value: &str) -> SimpleNode {
        Self::leaf(NodeKind::Comment, None, value).build()
    }
    pub fn pi(target: &str, data: &str) -> SimpleNode {
        Self::leaf(NodeKind::ProcessingInstruction, Some(qname(None, None, target)), data).build()
    }
    pub fn namespace(prefix: &str, uri: &str) -> SimpleNode {
        Self::leaf(NodeKind::Namespace, Some(qname(None, None, prefix)), uri).build()
    }

    /// Resolve a namespace prefix by walking the ancestor chain (including self).
    pub fn lookup_namespace_uri(&self, prefix: &str) -> Option<String> {
        crate::model::in_scope_namespaces(self).into_iter().find(|(p, _)| p == prefix).map(|(_, u)| u)
    }
}

pub struct SimpleNodeBuilder {
    kind: NodeKind,
    name: Option<QName>,
    value: Option<String>,
    base_uri: Option<String>,
    document_uri: Option<String>,
    id: bool,
    idrefs: bool,
    children: Vec<SimpleNode>,
    attrs: Vec<SimpleNode>,
    namespaces: Vec<SimpleNode>,
}

impl SimpleNodeBuilder {
    fn new(kind: NodeKind, name: Option<QName>) -> Self {
        Self {
            kind,
            name,
            value: None,
            base_uri: None,
            document_uri: None,
            id: false,
            idrefs: false,
            children: Vec::new(),
            attrs: Vec::new(),
            namespaces: Vec::new(),
        }
    }

    pub fn child(mut self, child: impl Into<SimpleNodeOrBuilder>) -> Self {
        self.children.push(child.into().into_node());
        self
    }
    pub fn children<I: IntoIterator<Item = SimpleNodeOrBuilder>>(mut self, it: I) -> Self {
        self.children.extend(it.into_iter().map(SimpleNodeOrBuilder::into_node));
        self
    }
    pub fn attr(mut self, attr: SimpleNode) -> Self {
        debug_assert!(attr.kind() == NodeKind::Attribute);
        self.attrs.push(attr);
        self
    }
    pub fn namespace(mut self, ns: SimpleNode) -> Self {
        debug_assert!(ns.kind() == NodeKind::Namespace);
        self.namespaces.push(ns);
        self
    }
    pub fn base_uri(mut self, uri: &str) -> Self {
        self.base_uri = Some(uri.to_string());
        self
    }
    /// Document URI; only meaningful on document nodes. Also sets the base URI.
    pub fn document_uri(mut self, uri: &str) -> Self {
        self.document_uri = Some(uri.to_string());
        self.base_uri.get_or_insert_with(|| uri.to_string());
        self
    }
    /// Types the element's content as an ID.
    pub fn typed_id(mut self) -> Self {
        self.id = true;
        self
    }

    pub fn build(self) -> SimpleNode {
        let node = SimpleNode(Arc::new(Inner {
            kind: self.kind,
            name: self.name,
            value: self.value,
            parent: OnceLock::new(),
            attributes: self.attrs,
            namespaces: self.namespaces,
            children: self.children,
            base_uri: self.base_uri,
            document_uri: self.document_uri,
            id: self.id,
            idrefs: self.idrefs,
            cached_text: OnceLock::new(),
        }));
        let members = node.0.attributes.iter().chain(&node.0.namespaces).chain(&node.0.children);
        for m in members {
            let _ = m.0.parent.set(Arc::downgrade(&node.0));
        }
        node
    }
}

pub enum SimpleNodeOrBuilder {
    Built(SimpleNode),
    Builder(SimpleNodeBuilder),
}

impl SimpleNodeOrBuilder {
    fn into_node(self) -> SimpleNode {
        match self {
            SimpleNodeOrBuilder::Built(n) => n,
            SimpleNodeOrBuilder::Builder(b) => b.build(),
        }
    }
}

impl From<SimpleNode> for SimpleNodeOrBuilder {
    fn from(n: SimpleNode) -> Self {
        SimpleNodeOrBuilder::Built(n)
    }
}
impl From<SimpleNodeBuilder> for SimpleNodeOrBuilder {
    fn from(b: SimpleNodeBuilder) -> Self {
        SimpleNodeOrBuilder::Builder(b)
    }
}

pub fn elem(name: &str) -> SimpleNodeBuilder {
    SimpleNode::element(name)
}
pub fn text(v: &str) -> SimpleNode {
    SimpleNode::text(v)
}
pub fn attr(name: &str, v: &str) -> SimpleNode {
    SimpleNode::attribute(name, v)
}
pub fn id_attr(name: &str, v: &str) -> SimpleNode {
    SimpleNode::id_attribute(name, v)
}
pub fn comment(v: &str) -> SimpleNode {
    SimpleNode::comment(v)
}
pub fn pi(target: &str, data: &str) -> SimpleNode {
    SimpleNode::pi(target, data)
}
pub fn ns(prefix: &str, uri: &str) -> SimpleNode {
    SimpleNode::namespace(prefix, uri)
}
pub fn doc() -> SimpleNodeBuilder {
    SimpleNode::document()
}

impl XdmNode for SimpleNode {
    fn kind(&self) -> NodeKind {
        self.0.kind
    }
    fn name(&self) -> Option<QName> {
        self.0.name.clone()
    }
    fn string_value(&self) -> String {
        match self.0.kind {
            NodeKind::Element | NodeKind::Document => self
                .0
                .cached_text
                .get_or_init(|| {
                    crate::model::descendants_or_self(self)
                        .iter()
                        .filter(|n| n.0.kind == NodeKind::Text)
                        .filter_map(|n| n.0.value.as_deref())
                        .collect()
                })
                .clone(),
            _ => self.0.value.clone().unwrap_or_default(),
        }
    }
    fn base_uri(&self) -> Option<String> {
        self.0.base_uri.clone().or_else(|| self.parent().and_then(|p| p.base_uri()))
    }
    fn document_uri(&self) -> Option<String> {
        self.0.document_uri.clone()
    }
    fn parent(&self) -> Option<Self> {
        self.0.parent.get().and_then(Weak::upgrade).map(SimpleNode)
    }
    fn children(&self) -> Vec<Self> {
        self.0.children.clone()
    }
    fn attributes(&self) -> Vec<Self> {
        self.0.attributes.clone()
    }
    fn namespaces(&self) -> Vec<Self> {
        self.0.namespaces.clone()
    }
    fn is_id(&self) -> bool {
        self.0.id || (self.0.kind == NodeKind::Attribute && self.0.name.as_ref().is_some_and(|q| q.matches(Some(XML_URI), "id")))
    }
    fn is_idrefs(&self) -> bool {
        self.0.idrefs
    }
    fn tree_id(&self) -> u64 {
        let root = self.root();
        Arc::as_ptr(&root.0) as usize as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cmp::Ordering;

    #[test]
    fn attributes_precede_children() {
        let r = elem("r").attr(attr("a", "1")).child(elem("c")).build();
        let a = r.attributes()[0].clone();
        let c = r.children()[0].clone();
        assert_eq!(a.compare_document_order(&c).unwrap(), Ordering::Less);
        assert_eq!(a.parent(), Some(r));
    }

    #[test]
    fn namespace_lookup_walks_ancestors() {
        let d = doc().child(elem("root").namespace(ns("p", "urn:one")).child(elem("child"))).build();
        let child = d.children()[0].children()[0].clone();
        assert_eq!(child.lookup_namespace_uri("p").as_deref(), Some("urn:one"));
        assert_eq!(child.lookup_namespace_uri("xml").as_deref(), Some(XML_URI));
        assert_eq!(child.lookup_namespace_uri("q"), None);
    }

    #[test]
    fn xml_id_is_an_id() {
        let e = elem("e").attr(attr("xml:id", "k")).attr(attr("id", "x")).build();
        let attrs = e.attributes();
        assert!(attrs[0].is_id());
        assert!(!attrs[1].is_id());
    }
}
