//! The node capability set consumed by the function library.
//!
//! The library never builds or mutates trees. Hosts implement [`XdmNode`] for their own
//! node handle; [`crate::simple_node::SimpleNode`] is the in-memory reference adapter.

use crate::consts::XML_URI;
use crate::engine::runtime::{Error, ErrorCode};
use crate::xdm::XdmAtomicValue;
use core::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
    Namespace,
}

impl NodeKind {
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Document => "document-node()",
            NodeKind::Element => "element()",
            NodeKind::Attribute => "attribute()",
            NodeKind::Text => "text()",
            NodeKind::Comment => "comment()",
            NodeKind::ProcessingInstruction => "processing-instruction()",
            NodeKind::Namespace => "namespace-node()",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub ns_uri: Option<String>,
}

impl QName {
    pub fn local(local: impl Into<String>) -> Self {
        Self { prefix: None, local: local.into(), ns_uri: None }
    }

    /// Lexical form `prefix:local` or just `local`.
    pub fn display_name(&self) -> String {
        match self.prefix.as_deref() {
            Some(p) if !p.is_empty() => format!("{p}:{}", self.local),
            _ => self.local.clone(),
        }
    }

    pub fn matches(&self, ns_uri: Option<&str>, local: &str) -> bool {
        self.local == local && self.ns_uri.as_deref().filter(|u| !u.is_empty()) == ns_uri.filter(|u| !u.is_empty())
    }
}

/// Compare two nodes by ancestry and sibling position.
///
/// An ancestor precedes its descendants. Among siblings, attributes come first, then
/// namespaces, then children. Nodes of different trees have no order here and give
/// `err:FOER0000`; adapters with several trees override
/// [`XdmNode::compare_document_order`].
pub fn try_compare_by_ancestry<N: XdmNode>(a: &N, b: &N) -> Result<Ordering, Error> {
    if a == b {
        return Ok(Ordering::Equal);
    }
    let pa = path_to_root(a);
    let pb = path_to_root(b);
    let len = pa.len().min(pb.len());
    let i = pa.iter().zip(pb.iter()).take_while(|(x, y)| x == y).count();
    if i == len {
        return Ok(pa.len().cmp(&pb.len()));
    }
    if i == 0 {
        return Err(Error::from_code(
            ErrorCode::FOER0000,
            "document order requires adapter: nodes from different roots",
        ));
    }
    let siblings = ordered_members(&pa[i - 1]);
    let posa = siblings.iter().position(|n| n == &pa[i]);
    let posb = siblings.iter().position(|n| n == &pb[i]);
    Ok(match (posa, posb) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => Ordering::Equal,
    })
}

fn path_to_root<N: XdmNode>(n: &N) -> Vec<N> {
    let mut p = vec![n.clone()];
    let mut cur = n.clone();
    while let Some(parent) = cur.parent() {
        p.push(parent.clone());
        cur = parent;
    }
    p.reverse();
    p
}

/// Attributes, namespaces and children of `n`, in document order.
fn ordered_members<N: XdmNode>(n: &N) -> Vec<N> {
    let mut v = n.attributes();
    v.extend(n.namespaces());
    v.extend(n.children());
    v
}

pub trait XdmNode: Clone + Eq + core::fmt::Debug + Send + Sync + 'static {
    fn kind(&self) -> NodeKind;
    fn name(&self) -> Option<QName>;
    fn string_value(&self) -> String;

    /// Typed value after atomization. Without schema types every node is untyped.
    fn typed_value(&self) -> Vec<XdmAtomicValue> {
        vec![XdmAtomicValue::UntypedAtomic(self.string_value())]
    }

    fn base_uri(&self) -> Option<String> {
        self.parent().and_then(|p| p.base_uri())
    }
    fn document_uri(&self) -> Option<String> {
        None
    }

    fn parent(&self) -> Option<Self>;
    fn children(&self) -> Vec<Self>;
    fn attributes(&self) -> Vec<Self>;
    fn namespaces(&self) -> Vec<Self> {
        Vec::new()
    }

    /// Whether this attribute carries an ID. `xml:id` always does.
    fn is_id(&self) -> bool {
        self.kind() == NodeKind::Attribute && self.name().is_some_and(|q| q.matches(Some(XML_URI), "id"))
    }
    fn is_idrefs(&self) -> bool {
        false
    }

    /// Identifier of the tree this node belongs to; used for `generate-id`.
    fn tree_id(&self) -> u64 {
        0
    }

    fn root(&self) -> Self {
        let mut cur = self.clone();
        while let Some(p) = cur.parent() {
            cur = p;
        }
        cur
    }

    /// Document order comparison. The default uses ancestry and sibling order and fails
    /// for nodes from different trees.
    fn compare_document_order(&self, other: &Self) -> Result<Ordering, Error> {
        try_compare_by_ancestry(self, other)
    }
}

/// Depth-first walk over `n` and its descendants (elements, text, comments, PIs), including
/// `n` itself.
pub fn descendants_or_self<N: XdmNode>(n: &N) -> Vec<N> {
    let mut out = Vec::new();
    let mut stack = vec![n.clone()];
    while let Some(cur) = stack.pop() {
        let mut children = cur.children();
        children.reverse();
        stack.extend(children);
        out.push(cur);
    }
    out
}

pub fn is_ancestor_or_self<N: XdmNode>(ancestor: &N, n: &N) -> bool {
    let mut cur = Some(n.clone());
    while let Some(c) = cur {
        if &c == ancestor {
            return true;
        }
        cur = c.parent();
    }
    false
}

/// In-scope namespace bindings of an element, nearest declaration first. The `xml` prefix
/// is always present.
pub fn in_scope_namespaces<N: XdmNode>(element: &N) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = vec![("xml".to_string(), XML_URI.to_string())];
    let mut cur = Some(element.clone());
    while let Some(n) = cur {
        for ns in n.namespaces() {
            let prefix = ns.name().map(|q| q.local).unwrap_or_default();
            if !out.iter().any(|(p, _)| p == &prefix) {
                out.push((prefix, ns.string_value()));
            }
        }
        cur = n.parent();
    }
    out.retain(|(_, uri)| !uri.is_empty());
    out
}
