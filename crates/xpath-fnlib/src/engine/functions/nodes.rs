use super::call::{Args, atomics, one, opt};
use super::{NamePartOp, NodeOp};
use crate::consts::XML_URI;
use crate::engine::iter::{self, SequenceIter};
use crate::engine::runtime::{CallCtx, Error};
use crate::model::{NodeKind, XdmNode, in_scope_namespaces};
use crate::xdm::{XdmAtomicValue, XdmItem};
use std::fmt::Write as _;

/// `name`, `local-name`, `namespace-uri`, `node-name`, `document-uri`, `base-uri` and
/// `generate-id`. The context item has already been supplied when the argument was omitted.
pub(super) fn name_part<N: XdmNode>(op: NamePartOp, _ctx: &CallCtx<N>, mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    let node = args.node(0)?;
    let Some(node) = node else {
        return match op {
            NamePartOp::Name | NamePartOp::LocalName | NamePartOp::GenerateId => one(""),
            NamePartOp::NamespaceUri => one(XdmAtomicValue::AnyUri(String::new())),
            NamePartOp::NodeName | NamePartOp::DocumentUri | NamePartOp::BaseUri => Ok(iter::empty()),
        };
    };
    let name = match node.kind() {
        NodeKind::Element | NodeKind::Attribute | NodeKind::ProcessingInstruction => node.name(),
        NodeKind::Namespace => node.name().filter(|q| !q.local.is_empty()),
        _ => None,
    };
    match op {
        NamePartOp::Name => one(name.map(|q| q.display_name()).unwrap_or_default()),
        NamePartOp::LocalName => one(name.map(|q| q.local).unwrap_or_default()),
        NamePartOp::NamespaceUri => {
            let uri = name
                .filter(|_| matches!(node.kind(), NodeKind::Element | NodeKind::Attribute))
                .and_then(|q| q.ns_uri);
            one(XdmAtomicValue::AnyUri(uri.unwrap_or_default()))
        }
        NamePartOp::NodeName => {
            opt(name.map(|q| XdmAtomicValue::qname(q.ns_uri.as_deref(), q.prefix.as_deref(), q.local)))
        }
        NamePartOp::DocumentUri => {
            let uri = (node.kind() == NodeKind::Document).then(|| node.document_uri()).flatten();
            opt(uri.map(XdmAtomicValue::AnyUri))
        }
        NamePartOp::BaseUri => opt(node.base_uri().map(XdmAtomicValue::AnyUri)),
        NamePartOp::GenerateId => one(generate_id(&node)),
    }
}

/// `d<tree>` followed by one `n<index>` step per level, where the index counts attributes,
/// then namespaces, then children of the parent.
pub(crate) fn generate_id<N: XdmNode>(node: &N) -> String {
    let mut steps = Vec::new();
    let mut cur = node.clone();
    while let Some(parent) = cur.parent() {
        let index = parent
            .attributes()
            .into_iter()
            .chain(parent.namespaces())
            .chain(parent.children())
            .position(|m| m == cur)
            .unwrap_or(0);
        steps.push(index);
        cur = parent;
    }
    let mut id = format!("d{}", node.tree_id());
    for step in steps.iter().rev() {
        let _ = write!(id, "n{step}");
    }
    id
}

pub(super) fn call<N: XdmNode>(op: NodeOp, ctx: &CallCtx<N>, mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    match op {
        NodeOp::Root => Ok(iter::from_option(args.node(0)?.map(|n| XdmItem::Node(n.root())))),
        NodeOp::Lang => {
            let test = args.string(0)?;
            let node = args.node_or_context(1, ctx)?;
            one(lang_matches(&node, &test))
        }
        NodeOp::InScopePrefixes => {
            let Some(element) = args.node(0)? else {
                return Ok(iter::empty());
            };
            let prefixes = in_scope_namespaces(&element).into_iter().map(|(p, _)| XdmAtomicValue::String(p)).collect();
            atomics(prefixes)
        }
        NodeOp::NamespaceForPrefix => {
            let prefix = args.string(0)?;
            let Some(element) = args.node(1)? else {
                return Ok(iter::empty());
            };
            let uri = in_scope_namespaces(&element).into_iter().find(|(p, _)| *p == prefix).map(|(_, u)| u);
            opt(uri.map(XdmAtomicValue::AnyUri))
        }
        NodeOp::Nilled => {
            let node = args.node(0)?;
            opt(node.filter(|n| n.kind() == NodeKind::Element).map(|_| false))
        }
    }
}

/// `xml:lang` of the nearest ancestor-or-self that carries one, compared case-blind; `en`
/// also matches `en-GB`.
fn lang_matches<N: XdmNode>(node: &N, test: &str) -> bool {
    let mut cur = Some(node.clone());
    while let Some(n) = cur {
        let declared = n
            .attributes()
            .into_iter()
            .find(|a| a.name().is_some_and(|q| q.matches(Some(XML_URI), "lang")));
        if let Some(attr) = declared {
            let value = attr.string_value().to_ascii_lowercase();
            let test = test.to_ascii_lowercase();
            return value == test || value.strip_prefix(&test).is_some_and(|rest| rest.starts_with('-'));
        }
        cur = n.parent();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple_node::{attr, doc, elem, ns};

    #[test]
    fn generate_id_is_stable_and_distinct() {
        let d = doc().child(elem("a").child(elem("b")).child(elem("c"))).build();
        let a = d.children()[0].clone();
        let b = a.children()[0].clone();
        let c = a.children()[1].clone();
        assert_eq!(generate_id(&b), generate_id(&a.children()[0]));
        assert_ne!(generate_id(&b), generate_id(&c));
        assert!(generate_id(&c).ends_with("n0n1"));
    }

    #[test]
    fn lang_uses_nearest_declaration() {
        let d = doc()
            .child(elem("para").attr(attr("xml:lang", "en-GB")).child(elem("span").child(elem("i"))))
            .build();
        let span = d.children()[0].children()[0].clone();
        assert!(lang_matches(&span, "en"));
        assert!(lang_matches(&span, "EN-gb"));
        assert!(!lang_matches(&span, "e"));
        assert!(!lang_matches(&d, "en"));
    }

    #[test]
    fn in_scope_prefixes_include_xml() {
        let e = elem("e").namespace(ns("p", "urn:p")).build();
        let found: Vec<String> = in_scope_namespaces(&e).into_iter().map(|(p, _)| p).collect();
        assert!(found.contains(&"xml".to_string()));
        assert!(found.contains(&"p".to_string()));
    }
}
