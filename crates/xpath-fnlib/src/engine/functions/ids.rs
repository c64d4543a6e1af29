use super::IdOp;
use super::call::{Args, nodes};
use crate::engine::iter::{SequenceIter, sort_nodes};
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::{NodeKind, XdmNode, descendants_or_self, is_ancestor_or_self};
use crate::xdm::convert::{is_ncname, parse_lexical_qname};
use crate::xdm::{ExpandedName, XdmItem};
use std::collections::HashSet;

pub(super) fn call<N: XdmNode>(op: IdOp, ctx: &CallCtx<N>, mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    match op {
        IdOp::Key => key(ctx, args),
        IdOp::Id | IdOp::ElementWithId | IdOp::Idref => {
            let tokens: HashSet<String> = args
                .atomics(0)?
                .iter()
                .flat_map(|v| v.string_value().split_whitespace().map(str::to_string).collect::<Vec<_>>())
                .filter(|t| is_ncname(t))
                .collect();
            let origin = args.node_or_context(1, ctx)?;
            let root = origin.root();
            if root.kind() != NodeKind::Document {
                return Err(Error::from_code(
                    ErrorCode::FODC0001,
                    "the node supplied to id-related functions must be in a tree whose root is a document node",
                ));
            }
            if tokens.is_empty() {
                return nodes(Vec::new());
            }
            let found = match op {
                IdOp::Idref => find_idrefs(&root, &tokens),
                _ => find_ids(&root, &tokens, op == IdOp::ElementWithId),
            };
            nodes(within(&origin, sort_nodes(found)?))
        }
    }
}

/// Elements identified by any of `tokens`. An ID attribute identifies its owner element. An
/// element whose content is an ID identifies its parent for `id` and itself for
/// `element-with-id`.
pub(super) fn find_ids<N: XdmNode>(root: &N, tokens: &HashSet<String>, element_with_id: bool) -> Vec<N> {
    let mut out = Vec::new();
    for n in descendants_or_self(root).into_iter().filter(|n| n.kind() == NodeKind::Element) {
        let by_attribute = n.attributes().into_iter().any(|a| a.is_id() && tokens.contains(a.string_value().trim()));
        if by_attribute {
            out.push(n);
        } else if n.is_id() && tokens.contains(n.string_value().trim()) {
            let target = if element_with_id { Some(n) } else { n.parent().filter(|p| p.kind() == NodeKind::Element) };
            out.extend(target);
        }
    }
    out
}

/// Attributes and elements of IDREF(S) type that mention any of `tokens`.
fn find_idrefs<N: XdmNode>(root: &N, tokens: &HashSet<String>) -> Vec<N> {
    let refers = |n: &N| n.is_idrefs() && n.string_value().split_whitespace().any(|t| tokens.contains(t));
    let mut out = Vec::new();
    for n in descendants_or_self(root).into_iter().filter(|n| n.kind() == NodeKind::Element) {
        if refers(&n) {
            out.push(n.clone());
        }
        out.extend(n.attributes().into_iter().filter(|a| refers(a)));
    }
    out
}

/// Results below `origin` only, unless `origin` is the root itself.
fn within<N: XdmNode>(origin: &N, found: Vec<N>) -> Vec<N> {
    if origin.parent().is_none() {
        return found;
    }
    found.into_iter().filter(|n| is_ancestor_or_self(origin, n)).collect()
}

fn key<N: XdmNode>(ctx: &CallCtx<N>, mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    let lexical = args.string(0)?;
    let name = resolve_key_name(ctx, &lexical)?;
    let keys = &ctx.dyn_ctx.keys;
    if !keys.is_defined(&name) {
        return Err(Error::from_code(ErrorCode::XTDE1260, format!("key {lexical} has not been defined")));
    }
    let values = args.atomics(1)?;
    let origin = if args.has(2) {
        args.node(2)?
    } else {
        let item = ctx.context_item().map_err(|_| {
            Error::from_code(ErrorCode::XTDE1270, "cannot call key() when there is no context item")
        })?;
        match item {
            XdmItem::Node(n) => Some(n.clone()),
            XdmItem::Atomic(_) => {
                return Err(Error::from_code(
                    ErrorCode::XTDE1270,
                    "cannot call key() when the context item is an atomic value",
                ));
            }
        }
    };
    let Some(origin) = origin else {
        return nodes(Vec::new());
    };
    let root = origin.root();
    if root.kind() != NodeKind::Document {
        return Err(Error::from_code(
            ErrorCode::XTDE1270,
            "the node supplied to key() must be in a tree whose root is a document node",
        ));
    }
    let collation = ctx.collation(Some(keys.collation_uri(&name).unwrap_or(crate::consts::CODEPOINT_URI)))?;
    let comparer = ctx.comparer(collation);
    let mut found = Vec::new();
    for v in &values {
        found.extend(keys.lookup(&name, &root, v, &comparer)?);
    }
    tracing::trace!(key = %name, values = values.len(), hits = found.len(), "key lookup");
    nodes(within(&origin, sort_nodes(found)?))
}

fn resolve_key_name<N: XdmNode>(ctx: &CallCtx<N>, lexical: &str) -> Result<ExpandedName, Error> {
    let bad = |why: &str| Error::from_code(ErrorCode::XTDE1260, format!("error in key name {lexical}: {why}"));
    let (prefix, local) = parse_lexical_qname(lexical.trim()).ok_or_else(|| bad("not a lexical QName"))?;
    let ns = match prefix {
        Some(p) => Some(ctx.resolve_prefix(p).ok_or_else(|| bad("undeclared namespace prefix"))?),
        None => None,
    };
    Ok(ExpandedName::new(ns, local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple_node::{SimpleNode, attr, doc, elem, id_attr, text};

    fn sample() -> SimpleNode {
        doc()
            .child(
                elem("list")
                    .child(elem("item").attr(id_attr("id", "a")).attr(attr("n", "1")))
                    .child(
                        elem("item")
                            .attr(id_attr("id", "b"))
                            .child(elem("ref").attr(SimpleNode::idrefs_attribute("to", "a c"))),
                    )
                    .child(elem("item").attr(id_attr("id", "c"))),
            )
            .build()
    }

    fn tokens(v: &[&str]) -> HashSet<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ids_resolve_to_owner_elements_in_document_order() {
        let d = sample();
        let found = sort_nodes(find_ids(&d, &tokens(&["c", "a"]), false)).unwrap();
        let ids: Vec<String> = found.iter().map(|n| n.attributes()[0].string_value()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn typed_id_element_identifies_its_parent_for_id_only() {
        let d = doc().child(elem("person").child(elem("key").typed_id().child(text("p7")))).build();
        let person = d.children()[0].clone();
        let key = person.children()[0].clone();
        assert_eq!(find_ids(&d, &tokens(&["p7"]), false), vec![person]);
        assert_eq!(find_ids(&d, &tokens(&["p7"]), true), vec![key]);
    }

    #[test]
    fn idrefs_return_referring_attributes() {
        let d = sample();
        let found = find_idrefs(&d, &tokens(&["c"]));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind(), NodeKind::Attribute);
        assert!(find_idrefs(&d, &tokens(&["b"])).is_empty());
    }

    #[test]
    fn results_are_limited_to_the_origin_subtree() {
        let d = sample();
        let list = d.children()[0].clone();
        let second = list.children()[1].clone();
        let all = sort_nodes(find_ids(&d, &tokens(&["a", "b"]), false)).unwrap();
        assert_eq!(within(&d, all.clone()).len(), 2);
        assert_eq!(within(&second, all), vec![second.clone()]);
    }
}
