use super::call::{Args, nodes, one, opt};
use super::ids::find_ids;
use super::uri::resolve_uri;
use super::{AvailableOp, EnvOp, ResourceOp};
use crate::consts::{CODEPOINT_URI, FNS, XS, XSLT_NS};
use crate::engine::iter::{self, SequenceIter, sort_nodes};
use crate::engine::runtime::{CallCtx, Error, ErrorCode};
use crate::model::{NodeKind, XdmNode};
use crate::xdm::convert::{is_ncname, parse_lexical_qname};
use crate::xdm::{AtomicType, ExpandedName, XdmAtomicValue, XdmItem};
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// XSLT 2.0 instructions reported by `element-available`.
const XSLT_INSTRUCTIONS: &[&str] = &[
    "analyze-string",
    "apply-imports",
    "apply-templates",
    "attribute",
    "call-template",
    "choose",
    "comment",
    "copy",
    "copy-of",
    "document",
    "element",
    "fallback",
    "for-each",
    "for-each-group",
    "if",
    "message",
    "namespace",
    "next-match",
    "number",
    "perform-sort",
    "processing-instruction",
    "result-document",
    "sequence",
    "text",
    "value-of",
    "variable",
];

/// Schema types known beyond the atomic cast targets.
const OTHER_BUILT_IN_TYPES: &[&str] = &["anyType", "anySimpleType", "anyAtomicType", "untyped"];

pub(super) fn call<N: XdmNode>(op: EnvOp, ctx: &CallCtx<N>, mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    let dc = ctx.dyn_ctx;
    match op {
        EnvOp::Position => one(focus_value(dc.context_position, "position()")?),
        EnvOp::Last => one(focus_value(dc.context_size, "last()")?),
        EnvOp::Current => match &dc.current_node {
            Some(n) => Ok(iter::singleton(XdmItem::Node(n.clone()))),
            None => Err(Error::from_code(ErrorCode::XPDY0002, "the current node is undefined")),
        },
        EnvOp::CurrentGroup => Ok(iter::from_vec(dc.current_group.clone().unwrap_or_default())),
        EnvOp::CurrentGroupingKey => opt(dc.current_grouping_key.clone()),
        EnvOp::SystemProperty => {
            let lexical = args.string(0)?;
            let name = resolve_name(ctx, &lexical, None).map_err(|why| {
                Error::from_code(ErrorCode::XTDE1390, format!("invalid system property name '{lexical}': {why}"))
            })?;
            one(system_property(&name, &dc.system_properties))
        }
        EnvOp::StaticBaseUri => opt(ctx.static_ctx.base_uri.clone().map(XdmAtomicValue::AnyUri)),
        EnvOp::DefaultCollation => {
            one(ctx.static_ctx.default_collation.clone().unwrap_or_else(|| CODEPOINT_URI.to_string()))
        }
    }
}

fn focus_value(value: Option<usize>, function: &str) -> Result<i64, Error> {
    let v = value.ok_or_else(|| Error::from_code(ErrorCode::XPDY0002, format!("{function}: the context item is undefined")))?;
    i64::try_from(v).map_err(|_| Error::from_code(ErrorCode::FOAR0002, format!("{function} is out of range")))
}

/// Resolve a lexical QName against the static namespaces. An unprefixed name takes
/// `default_ns`.
fn resolve_name<N: XdmNode>(ctx: &CallCtx<N>, lexical: &str, default_ns: Option<&str>) -> Result<ExpandedName, String> {
    let (prefix, local) = parse_lexical_qname(lexical.trim()).ok_or_else(|| "not a lexical QName".to_string())?;
    let ns = match prefix {
        Some(p) => Some(ctx.resolve_prefix(p).ok_or_else(|| format!("prefix '{p}' is not declared"))?),
        None => default_ns.map(str::to_string),
    };
    Ok(ExpandedName::new(ns, local))
}

/// Value of a system property. Host-supplied properties win over the built-in ones.
pub fn system_property(name: &ExpandedName, overrides: &std::collections::HashMap<ExpandedName, String>) -> String {
    if let Some(v) = overrides.get(name) {
        return v.clone();
    }
    if name.ns_uri.as_deref() != Some(XSLT_NS) {
        return String::new();
    }
    match name.local.as_str() {
        "version" => "2.0",
        "vendor" | "product-name" => env!("CARGO_PKG_NAME"),
        "vendor-url" => env!("CARGO_PKG_REPOSITORY"),
        "product-version" => env!("CARGO_PKG_VERSION"),
        "supports-backwards-compatibility" | "supports-namespace-axis" => "yes",
        "is-schema-aware" | "supports-serialization" => "no",
        _ => "",
    }
    .to_string()
}

pub(super) fn available<N: XdmNode>(op: AvailableOp, ctx: &CallCtx<N>, mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    let lexical = args.string(0)?;
    let (default_ns, code) = match op {
        AvailableOp::Function => (
            Some(ctx.static_ctx.default_function_namespace.as_deref().unwrap_or(FNS)),
            ErrorCode::XTDE1400,
        ),
        AvailableOp::Type => (None, ErrorCode::XTDE1428),
        AvailableOp::Element => (None, ErrorCode::XTDE1440),
    };
    let name = resolve_name(ctx, &lexical, default_ns)
        .map_err(|why| Error::from_code(code, format!("invalid name '{lexical}': {why}")))?;
    let found = match op {
        AvailableOp::Function => {
            let arity = match args.integer(1)? {
                Some(n) => match usize::try_from(n) {
                    Ok(a) => Some(a),
                    Err(_) => return one(false),
                },
                None => None,
            };
            ctx.dyn_ctx.functions.has_function_signature(&name, arity)
        }
        AvailableOp::Element => {
            name.ns_uri.as_deref() == Some(XSLT_NS) && XSLT_INSTRUCTIONS.contains(&name.local.as_str())
        }
        AvailableOp::Type => {
            name.ns_uri.as_deref() == Some(XS)
                && (AtomicType::from_local_name(&name.local).is_some()
                    || OTHER_BUILT_IN_TYPES.contains(&name.local.as_str()))
        }
    };
    one(found)
}

/// Absolute form of `href`, resolved against `base` when it is relative.
fn absolute(href: &str, base: Option<&str>) -> Result<String, Error> {
    match base {
        Some(base) => resolve_uri(href, base),
        None => Url::parse(href).map(|u| u.to_string()).map_err(Error::from),
    }
}

pub(super) fn resource<N: XdmNode>(op: ResourceOp, ctx: &CallCtx<N>, mut args: Args<N>) -> Result<SequenceIter<N>, Error> {
    let static_base = ctx.static_ctx.base_uri.as_deref();
    match op {
        ResourceOp::Doc => {
            let Some(href) = args.opt_string(0)? else {
                return Ok(iter::empty());
            };
            nodes(vec![load_doc(ctx, &href, static_base)?])
        }
        ResourceOp::DocAvailable => {
            let Some(href) = args.opt_string(0)? else {
                return one(false);
            };
            let available = match load_doc(ctx, &href, static_base) {
                Ok(_) => true,
                Err(e) => {
                    tracing::debug!(%href, error = %e, "doc-available: document cannot be loaded");
                    false
                }
            };
            one(available)
        }
        ResourceOp::Document => {
            let hrefs = args.sequence(0)?;
            let explicit_base = if args.has(1) { args.node(1)?.map(|n| n.base_uri()) } else { None };
            let mut found = Vec::new();
            for item in hrefs {
                let (href, item_base) = match &item {
                    XdmItem::Node(n) => (n.string_value(), n.base_uri()),
                    XdmItem::Atomic(a) => (a.string_value(), None),
                };
                let base = match &explicit_base {
                    Some(b) => b.clone(),
                    None => item_base.or_else(|| static_base.map(str::to_string)),
                };
                match document(ctx, &href, base.as_deref()) {
                    Ok(Some(n)) => found.push(n),
                    Ok(None) => {}
                    Err(e) => tracing::debug!(%href, error = %e, "document(): resource skipped"),
                }
            }
            nodes(sort_nodes(found)?)
        }
        ResourceOp::Collection => {
            let uri = match args.opt_string(0)? {
                Some(u) => Some(absolute(&u, static_base).map_err(|e| recode(e, ErrorCode::FODC0004))?),
                None => None,
            };
            let resolver = ctx.dyn_ctx.node_resolver.as_ref().ok_or_else(|| {
                Error::from_code(ErrorCode::FODC0002, "no collection resolver is available")
            })?;
            nodes(resolver.collection_nodes(uri.as_deref())?)
        }
        ResourceOp::UnparsedText | ResourceOp::UnparsedTextAvailable => {
            let Some(href) = args.opt_string(0)? else {
                return match op {
                    ResourceOp::UnparsedText => Ok(iter::empty()),
                    _ => one(false),
                };
            };
            let encoding = if args.has(1) { Some(args.string(1)?) } else { None };
            let text = unparsed_text(ctx, &href, static_base, encoding.as_deref());
            match (op, text) {
                (ResourceOp::UnparsedText, text) => one(text?),
                (_, Ok(_)) => one(true),
                (_, Err(e)) => {
                    tracing::debug!(%href, error = %e, "unparsed-text-available: resource cannot be read");
                    one(false)
                }
            }
        }
    }
}

fn recode(e: Error, code: ErrorCode) -> Error {
    let message = e.message.clone();
    Error::from_code(code, message).with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
}

fn load_doc<N: XdmNode>(ctx: &CallCtx<N>, href: &str, base: Option<&str>) -> Result<N, Error> {
    let uri = absolute(href, base).map_err(|e| recode(e, ErrorCode::FODC0005))?;
    let resolver = ctx
        .dyn_ctx
        .node_resolver
        .as_ref()
        .ok_or_else(|| Error::from_code(ErrorCode::FODC0002, format!("cannot retrieve {uri}: no document resolver")))?;
    match resolver.doc_node(&uri)? {
        Some(n) => Ok(n),
        None => Err(Error::from_code(ErrorCode::FODC0002, format!("document {uri} is not available"))),
    }
}

/// One `document()` lookup. A fragment that is an NCName selects the element with that ID;
/// other fragments are ignored.
fn document<N: XdmNode>(ctx: &CallCtx<N>, href: &str, base: Option<&str>) -> Result<Option<N>, Error> {
    let (resource, fragment) = match href.split_once('#') {
        Some((r, f)) => (r, Some(f).filter(|f| is_ncname(f))),
        None => (href, None),
    };
    let doc = load_doc(ctx, resource, base)?;
    let Some(fragment) = fragment else {
        return Ok(Some(doc));
    };
    if doc.kind() != NodeKind::Document {
        return Ok(None);
    }
    let ids: HashSet<String> = std::iter::once(fragment.to_string()).collect();
    Ok(find_ids(&doc, &ids, true).into_iter().next())
}

fn unparsed_text<N: XdmNode>(
    ctx: &CallCtx<N>,
    href: &str,
    base: Option<&str>,
    encoding: Option<&str>,
) -> Result<String, Error> {
    let uri = absolute(href, base).map_err(|e| recode(e, ErrorCode::XTDE1170))?;
    if uri.contains('#') {
        return Err(Error::from_code(
            ErrorCode::XTDE1170,
            "URI for unparsed-text() must not contain a fragment identifier",
        ));
    }
    let resolver = ctx
        .dyn_ctx
        .text_resolver
        .as_ref()
        .ok_or_else(|| Error::from_code(ErrorCode::XTDE1170, format!("cannot read {uri}: no text resolver")))?;
    resolver.load_text(&uri, encoding).map_err(|e| match e.code_enum() {
        ErrorCode::XTDE1170 | ErrorCode::XTDE1190 => e,
        _ => recode(e, ErrorCode::XTDE1170),
    })
}
