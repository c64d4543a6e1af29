use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rstest::rstest;
use xpath_fnlib::consts::{CODEPOINT_URI, XSLT_NS};
use xpath_fnlib::engine::iter;
use xpath_fnlib::engine::runtime::{HostLanguage, NodeResolver, TextResolver, TraceListener};
use xpath_fnlib::simple_node::id_attr;
use xpath_fnlib::{
    CallCtx, DynamicContext, DynamicContextBuilder, Error, ErrorCode, ExpandedName, SimpleNode, StaticArg,
    StaticContext, StaticContextBuilder, XdmAtomicValue, XdmItem, XdmNode, XdmSequence, elem, simple_doc, text,
};

type Seq = XdmSequence<SimpleNode>;

fn s(v: &str) -> Seq {
    vec![XdmItem::Atomic(XdmAtomicValue::from(v))]
}

fn int(v: i64) -> Seq {
    vec![XdmItem::Atomic(XdmAtomicValue::Integer(v))]
}

fn boolean(v: bool) -> Seq {
    vec![XdmItem::Atomic(XdmAtomicValue::Boolean(v))]
}

fn eval_full(dc: &DynamicContext<SimpleNode>, sc: &StaticContext, name: &str, args: Vec<Seq>) -> Result<Seq, Error> {
    let statics = vec![StaticArg::Dynamic; args.len()];
    let bound = dc.functions.bind(&ExpandedName::local(name), &statics, sc)?;
    bound.evaluate(&CallCtx::new(dc, sc), args.into_iter().map(iter::from_vec).collect())
}

fn xslt() -> StaticContextBuilder {
    StaticContextBuilder::new()
        .with_host_language(HostLanguage::Xslt)
        .with_namespace("xsl", XSLT_NS)
        .with_base_uri("http://example.com/data/")
}

struct Documents(HashMap<String, SimpleNode>);

impl NodeResolver<SimpleNode> for Documents {
    fn doc_node(&self, uri: &str) -> Result<Option<SimpleNode>, Error> {
        Ok(self.0.get(uri).cloned())
    }

    fn collection_nodes(&self, uri: Option<&str>) -> Result<Vec<SimpleNode>, Error> {
        match uri {
            None => {
                let mut docs: Vec<(&String, &SimpleNode)> = self.0.iter().collect();
                docs.sort_by(|a, b| a.0.cmp(b.0));
                Ok(docs.into_iter().map(|(_, d)| d.clone()).collect())
            }
            Some(u) => Err(Error::from_code(ErrorCode::FODC0004, format!("no collection {u}"))),
        }
    }
}

struct Texts;

impl TextResolver for Texts {
    fn load_text(&self, uri: &str, encoding: Option<&str>) -> Result<String, Error> {
        match (uri, encoding) {
            ("http://example.com/data/notes.txt", None | Some("UTF-8")) => Ok("first line\nsecond line".into()),
            ("http://example.com/data/notes.txt", Some(enc)) => {
                Err(Error::from_code(ErrorCode::XTDE1190, format!("unsupported encoding {enc}")))
            }
            _ => Err(Error::from_code(ErrorCode::FODC0002, format!("{uri} not found"))),
        }
    }
}

fn resources() -> DynamicContext<SimpleNode> {
    let a = simple_doc()
        .document_uri("http://example.com/data/a.xml")
        .child(elem("a").child(elem("sec").attr(id_attr("id", "intro")).child(text("Intro"))))
        .build();
    let b = simple_doc().document_uri("http://example.com/data/b.xml").child(elem("b")).build();
    let docs = HashMap::from([
        ("http://example.com/data/a.xml".to_string(), a),
        ("http://example.com/data/b.xml".to_string(), b),
    ]);
    DynamicContextBuilder::new()
        .with_node_resolver(Arc::new(Documents(docs)))
        .with_text_resolver(Arc::new(Texts))
        .build()
}

fn single_node_text(seq: &Seq) -> String {
    match seq.as_slice() {
        [XdmItem::Node(n)] => n.string_value(),
        other => panic!("expected one node, got {other:?}"),
    }
}

#[test]
fn doc_resolves_against_the_static_base() {
    let dc = resources();
    let sc = xslt().build();
    let a = eval_full(&dc, &sc, "doc", vec![s("a.xml")]).unwrap();
    assert_eq!(single_node_text(&a), "Intro");
    let missing = eval_full(&dc, &sc, "doc", vec![s("missing.xml")]).unwrap_err();
    assert_eq!(missing.code_enum(), ErrorCode::FODC0002);
    assert_eq!(eval_full(&dc, &sc, "doc-available", vec![s("b.xml")]).unwrap(), boolean(true));
    assert_eq!(eval_full(&dc, &sc, "doc-available", vec![s("missing.xml")]).unwrap(), boolean(false));
    assert!(eval_full(&dc, &sc, "doc", vec![vec![]]).unwrap().is_empty());
}

#[test]
fn doc_without_a_resolver() {
    let dc = DynamicContext::default();
    let err = eval_full(&dc, &StaticContext::default(), "doc", vec![s("http://example.com/a.xml")]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::FODC0002);
    let relative = eval_full(&dc, &StaticContext::default(), "doc", vec![s("a.xml")]).unwrap_err();
    assert_eq!(relative.code_enum(), ErrorCode::FODC0005);
}

#[test]
fn document_follows_fragments_and_skips_failures() {
    let dc = resources();
    let sc = xslt().build();
    let hrefs = vec![
        XdmItem::Atomic("b.xml".into()),
        XdmItem::Atomic("missing.xml".into()),
        XdmItem::Atomic("a.xml#intro".into()),
    ];
    let found = eval_full(&dc, &sc, "document", vec![hrefs]).unwrap();
    assert_eq!(found.len(), 2);
    let sec = found.iter().filter_map(XdmItem::as_node).find(|n| n.string_value() == "Intro");
    assert!(sec.is_some_and(|n| n.name().is_some_and(|q| q.local == "sec")));
}

#[test]
fn collection_uses_the_resolver() {
    let dc = resources();
    let sc = xslt().build();
    assert_eq!(eval_full(&dc, &sc, "collection", vec![]).unwrap().len(), 2);
    let err = eval_full(&dc, &sc, "collection", vec![s("other")]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::FODC0004);
}

#[test]
fn unparsed_text_and_availability() {
    let dc = resources();
    let sc = xslt().build();
    assert_eq!(eval_full(&dc, &sc, "unparsed-text", vec![s("notes.txt")]).unwrap(), s("first line\nsecond line"));
    assert_eq!(eval_full(&dc, &sc, "unparsed-text-available", vec![s("notes.txt")]).unwrap(), boolean(true));
    assert_eq!(eval_full(&dc, &sc, "unparsed-text-available", vec![s("gone.txt")]).unwrap(), boolean(false));
    let missing = eval_full(&dc, &sc, "unparsed-text", vec![s("gone.txt")]).unwrap_err();
    assert_eq!(missing.code_enum(), ErrorCode::XTDE1170);
    let encoding = eval_full(&dc, &sc, "unparsed-text", vec![s("notes.txt"), s("EBCDIC")]).unwrap_err();
    assert_eq!(encoding.code_enum(), ErrorCode::XTDE1190);
    let fragment = eval_full(&dc, &sc, "unparsed-text", vec![s("notes.txt#top")]).unwrap_err();
    assert_eq!(fragment.code_enum(), ErrorCode::XTDE1170);
}

#[derive(Default)]
struct Recorder(Mutex<Vec<(String, usize)>>);

impl TraceListener<SimpleNode> for Recorder {
    fn trace(&self, label: &str, value: &[XdmItem<SimpleNode>]) {
        if let Ok(mut events) = self.0.lock() {
            events.push((label.to_string(), value.len()));
        }
    }
}

#[test]
fn trace_reports_to_the_listener_and_passes_values_through() {
    let recorder = Arc::new(Recorder::default());
    let dc = DynamicContextBuilder::new().with_trace_listener(recorder.clone()).build();
    let values = vec![XdmItem::Atomic(XdmAtomicValue::Integer(1)), XdmItem::Atomic(XdmAtomicValue::Integer(2))];
    let out = eval_full(&dc, &StaticContext::default(), "trace", vec![values.clone(), s("nums")]).unwrap();
    assert_eq!(out, values);
    assert_eq!(*recorder.0.lock().unwrap(), vec![("nums".to_string(), 2)]);
}

#[test]
fn trace_without_listener_is_transparent() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::DEBUG).try_init();
    let dc = DynamicContext::default();
    let out = eval_full(&dc, &StaticContext::default(), "trace", vec![s("x"), s("label")]).unwrap();
    assert_eq!(out, s("x"));
}

#[test]
fn error_raises_the_given_code() {
    let dc = DynamicContext::default();
    let sc = StaticContext::default();
    let plain = eval_full(&dc, &sc, "error", vec![]).unwrap_err();
    assert_eq!(plain.code_enum(), ErrorCode::FOER0000);
    let code = vec![XdmItem::Atomic(XdmAtomicValue::qname(Some("urn:app"), Some("app"), "oops"))];
    let custom = eval_full(&dc, &sc, "error", vec![code.clone(), s("boom")]).unwrap_err();
    assert_eq!(custom.code, ExpandedName::ns("urn:app", "oops"));
    assert_eq!(custom.message, "boom");
    let with_object = eval_full(&dc, &sc, "error", vec![code, s("boom"), int(42)]).unwrap_err();
    assert_eq!(with_object.message, "boom");
}

#[test]
fn focus_functions() {
    let sc = StaticContext::default();
    let dc = DynamicContextBuilder::new().with_context_item(XdmAtomicValue::from("x")).with_focus(2, 5).build();
    assert_eq!(eval_full(&dc, &sc, "position", vec![]).unwrap(), int(2));
    assert_eq!(eval_full(&dc, &sc, "last", vec![]).unwrap(), int(5));
    let err = eval_full(&DynamicContext::default(), &sc, "position", vec![]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPDY0002);
}

#[test]
fn xslt_context_functions() {
    let sc = xslt().build();
    let current = elem("c").build();
    let group = vec![XdmItem::Atomic(XdmAtomicValue::Integer(1)), XdmItem::Atomic(XdmAtomicValue::Integer(2))];
    let dc = DynamicContextBuilder::new()
        .with_current_node(current.clone())
        .with_current_group(group.clone(), Some(XdmAtomicValue::from("k")))
        .build();
    assert_eq!(eval_full(&dc, &sc, "current", vec![]).unwrap(), vec![XdmItem::Node(current)]);
    assert_eq!(eval_full(&dc, &sc, "current-group", vec![]).unwrap(), group);
    assert_eq!(eval_full(&dc, &sc, "current-grouping-key", vec![]).unwrap(), s("k"));
    let none = eval_full(&DynamicContext::default(), &sc, "current", vec![]).unwrap_err();
    assert_eq!(none.code_enum(), ErrorCode::XPDY0002);
}

#[test]
fn static_properties() {
    let sc = xslt().with_default_collation(CODEPOINT_URI).build();
    let dc = DynamicContext::default();
    assert_eq!(
        eval_full(&dc, &sc, "static-base-uri", vec![]).unwrap(),
        vec![XdmItem::Atomic(XdmAtomicValue::AnyUri("http://example.com/data/".into()))]
    );
    assert_eq!(eval_full(&dc, &sc, "default-collation", vec![]).unwrap(), s(CODEPOINT_URI));
}

#[rstest]
#[case("xsl:version", "2.0")]
#[case("xsl:is-schema-aware", "no")]
#[case("xsl:supports-namespace-axis", "yes")]
#[case("xsl:no-such-property", "")]
#[case("version", "")]
fn system_properties(#[case] name: &str, #[case] expected: &str) {
    let sc = xslt().build();
    assert_eq!(eval_full(&DynamicContext::default(), &sc, "system-property", vec![s(name)]).unwrap(), s(expected));
}

#[test]
fn system_property_overrides_and_bad_names() {
    let sc = xslt().build();
    let dc = DynamicContextBuilder::new().with_system_property(ExpandedName::ns(XSLT_NS, "vendor"), "Acme").build();
    assert_eq!(eval_full(&dc, &sc, "system-property", vec![s("xsl:vendor")]).unwrap(), s("Acme"));
    let err = eval_full(&dc, &sc, "system-property", vec![s("zz:vendor")]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XTDE1390);
}

#[rstest]
#[case("function-available", vec![s("concat")], true)]
#[case("function-available", vec![s("fn:concat"), int(7)], true)]
#[case("function-available", vec![s("substring"), int(4)], false)]
#[case("function-available", vec![s("no-such-function")], false)]
#[case("function-available", vec![s("xs:date"), int(1)], true)]
#[case("function-available", vec![s("count"), int(-1)], false)]
#[case("element-available", vec![s("xsl:for-each-group")], true)]
#[case("element-available", vec![s("xsl:template")], false)]
#[case("type-available", vec![s("xs:date")], true)]
#[case("type-available", vec![s("xs:untyped")], true)]
#[case("type-available", vec![s("xs:banana")], false)]
fn availability(#[case] name: &str, #[case] args: Vec<Seq>, #[case] expected: bool) {
    let sc = xslt()
        .with_namespace("fn", xpath_fnlib::consts::FNS)
        .with_namespace("xs", xpath_fnlib::consts::XS)
        .build();
    assert_eq!(eval_full(&DynamicContext::default(), &sc, name, args).unwrap(), boolean(expected), "{name}");
}

#[test]
fn availability_rejects_malformed_names() {
    let sc = xslt().build();
    let dc = DynamicContext::default();
    let f = eval_full(&dc, &sc, "function-available", vec![s("1bad")]).unwrap_err();
    assert_eq!(f.code_enum(), ErrorCode::XTDE1400);
    let t = eval_full(&dc, &sc, "type-available", vec![s("undeclared:x")]).unwrap_err();
    assert_eq!(t.code_enum(), ErrorCode::XTDE1428);
    let e = eval_full(&dc, &sc, "element-available", vec![s("a b")]).unwrap_err();
    assert_eq!(e.code_enum(), ErrorCode::XTDE1440);
}
